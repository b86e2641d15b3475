use axum::{
    extract::{Path, State},
    Json,
};
use bookit_core::{errors::BookError, models::{notification::Notification, response::ApiResponse}};
use bookit_db::{models::convert_all, repositories::notification as notification_repo};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    extract::ValidatedQuery,
    middleware::{auth::AuthUser, error_handling::AppError},
    ApiState,
};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub unread_only: Option<bool>,
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn list_notifications(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    ValidatedQuery(query): ValidatedQuery<NotificationQuery>,
) -> Result<Json<ApiResponse<Vec<Notification>>>, AppError> {
    let rows = notification_repo::list_notifications_for_user(
        &state.db_pool,
        caller.id(),
        query.unread_only.unwrap_or(false),
    )
    .await?;
    let notifications: Vec<Notification> = convert_all(rows)?;

    Ok(Json(ApiResponse::ok(notifications)))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn mark_read(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Notification>>, AppError> {
    let row = notification_repo::mark_notification_read(&state.db_pool, id, caller.id())
        .await?
        .ok_or_else(|| BookError::NotFound("Notification not found".to_string()))?;

    Ok(Json(ApiResponse::ok(Notification::try_from(row)?)))
}
