use axum::{extract::State, http::StatusCode, Json};
use bookit_core::{
    availability::{windows_conflict, ScheduleWindow},
    errors::BookError,
    models::{
        response::ApiResponse,
        schedule::{CreateScheduleRequest, Schedule, ScheduleQuery},
        user::UserRole,
    },
};
use bookit_db::{models::convert_all, repositories::schedule as schedule_repo};
use std::sync::Arc;

use crate::{
    extract::{ValidatedJson, ValidatedQuery},
    handlers::{load_windows, service::{ensure_owner, fetch_service}},
    middleware::{auth::AuthUser, error_handling::AppError},
    ApiState,
};

/// Rejects a new window that overlaps an active one on the same weekday.
pub fn ensure_no_overlap(
    proposed: &ScheduleWindow,
    existing: &[ScheduleWindow],
) -> Result<(), BookError> {
    if existing.iter().any(|w| windows_conflict(proposed, w)) {
        Err(BookError::Conflict(
            "An overlapping schedule already exists for this day".to_string(),
        ))
    } else {
        Ok(())
    }
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn list_schedules(
    State(state): State<Arc<ApiState>>,
    ValidatedQuery(query): ValidatedQuery<ScheduleQuery>,
) -> Result<Json<ApiResponse<Vec<Schedule>>>, AppError> {
    let rows = schedule_repo::list_schedules(&state.db_pool, query.service_id).await?;
    let schedules: Vec<Schedule> = convert_all(rows)?;

    Ok(Json(ApiResponse::ok(schedules)))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn create_schedule(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Schedule>>), AppError> {
    caller.require_role(&[UserRole::Provider, UserRole::Admin])?;
    let window = payload.window()?;

    let service = fetch_service(&state, payload.service_id).await?;
    ensure_owner(&caller, &service, "add schedules to")?;

    let existing = load_windows(&state.db_pool, service.id).await?;
    ensure_no_overlap(&window, &existing)?;

    let row = schedule_repo::create_schedule(
        &state.db_pool,
        service.id,
        window.day().index().into(),
        window.start().into(),
        window.end().into(),
    )
    .await?;
    let schedule = Schedule::try_from(row)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(schedule).with_message("Schedule created successfully")),
    ))
}
