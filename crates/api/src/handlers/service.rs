use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bookit_core::{
    errors::BookError,
    models::{
        response::{ApiResponse, Pagination, ServicePage},
        schedule::Schedule,
        service::{CreateServiceRequest, Service, ServiceDetail, ServiceFilters, UpdateServiceRequest},
        user::UserRole,
    },
};
use bookit_db::{
    models::convert_all,
    repositories::{
        schedule as schedule_repo,
        service::{self as service_repo, ServiceChanges, ServiceListQuery},
    },
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    extract::{ValidatedJson, ValidatedQuery},
    middleware::{auth::AuthUser, error_handling::AppError},
    ApiState,
};

/// Providers may only touch their own services; admins may touch any.
pub fn ensure_owner(caller: &AuthUser, service: &Service, action: &str) -> Result<(), BookError> {
    if caller.is_admin() || service.provider_id == caller.id() {
        Ok(())
    } else {
        Err(BookError::Authorization(format!(
            "You do not have permission to {action} this service"
        )))
    }
}

pub(crate) async fn fetch_service(state: &ApiState, id: Uuid) -> Result<Service, AppError> {
    service_repo::get_service_by_id(&state.db_pool, id)
        .await?
        .map(Service::from)
        .ok_or_else(|| BookError::NotFound("Service not found".to_string()).into())
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn list_services(
    State(state): State<Arc<ApiState>>,
    ValidatedQuery(filters): ValidatedQuery<ServiceFilters>,
) -> Result<Json<ApiResponse<ServicePage<Service>>>, AppError> {
    let (page, limit) = Pagination::resolve(filters.page, filters.limit);
    let query = ServiceListQuery {
        is_active: filters.is_active,
        provider_id: filters.provider_id,
        limit: limit.into(),
        offset: Pagination::offset(page, limit),
    };

    let (rows, total) = service_repo::list_services(&state.db_pool, &query).await?;
    let services = rows.into_iter().map(Service::from).collect();

    Ok(Json(ApiResponse::ok(ServicePage {
        services,
        pagination: Pagination::new(page, limit, total.max(0) as u64),
    })))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn get_service(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ServiceDetail>>, AppError> {
    let service = fetch_service(&state, id).await?;
    let rows = schedule_repo::get_active_schedules_for_service(&state.db_pool, id).await?;
    let schedules: Vec<Schedule> = convert_all(rows)?;

    Ok(Json(ApiResponse::ok(ServiceDetail { service, schedules })))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn create_service(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateServiceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Service>>), AppError> {
    caller.require_role(&[UserRole::Provider, UserRole::Admin])?;

    let row = service_repo::create_service(
        &state.db_pool,
        caller.id(),
        payload.name.trim(),
        payload.description.as_deref(),
        payload.duration,
        payload.price,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(Service::from(row)).with_message("Service created successfully")),
    ))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn update_service(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateServiceRequest>,
) -> Result<Json<ApiResponse<Service>>, AppError> {
    caller.require_role(&[UserRole::Provider, UserRole::Admin])?;
    let existing = fetch_service(&state, id).await?;
    ensure_owner(&caller, &existing, "modify")?;

    let changes = ServiceChanges {
        name: payload.name.as_deref().map(str::trim),
        description: payload.description.as_deref(),
        duration: payload.duration,
        price: payload.price,
        is_active: payload.is_active,
    };
    let row = service_repo::update_service(&state.db_pool, id, &changes).await?;

    Ok(Json(
        ApiResponse::ok(Service::from(row)).with_message("Service updated successfully"),
    ))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn delete_service(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    caller.require_role(&[UserRole::Provider, UserRole::Admin])?;
    let existing = fetch_service(&state, id).await?;
    ensure_owner(&caller, &existing, "delete")?;

    if service_repo::count_active_reservations(&state.db_pool, id).await? > 0 {
        return Err(BookError::Validation(
            "Cannot delete a service with active reservations".to_string(),
        )
        .into());
    }

    service_repo::delete_service(&state.db_pool, id).await?;
    tracing::info!("Service {} deleted by {}", id, caller.id());

    Ok(Json(ApiResponse::message("Service deleted successfully")))
}
