//! # Availability Handlers
//!
//! `GET /api/availability?serviceId=..&date=..` answers "which start times
//! are still open for this service on this date". The slot grid itself comes
//! from the engine in `bookit_core::availability`; this module only loads the
//! service's windows and the day's active reservations.

use axum::{extract::State, Json};
use bookit_core::{
    availability::{day_slots, BookedInterval, ScheduleWindow},
    errors::BookError,
    models::{
        availability::{AvailabilityQuery, DayAvailability},
        response::ApiResponse,
        service::Service,
    },
    time::{parse_calendar_date, DayOfWeek},
};
use bookit_db::repositories::service as service_repo;
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    extract::ValidatedQuery,
    handlers::{load_booked, load_windows},
    middleware::error_handling::AppError,
    ApiState,
};

/// Validated form of the query string.
pub fn parse_query(query: &AvailabilityQuery) -> Result<(Uuid, NaiveDate), BookError> {
    let (Some(service_id), Some(date)) = (query.service_id.as_deref(), query.date.as_deref())
    else {
        return Err(BookError::Validation(
            "serviceId and date are required".to_string(),
        ));
    };

    let service_id = Uuid::parse_str(service_id.trim())
        .map_err(|_| BookError::Validation("serviceId must be a valid UUID".to_string()))?;
    let date = parse_calendar_date(date)?;

    Ok((service_id, date))
}

/// The slot grid for `date`. Days without a window yield no slots.
pub fn build_day_availability(
    service: &Service,
    windows: &[ScheduleWindow],
    date: NaiveDate,
    booked: &[BookedInterval],
) -> Result<DayAvailability, BookError> {
    let duration = service.slot_duration()?;
    let slots = day_slots(windows, DayOfWeek::from(date), duration, booked);
    Ok(DayAvailability { date, slots })
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn get_availability(
    State(state): State<Arc<ApiState>>,
    ValidatedQuery(query): ValidatedQuery<AvailabilityQuery>,
) -> Result<Json<ApiResponse<DayAvailability>>, AppError> {
    let (service_id, date) = parse_query(&query)?;

    let service = service_repo::get_service_by_id(&state.db_pool, service_id)
        .await?
        .map(Service::from)
        .filter(|service| service.is_active)
        .ok_or_else(|| BookError::NotFound("Service not found or inactive".to_string()))?;

    let windows = load_windows(&state.db_pool, service.id).await?;
    let booked = load_booked(&state.db_pool, service.id, date, None).await?;
    tracing::debug!(
        "Availability for service {} on {}: {} windows, {} booked",
        service.id,
        date,
        windows.len(),
        booked.len()
    );

    Ok(Json(ApiResponse::ok(build_day_availability(
        &service, &windows, date, &booked,
    )?)))
}
