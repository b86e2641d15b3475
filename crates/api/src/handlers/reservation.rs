//! # Reservation Handlers
//!
//! Creating a reservation is a read-check-write: load the service's windows
//! and the day's active reservations, ask the engine whether the requested
//! start is admissible, then insert. All three steps run in one transaction
//! that holds a row lock on the service, so two concurrent requests for the
//! same service are serialized and the second one sees the first one's row.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bookit_core::{
    availability::{can_book, overlaps, BookedInterval, Rejection, ScheduleWindow},
    errors::BookError,
    models::{
        notification::{Notification, NotificationKind},
        reservation::{
            CreateReservationRequest, Reservation, ReservationFilters, ReservationStatus,
            UpdateReservationRequest,
        },
        response::{ApiResponse, Pagination, ReservationPage},
        service::Service,
        user::UserRole,
    },
    time::{parse_calendar_date, DayOfWeek, TimeOfDay},
};
use bookit_db::{
    models::convert_all,
    repositories::{
        notification as notification_repo,
        reservation::{self as reservation_repo, NewReservation, ReservationListQuery, ReservationScope},
    },
};
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    extract::{ValidatedJson, ValidatedQuery},
    handlers::{load_booked, load_windows},
    middleware::{auth::AuthUser, error_handling::AppError},
    ApiState,
};

/// Decides whether a reservation of `service` may start at `start` on `date`.
///
/// Returns the interval the reservation will occupy.
pub fn plan_reservation(
    service: &Service,
    windows: &[ScheduleWindow],
    date: NaiveDate,
    start: TimeOfDay,
    existing: &[BookedInterval],
) -> Result<BookedInterval, BookError> {
    if !service.is_active {
        return Err(BookError::Validation("Service is not available".to_string()));
    }

    let proposed = BookedInterval::starting_at(start, service.slot_duration()?)?;
    can_book(&proposed, windows, DayOfWeek::from(date), existing)?;
    Ok(proposed)
}

/// Conflict check used when an inactive reservation is made active again.
pub fn ensure_slot_free(
    interval: &BookedInterval,
    others: &[BookedInterval],
) -> Result<(), Rejection> {
    match others.iter().find(|other| overlaps(interval, other)) {
        Some(conflict) => Err(Rejection::Conflict(*conflict)),
        None => Ok(()),
    }
}

/// Whether moving from `current` to `requested` makes the reservation occupy
/// its slot again.
pub fn is_reactivation(current: ReservationStatus, requested: Option<ReservationStatus>) -> bool {
    requested.is_some_and(|next| next.is_active() && !current.is_active())
}

/// Which reservations a caller may list.
pub fn scope_for(caller: &AuthUser) -> ReservationScope {
    match caller.role() {
        UserRole::Client => ReservationScope::User(caller.id()),
        UserRole::Provider => ReservationScope::Provider(caller.id()),
        UserRole::Admin => ReservationScope::All,
    }
}

/// Admins, the client who booked, and the provider of the service may view.
pub fn can_view(caller: &AuthUser, reservation: &Reservation, provider_id: Uuid) -> bool {
    caller.is_admin()
        || reservation.user_id == caller.id()
        || (caller.role() == UserRole::Provider && provider_id == caller.id())
}

/// Admins and the owning provider may change anything; the client who booked
/// may only cancel.
pub fn authorize_update(
    caller: &AuthUser,
    reservation: &Reservation,
    provider_id: Uuid,
    requested: Option<ReservationStatus>,
) -> Result<(), BookError> {
    if caller.is_admin() || (caller.role() == UserRole::Provider && provider_id == caller.id()) {
        return Ok(());
    }

    if caller.role() == UserRole::Client && reservation.user_id == caller.id() {
        return match requested {
            Some(ReservationStatus::Cancelled) => Ok(()),
            _ => Err(BookError::Authorization(
                "You can only cancel your reservations".to_string(),
            )),
        };
    }

    Err(BookError::Authorization(
        "You do not have permission to modify this reservation".to_string(),
    ))
}

/// The notification a client receives when someone else confirms or cancels
/// their reservation.
pub fn status_notice(reservation: &Reservation) -> Option<(NotificationKind, String, String)> {
    let when = format!("{} at {}", reservation.date, reservation.start_time);
    match reservation.status {
        ReservationStatus::Confirmed => Some((
            NotificationKind::ReservationConfirmed,
            "Reservation confirmed".to_string(),
            format!("Your reservation on {when} has been confirmed"),
        )),
        ReservationStatus::Cancelled => Some((
            NotificationKind::ReservationCancelled,
            "Reservation cancelled".to_string(),
            format!("Your reservation on {when} has been cancelled"),
        )),
        _ => None,
    }
}

fn parse_optional_date(value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    Ok(value.map(parse_calendar_date).transpose()?)
}

fn not_found() -> BookError {
    BookError::NotFound("Reservation not found".to_string())
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn list_reservations(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    ValidatedQuery(filters): ValidatedQuery<ReservationFilters>,
) -> Result<Json<ApiResponse<ReservationPage<Reservation>>>, AppError> {
    let (page, limit) = Pagination::resolve(filters.page, filters.limit);
    let query = ReservationListQuery {
        scope: scope_for(&caller),
        status: filters.status.map(|s| s.as_str().to_string()),
        service_id: filters.service_id,
        date_from: parse_optional_date(filters.date_from.as_deref())?,
        date_to: parse_optional_date(filters.date_to.as_deref())?,
        limit: limit.into(),
        offset: Pagination::offset(page, limit),
    };

    let (rows, total) = reservation_repo::list_reservations(&state.db_pool, &query).await?;
    let reservations: Vec<Reservation> = convert_all(rows)?;

    Ok(Json(ApiResponse::ok(ReservationPage {
        reservations,
        pagination: Pagination::new(page, limit, total.max(0) as u64),
    })))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn create_reservation(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Reservation>>), AppError> {
    let date = parse_calendar_date(&payload.date)?;
    let start = TimeOfDay::parse(&payload.start_time)?;

    let mut tx = state.db_pool.begin().await?;

    let service = reservation_repo::lock_service(&mut *tx, payload.service_id)
        .await?
        .map(Service::from)
        .ok_or_else(|| BookError::Validation("Service is not available".to_string()))?;
    let windows = load_windows(&mut *tx, service.id).await?;
    let existing = load_booked(&mut *tx, service.id, date, None).await?;

    let interval = plan_reservation(&service, &windows, date, start, &existing)?;

    let row = reservation_repo::create_reservation(
        &mut *tx,
        &NewReservation {
            user_id: caller.id(),
            service_id: service.id,
            date,
            start_time: interval.start.into(),
            end_time: interval.end.into(),
            notes: payload.notes.as_deref(),
            total_price: service.price,
        },
    )
    .await?;
    tx.commit().await?;

    let reservation = Reservation::try_from(row)?;
    tracing::info!(
        "Reservation {} created for service {} on {} {}-{}",
        reservation.id,
        service.id,
        date,
        interval.start,
        interval.end
    );
    state.hub.notify_reservation(&reservation, service.provider_id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(reservation).with_message("Reservation created successfully")),
    ))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn get_reservation(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Reservation>>, AppError> {
    let reservation = reservation_repo::get_reservation_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(not_found)?;
    let reservation = Reservation::try_from(reservation)?;

    let service = crate::handlers::service::fetch_service(&state, reservation.service_id).await?;
    if !can_view(&caller, &reservation, service.provider_id) {
        return Err(BookError::Authorization(
            "You do not have permission to view this reservation".to_string(),
        )
        .into());
    }

    Ok(Json(ApiResponse::ok(reservation)))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn update_reservation(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateReservationRequest>,
) -> Result<Json<ApiResponse<Reservation>>, AppError> {
    let mut tx = state.db_pool.begin().await?;

    let service_id = reservation_repo::get_reservation_by_id(&mut *tx, id)
        .await?
        .ok_or_else(not_found)?
        .service_id;

    let service = reservation_repo::lock_service(&mut *tx, service_id)
        .await?
        .map(Service::from)
        .ok_or_else(|| BookError::NotFound("Service not found".to_string()))?;

    // Status decisions use the row as it is under the service lock.
    let existing = reservation_repo::lock_reservation(&mut *tx, id)
        .await?
        .ok_or_else(not_found)?;
    let existing = Reservation::try_from(existing)?;
    authorize_update(&caller, &existing, service.provider_id, payload.status)?;

    if is_reactivation(existing.status, payload.status) {
        let others = load_booked(&mut *tx, service.id, existing.date, Some(existing.id)).await?;
        ensure_slot_free(&existing.interval(), &others)?;
    }

    let row = reservation_repo::update_reservation(
        &mut *tx,
        id,
        payload.status.map(ReservationStatus::as_str),
        payload.notes.as_deref(),
    )
    .await?;
    tx.commit().await?;

    let updated = Reservation::try_from(row)?;
    state.hub.notify_reservation(&updated, service.provider_id);

    if updated.status != existing.status && caller.id() != updated.user_id {
        notify_client(&state, &updated).await;
    }

    Ok(Json(
        ApiResponse::ok(updated).with_message("Reservation updated successfully"),
    ))
}

#[axum::debug_handler(state = Arc<ApiState>)]
pub async fn delete_reservation(
    State(state): State<Arc<ApiState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    if !caller.is_admin() {
        return Err(BookError::Authorization(
            "You do not have permission to delete reservations".to_string(),
        )
        .into());
    }

    let existing = reservation_repo::get_reservation_by_id(&state.db_pool, id)
        .await?
        .ok_or_else(not_found)?;
    reservation_repo::delete_reservation(&state.db_pool, id).await?;
    tracing::info!("Reservation {} deleted by {}", id, caller.id());

    state.hub.broadcast(crate::notify::HubEvent::AvailabilityChanged {
        service_id: existing.service_id,
        date: existing.date,
    });

    Ok(Json(ApiResponse::message("Reservation deleted successfully")))
}

/// Best effort: a failed notification never fails the status change.
async fn notify_client(state: &ApiState, reservation: &Reservation) {
    let Some((kind, title, message)) = status_notice(reservation) else {
        return;
    };

    let created = notification_repo::create_notification(
        &state.db_pool,
        reservation.user_id,
        kind.as_str(),
        &title,
        &message,
        Some(reservation.id),
    )
    .await
    .and_then(Notification::try_from);

    match created {
        Ok(notification) => state.hub.notify_notification(&notification),
        Err(e) => tracing::warn!(
            "Failed to notify user {} about reservation {}: {:?}",
            reservation.user_id,
            reservation.id,
            e
        ),
    }
}
