use bookit_api::handlers::reservation::{
    authorize_update, can_view, ensure_slot_free, is_reactivation, plan_reservation, scope_for,
    status_notice,
};
use bookit_core::{
    availability::{BookedInterval, Rejection, ScheduleWindow},
    errors::BookError,
    models::{
        notification::NotificationKind,
        reservation::{Reservation, ReservationStatus},
        schedule::Schedule,
        service::Service,
        user::UserRole,
    },
    time::TimeOfDay,
};
use bookit_db::repositories::reservation::ReservationScope;
use chrono::NaiveDate;
use mockall::predicate;
use pretty_assertions::assert_eq;
use uuid::Uuid;

use crate::test_utils::{caller, date, db_reservation, db_schedule, db_service, time, TestContext};

// Mirrors the read half of create_reservation with the repositories mocked
async fn test_create_reservation_wrapper(
    ctx: &mut TestContext,
    service_id: Uuid,
    on: NaiveDate,
    start: &str,
) -> Result<BookedInterval, BookError> {
    let service = ctx
        .service_repo
        .get_service_by_id(service_id)
        .await?
        .map(Service::from)
        .ok_or_else(|| BookError::Validation("Service is not available".to_string()))?;

    let windows = ctx
        .schedule_repo
        .get_active_schedules_for_service(service_id)
        .await?
        .into_iter()
        .map(|row| Schedule::try_from(row).map_err(BookError::Database))
        .map(|schedule| schedule.and_then(|s| s.window().map_err(BookError::from)))
        .collect::<Result<Vec<ScheduleWindow>, _>>()?;

    let existing: Vec<BookedInterval> = ctx
        .reservation_repo
        .get_active_intervals(service_id, on, None)
        .await?
        .into_iter()
        .map(|(s, e)| BookedInterval::new(s.into(), e.into()))
        .collect();

    plan_reservation(&service, &windows, on, TimeOfDay::parse(start)?, &existing)
}

fn setup(ctx: &mut TestContext, duration: i32, booked: Vec<(&str, &str)>) -> Uuid {
    let service = db_service(Uuid::new_v4(), duration);
    let service_id = service.id;
    let booked: Vec<_> = booked.into_iter().map(|(s, e)| (time(s), time(e))).collect();

    ctx.service_repo
        .expect_get_service_by_id()
        .with(predicate::eq(service_id))
        .returning(move |_| Ok(Some(service.clone())));
    // Monday 08:00-12:00
    ctx.schedule_repo
        .expect_get_active_schedules_for_service()
        .with(predicate::eq(service_id))
        .returning(move |id| Ok(vec![db_schedule(id, 1, "08:00", "12:00")]));
    ctx.reservation_repo
        .expect_get_active_intervals()
        .returning(move |_, _, _| Ok(booked.clone()));

    service_id
}

fn reservation(user_id: Uuid, status: &str) -> Reservation {
    Reservation::try_from(db_reservation(user_id, Uuid::new_v4(), status)).unwrap()
}

#[tokio::test]
async fn test_create_reservation_in_open_slot() {
    let mut ctx = TestContext::new();
    let service_id = setup(&mut ctx, 60, vec![("08:00", "09:00")]);

    let interval = test_create_reservation_wrapper(&mut ctx, service_id, date("2024-03-18"), "09:00")
        .await
        .unwrap();

    assert_eq!(interval.start.to_string(), "09:00");
    assert_eq!(interval.end.to_string(), "10:00");
}

#[tokio::test]
async fn test_create_reservation_conflict() {
    let mut ctx = TestContext::new();
    let service_id = setup(&mut ctx, 60, vec![("09:00", "10:00")]);

    let result =
        test_create_reservation_wrapper(&mut ctx, service_id, date("2024-03-18"), "09:30").await;

    match result {
        Err(BookError::Conflict(message)) => assert!(message.contains("09:00")),
        other => panic!("Expected conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn test_create_reservation_outside_schedule() {
    let mut ctx = TestContext::new();
    let service_id = setup(&mut ctx, 60, vec![]);

    // Tuesday has no window
    let result =
        test_create_reservation_wrapper(&mut ctx, service_id, date("2024-03-19"), "09:00").await;
    assert!(matches!(result, Err(BookError::Validation(_))));

    // Monday, but the start is at closing time
    let result =
        test_create_reservation_wrapper(&mut ctx, service_id, date("2024-03-18"), "12:00").await;
    assert!(matches!(result, Err(BookError::Validation(_))));
}

#[tokio::test]
async fn test_create_reservation_may_run_past_window_end() {
    let mut ctx = TestContext::new();
    let service_id = setup(&mut ctx, 60, vec![]);

    let interval = test_create_reservation_wrapper(&mut ctx, service_id, date("2024-03-18"), "11:30")
        .await
        .unwrap();
    assert_eq!(interval.end.to_string(), "12:30");
}

#[tokio::test]
async fn test_create_reservation_touching_existing_is_allowed() {
    let mut ctx = TestContext::new();
    let service_id = setup(&mut ctx, 60, vec![("08:00", "09:00"), ("10:00", "11:00")]);

    assert!(
        test_create_reservation_wrapper(&mut ctx, service_id, date("2024-03-18"), "09:00")
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_create_reservation_unknown_service() {
    let mut ctx = TestContext::new();
    ctx.service_repo
        .expect_get_service_by_id()
        .returning(|_| Ok(None));

    let result =
        test_create_reservation_wrapper(&mut ctx, Uuid::new_v4(), date("2024-03-18"), "09:00").await;
    assert!(matches!(result, Err(BookError::Validation(_))));
}

#[test]
fn test_inactive_service_is_rejected() {
    let mut row = db_service(Uuid::new_v4(), 60);
    row.is_active = false;
    let service = Service::from(row);
    let windows = [ScheduleWindow::new(
        bookit_core::time::DayOfWeek::MONDAY,
        TimeOfDay::parse("08:00").unwrap(),
        TimeOfDay::parse("12:00").unwrap(),
    )
    .unwrap()];

    let result = plan_reservation(
        &service,
        &windows,
        date("2024-03-18"),
        TimeOfDay::parse("09:00").unwrap(),
        &[],
    );
    assert!(matches!(result, Err(BookError::Validation(_))));
}

#[test]
fn test_end_past_midnight_is_invalid_input() {
    let service = Service::from(db_service(Uuid::new_v4(), 120));
    let windows = [ScheduleWindow::new(
        bookit_core::time::DayOfWeek::MONDAY,
        TimeOfDay::parse("22:00").unwrap(),
        TimeOfDay::parse("23:59").unwrap(),
    )
    .unwrap()];

    let result = plan_reservation(
        &service,
        &windows,
        date("2024-03-18"),
        TimeOfDay::parse("23:00").unwrap(),
        &[],
    );
    assert!(matches!(result, Err(BookError::InvalidInput(_))));
}

#[test]
fn test_reactivation_conflict_check() {
    let interval = BookedInterval::new(
        TimeOfDay::parse("10:00").unwrap(),
        TimeOfDay::parse("11:00").unwrap(),
    );
    let taken = BookedInterval::new(
        TimeOfDay::parse("10:30").unwrap(),
        TimeOfDay::parse("11:30").unwrap(),
    );
    let touching = BookedInterval::new(
        TimeOfDay::parse("11:00").unwrap(),
        TimeOfDay::parse("12:00").unwrap(),
    );

    assert_eq!(ensure_slot_free(&interval, &[touching]), Ok(()));
    assert_eq!(
        ensure_slot_free(&interval, &[touching, taken]),
        Err(Rejection::Conflict(taken))
    );
}

#[test]
fn test_scope_follows_role() {
    let client = caller(UserRole::Client);
    let provider = caller(UserRole::Provider);
    let admin = caller(UserRole::Admin);

    assert!(matches!(scope_for(&client), ReservationScope::User(id) if id == client.id()));
    assert!(matches!(scope_for(&provider), ReservationScope::Provider(id) if id == provider.id()));
    assert!(matches!(scope_for(&admin), ReservationScope::All));
}

#[test]
fn test_view_permissions() {
    let client = caller(UserRole::Client);
    let stranger = caller(UserRole::Client);
    let provider = caller(UserRole::Provider);
    let other_provider = caller(UserRole::Provider);
    let admin = caller(UserRole::Admin);
    let booked = reservation(client.id(), "PENDING");

    assert!(can_view(&client, &booked, provider.id()));
    assert!(can_view(&provider, &booked, provider.id()));
    assert!(can_view(&admin, &booked, provider.id()));
    assert!(!can_view(&stranger, &booked, provider.id()));
    assert!(!can_view(&other_provider, &booked, provider.id()));
}

#[test]
fn test_client_may_only_cancel() {
    let client = caller(UserRole::Client);
    let provider_id = Uuid::new_v4();
    let booked = reservation(client.id(), "PENDING");

    assert!(authorize_update(&client, &booked, provider_id, Some(ReservationStatus::Cancelled)).is_ok());
    assert!(matches!(
        authorize_update(&client, &booked, provider_id, Some(ReservationStatus::Confirmed)),
        Err(BookError::Authorization(_))
    ));
    assert!(matches!(
        authorize_update(&client, &booked, provider_id, None),
        Err(BookError::Authorization(_))
    ));
}

#[test]
fn test_owning_provider_and_admin_may_update() {
    let provider = caller(UserRole::Provider);
    let admin = caller(UserRole::Admin);
    let booked = reservation(Uuid::new_v4(), "PENDING");

    for status in [
        Some(ReservationStatus::Confirmed),
        Some(ReservationStatus::Completed),
        Some(ReservationStatus::NoShow),
        None,
    ] {
        assert!(authorize_update(&provider, &booked, provider.id(), status).is_ok());
        assert!(authorize_update(&admin, &booked, provider.id(), status).is_ok());
    }

    let other_provider = caller(UserRole::Provider);
    assert!(matches!(
        authorize_update(&other_provider, &booked, provider.id(), Some(ReservationStatus::Confirmed)),
        Err(BookError::Authorization(_))
    ));
}

#[tokio::test]
async fn test_get_reservation_not_found() {
    let mut ctx = TestContext::new();
    let id = Uuid::new_v4();
    ctx.reservation_repo
        .expect_get_reservation_by_id()
        .with(predicate::eq(id))
        .returning(|_| Ok(None));

    let found = ctx.reservation_repo.get_reservation_by_id(id).await.unwrap();
    assert!(found.is_none());
}

#[test]
fn test_status_notice() {
    let confirmed = reservation(Uuid::new_v4(), "CONFIRMED");
    let (kind, title, message) = status_notice(&confirmed).unwrap();
    assert_eq!(kind, NotificationKind::ReservationConfirmed);
    assert_eq!(title, "Reservation confirmed");
    assert_eq!(message, "Your reservation on 2024-03-18 at 10:00 has been confirmed");

    let cancelled = reservation(Uuid::new_v4(), "CANCELLED");
    assert_eq!(
        status_notice(&cancelled).map(|(kind, _, _)| kind),
        Some(NotificationKind::ReservationCancelled)
    );

    assert!(status_notice(&reservation(Uuid::new_v4(), "COMPLETED")).is_none());
}

// Mirrors the locking half of update_reservation with the repositories mocked
async fn test_update_status_wrapper(
    ctx: &mut TestContext,
    id: Uuid,
    requested: ReservationStatus,
) -> Result<ReservationStatus, BookError> {
    let service_id = ctx
        .reservation_repo
        .get_reservation_by_id(id)
        .await?
        .ok_or_else(|| BookError::NotFound("Reservation not found".to_string()))?
        .service_id;

    // The service lock would be taken here; the row is read again after it
    let existing = ctx
        .reservation_repo
        .lock_reservation(id)
        .await?
        .ok_or_else(|| BookError::NotFound("Reservation not found".to_string()))?;
    let existing = Reservation::try_from(existing)?;

    if is_reactivation(existing.status, Some(requested)) {
        let others: Vec<BookedInterval> = ctx
            .reservation_repo
            .get_active_intervals(service_id, existing.date, Some(existing.id))
            .await?
            .into_iter()
            .map(|(s, e)| BookedInterval::new(s.into(), e.into()))
            .collect();
        ensure_slot_free(&existing.interval(), &others)?;
    }
    Ok(requested)
}

#[tokio::test]
async fn test_update_uses_status_read_under_lock() {
    let mut ctx = TestContext::new();
    let service_id = Uuid::new_v4();
    let before = db_reservation(Uuid::new_v4(), service_id, "CONFIRMED");
    let id = before.id;
    // Cancelled by another request while this one waited for the lock
    let after = bookit_db::models::DbReservation {
        status: "CANCELLED".to_string(),
        ..before.clone()
    };

    ctx.reservation_repo
        .expect_get_reservation_by_id()
        .with(predicate::eq(id))
        .returning(move |_| Ok(Some(before.clone())));
    ctx.reservation_repo
        .expect_lock_reservation()
        .with(predicate::eq(id))
        .times(1)
        .returning(move |_| Ok(Some(after.clone())));
    // Another booking took the slot in the meantime
    ctx.reservation_repo
        .expect_get_active_intervals()
        .with(
            predicate::eq(service_id),
            predicate::eq(date("2024-03-18")),
            predicate::eq(Some(id)),
        )
        .times(1)
        .returning(|_, _, _| Ok(vec![(time("10:00"), time("11:00"))]));

    let result = test_update_status_wrapper(&mut ctx, id, ReservationStatus::Pending).await;
    assert!(matches!(result, Err(BookError::Conflict(_))));
}

#[tokio::test]
async fn test_update_of_active_reservation_skips_conflict_scan() {
    let mut ctx = TestContext::new();
    let row = db_reservation(Uuid::new_v4(), Uuid::new_v4(), "CONFIRMED");
    let id = row.id;
    let locked = row.clone();

    ctx.reservation_repo
        .expect_get_reservation_by_id()
        .returning(move |_| Ok(Some(row.clone())));
    ctx.reservation_repo
        .expect_lock_reservation()
        .returning(move |_| Ok(Some(locked.clone())));
    ctx.reservation_repo.expect_get_active_intervals().times(0);

    let result = test_update_status_wrapper(&mut ctx, id, ReservationStatus::Pending).await;
    assert_eq!(result.unwrap(), ReservationStatus::Pending);
}

#[test]
fn test_reactivation_detection() {
    use ReservationStatus::*;

    assert!(is_reactivation(Cancelled, Some(Pending)));
    assert!(is_reactivation(NoShow, Some(Confirmed)));
    assert!(!is_reactivation(Confirmed, Some(Pending)));
    assert!(!is_reactivation(Cancelled, Some(Completed)));
    assert!(!is_reactivation(Cancelled, None));
}
