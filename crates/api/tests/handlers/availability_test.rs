use bookit_api::handlers::availability::{build_day_availability, parse_query};
use bookit_core::{
    availability::{BookedInterval, ScheduleWindow},
    errors::BookError,
    models::{availability::AvailabilityQuery, schedule::Schedule, service::Service},
    time::TimeOfDay,
};
use mockall::predicate;
use pretty_assertions::assert_eq;
use uuid::Uuid;

use crate::test_utils::{date, db_schedule, db_service, TestContext};

fn query(service_id: Option<&str>, on: Option<&str>) -> AvailabilityQuery {
    AvailabilityQuery {
        service_id: service_id.map(str::to_string),
        date: on.map(str::to_string),
    }
}

fn starts(availability: &bookit_core::models::availability::DayAvailability) -> Vec<(String, bool)> {
    availability
        .slots
        .iter()
        .map(|slot| (slot.start_time.to_string(), slot.is_available))
        .collect()
}

#[test]
fn test_parse_query_requires_both_fields() {
    for incomplete in [query(None, Some("2024-03-18")), query(Some("x"), None), query(None, None)] {
        match parse_query(&incomplete) {
            Err(BookError::Validation(message)) => {
                assert_eq!(message, "serviceId and date are required")
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }
}

#[test]
fn test_parse_query_rejects_malformed_values() {
    let id = Uuid::new_v4().to_string();

    assert!(matches!(
        parse_query(&query(Some("not-a-uuid"), Some("2024-03-18"))),
        Err(BookError::Validation(_))
    ));
    assert!(matches!(
        parse_query(&query(Some(&id), Some("18/03/2024"))),
        Err(BookError::InvalidInput(_))
    ));
}

#[test]
fn test_parse_query_truncates_timestamps() {
    let id = Uuid::new_v4();
    let (service_id, on) =
        parse_query(&query(Some(&id.to_string()), Some("2024-03-18T15:30:00Z"))).unwrap();

    assert_eq!(service_id, id);
    assert_eq!(on, date("2024-03-18"));
}

// Mirrors get_availability with the repositories mocked
async fn test_get_availability_wrapper(
    ctx: &mut TestContext,
    service_id: Uuid,
    on: &str,
) -> Result<Vec<(String, bool)>, BookError> {
    let service = ctx
        .service_repo
        .get_service_by_id(service_id)
        .await?
        .map(Service::from)
        .filter(|service| service.is_active)
        .ok_or_else(|| BookError::NotFound("Service not found or inactive".to_string()))?;

    let mut windows = Vec::new();
    for row in ctx.schedule_repo.get_active_schedules_for_service(service_id).await? {
        windows.push(Schedule::try_from(row)?.window()?);
    }

    let on = date(on);
    let booked: Vec<BookedInterval> = ctx
        .reservation_repo
        .get_active_intervals(service_id, on, None)
        .await?
        .into_iter()
        .map(|(s, e)| BookedInterval::new(s.into(), e.into()))
        .collect();

    Ok(starts(&build_day_availability(&service, &windows, on, &booked)?))
}

#[tokio::test]
async fn test_get_availability_marks_booked_slots() {
    let mut ctx = TestContext::new();
    let service = db_service(Uuid::new_v4(), 60);
    let service_id = service.id;

    ctx.service_repo
        .expect_get_service_by_id()
        .with(predicate::eq(service_id))
        .returning(move |_| Ok(Some(service.clone())));
    ctx.schedule_repo
        .expect_get_active_schedules_for_service()
        .returning(|id| Ok(vec![db_schedule(id, 1, "09:00", "11:00")]));
    ctx.reservation_repo
        .expect_get_active_intervals()
        .with(
            predicate::eq(service_id),
            predicate::eq(date("2024-03-18")),
            predicate::eq(None),
        )
        .returning(|_, _, _| Ok(vec![(crate::test_utils::time("09:30"), crate::test_utils::time("10:30"))]));

    let slots = test_get_availability_wrapper(&mut ctx, service_id, "2024-03-18")
        .await
        .unwrap();

    assert_eq!(
        slots,
        vec![
            ("09:00".to_string(), false),
            ("09:30".to_string(), false),
            ("10:00".to_string(), false),
        ]
    );
}

#[tokio::test]
async fn test_get_availability_inactive_service() {
    let mut ctx = TestContext::new();
    let mut service = db_service(Uuid::new_v4(), 60);
    service.is_active = false;
    let service_id = service.id;

    ctx.service_repo
        .expect_get_service_by_id()
        .returning(move |_| Ok(Some(service.clone())));

    let result = test_get_availability_wrapper(&mut ctx, service_id, "2024-03-18").await;
    assert!(matches!(result, Err(BookError::NotFound(_))));
}

#[test]
fn test_day_without_window_has_no_slots() {
    let service = Service::from(db_service(Uuid::new_v4(), 30));
    let windows = [ScheduleWindow::new(
        bookit_core::time::DayOfWeek::MONDAY,
        TimeOfDay::parse("09:00").unwrap(),
        TimeOfDay::parse("10:00").unwrap(),
    )
    .unwrap()];

    // 2024-03-17 is a Sunday
    let availability = build_day_availability(&service, &windows, date("2024-03-17"), &[]).unwrap();
    assert!(availability.slots.is_empty());
}

#[test]
fn test_slots_from_several_windows_are_sorted() {
    let service = Service::from(db_service(Uuid::new_v4(), 30));
    let monday = bookit_core::time::DayOfWeek::MONDAY;
    let t = |text: &str| TimeOfDay::parse(text).unwrap();
    let windows = [
        ScheduleWindow::new(monday, t("14:00"), t("15:00")).unwrap(),
        ScheduleWindow::new(monday, t("09:00"), t("10:00")).unwrap(),
    ];
    let booked = [BookedInterval::new(t("14:00"), t("14:30"))];

    let availability = build_day_availability(&service, &windows, date("2024-03-18"), &booked).unwrap();

    assert_eq!(
        starts(&availability),
        vec![
            ("09:00".to_string(), true),
            ("09:30".to_string(), true),
            ("14:00".to_string(), false),
            ("14:30".to_string(), true),
        ]
    );
}
