use bookit_api::handlers::{schedule::ensure_no_overlap, service::ensure_owner};
use bookit_core::{
    availability::ScheduleWindow,
    errors::BookError,
    models::{schedule::CreateScheduleRequest, service::Service, user::UserRole},
    time::{DayOfWeek, TimeOfDay},
};
use mockall::predicate;
use pretty_assertions::assert_eq;
use uuid::Uuid;

use crate::test_utils::{caller, db_schedule, db_service, time, TestContext};

fn window(day: DayOfWeek, start: &str, end: &str) -> ScheduleWindow {
    ScheduleWindow::new(day, TimeOfDay::parse(start).unwrap(), TimeOfDay::parse(end).unwrap())
        .unwrap()
}

fn request(service_id: Uuid, day_of_week: i16, start: &str, end: &str) -> CreateScheduleRequest {
    CreateScheduleRequest {
        service_id,
        day_of_week,
        start_time: start.to_string(),
        end_time: end.to_string(),
    }
}

// Mirrors create_schedule after authentication, with the repositories mocked
async fn test_create_schedule_wrapper(
    ctx: &mut TestContext,
    caller_role: UserRole,
    owner: bool,
    payload: CreateScheduleRequest,
) -> Result<(), BookError> {
    let caller = caller(caller_role);
    caller.require_role(&[UserRole::Provider, UserRole::Admin])?;
    let proposed = payload.window()?;

    let mut service = ctx
        .service_repo
        .get_service_by_id(payload.service_id)
        .await?
        .map(Service::from)
        .ok_or_else(|| BookError::NotFound("Service not found".to_string()))?;
    if owner {
        service.provider_id = caller.id();
    }
    ensure_owner(&caller, &service, "add schedules to")?;

    let mut existing = Vec::new();
    for row in ctx.schedule_repo.get_active_schedules_for_service(service.id).await? {
        existing.push(
            bookit_core::models::schedule::Schedule::try_from(row)?.window()?,
        );
    }
    ensure_no_overlap(&proposed, &existing)?;

    ctx.schedule_repo
        .create_schedule(
            service.id,
            proposed.day().index().into(),
            proposed.start().into(),
            proposed.end().into(),
        )
        .await?;
    Ok(())
}

fn with_service(ctx: &mut TestContext) -> Uuid {
    let service = db_service(Uuid::new_v4(), 60);
    let id = service.id;
    ctx.service_repo
        .expect_get_service_by_id()
        .with(predicate::eq(id))
        .returning(move |_| Ok(Some(service.clone())));
    ctx.schedule_repo
        .expect_get_active_schedules_for_service()
        .returning(|id| Ok(vec![db_schedule(id, 1, "09:00", "12:00")]));
    id
}

#[tokio::test]
async fn test_create_schedule_success() {
    let mut ctx = TestContext::new();
    let service_id = with_service(&mut ctx);
    ctx.schedule_repo
        .expect_create_schedule()
        .with(
            predicate::eq(service_id),
            predicate::eq(1i16),
            predicate::eq(time("12:00")),
            predicate::eq(time("14:00")),
        )
        .times(1)
        .returning(|service_id, day, start, end| Ok(bookit_db::models::DbSchedule {
            day_of_week: day,
            start_time: start,
            end_time: end,
            ..db_schedule(service_id, day, "00:00", "00:01")
        }));

    let result = test_create_schedule_wrapper(
        &mut ctx,
        UserRole::Provider,
        true,
        request(service_id, 1, "12:00", "14:00"),
    )
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_create_schedule_overlap() {
    let mut ctx = TestContext::new();
    let service_id = with_service(&mut ctx);
    ctx.schedule_repo.expect_create_schedule().times(0);

    let result = test_create_schedule_wrapper(
        &mut ctx,
        UserRole::Admin,
        false,
        request(service_id, 1, "11:00", "13:00"),
    )
    .await;
    assert!(matches!(result, Err(BookError::Conflict(_))));
}

#[tokio::test]
async fn test_create_schedule_not_owner() {
    let mut ctx = TestContext::new();
    let service_id = with_service(&mut ctx);

    let result = test_create_schedule_wrapper(
        &mut ctx,
        UserRole::Provider,
        false,
        request(service_id, 2, "09:00", "10:00"),
    )
    .await;
    assert!(matches!(result, Err(BookError::Authorization(_))));
}

#[tokio::test]
async fn test_create_schedule_client_forbidden() {
    let mut ctx = TestContext::new();

    let result = test_create_schedule_wrapper(
        &mut ctx,
        UserRole::Client,
        true,
        request(Uuid::new_v4(), 1, "09:00", "10:00"),
    )
    .await;
    assert!(matches!(result, Err(BookError::Authorization(_))));
}

#[tokio::test]
async fn test_create_schedule_empty_window() {
    let mut ctx = TestContext::new();

    let result = test_create_schedule_wrapper(
        &mut ctx,
        UserRole::Provider,
        true,
        request(Uuid::new_v4(), 1, "10:00", "10:00"),
    )
    .await;
    assert!(matches!(result, Err(BookError::InvalidInput(_))));
}

#[test]
fn test_overlap_rules() {
    let existing = [window(DayOfWeek::MONDAY, "09:00", "12:00")];

    // Touching windows are fine
    assert!(ensure_no_overlap(&window(DayOfWeek::MONDAY, "12:00", "13:00"), &existing).is_ok());
    // Same hours on another day are fine
    assert!(ensure_no_overlap(&window(DayOfWeek::SATURDAY, "09:00", "12:00"), &existing).is_ok());

    match ensure_no_overlap(&window(DayOfWeek::MONDAY, "08:00", "09:30"), &existing) {
        Err(BookError::Conflict(message)) => {
            assert_eq!(message, "An overlapping schedule already exists for this day")
        }
        other => panic!("Expected conflict, got {:?}", other),
    }
}
