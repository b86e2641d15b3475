use bookit_api::jobs::{provider_reminder, Job, JobSchedule};
use bookit_core::models::{notification::NotificationKind, reservation::ReservationStatus};
use bookit_db::models::{DbNotification, DbReminderTarget};
use chrono::{NaiveDateTime, Utc};
use mockall::predicate;
use pretty_assertions::assert_eq;
use uuid::Uuid;

use crate::test_utils::{date, time, TestContext};

fn target() -> DbReminderTarget {
    DbReminderTarget {
        reservation_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        user_name: "Ana".to_string(),
        service_name: "Haircut".to_string(),
        provider_id: Uuid::new_v4(),
        start_time: time("10:30"),
    }
}

// Mirrors the confirmation reminder job with the repositories mocked
async fn test_confirmation_reminders_wrapper(ctx: &mut TestContext) -> eyre::Result<usize> {
    let targets = ctx
        .reservation_repo
        .reminder_targets(date("2024-03-19"), ReservationStatus::Pending.as_str().to_string())
        .await?;

    let mut sent = 0;
    for target in &targets {
        let kind = NotificationKind::ReservationReminder.as_str().to_string();
        if ctx
            .notification_repo
            .reminder_exists(target.provider_id, target.reservation_id, kind.clone())
            .await?
        {
            continue;
        }
        let (title, message) = provider_reminder(target);
        ctx.notification_repo
            .create_notification(target.provider_id, kind, title, message, Some(target.reservation_id))
            .await?;
        sent += 1;
    }
    Ok(sent)
}

#[tokio::test]
async fn test_confirmation_reminders_are_sent_once() {
    let mut ctx = TestContext::new();
    let fresh = target();
    let reminded = target();
    let fresh_reservation = fresh.reservation_id;
    let reminded_reservation = reminded.reservation_id;

    ctx.reservation_repo
        .expect_reminder_targets()
        .with(predicate::eq(date("2024-03-19")), predicate::eq("PENDING".to_string()))
        .returning(move |_, _| Ok(vec![fresh.clone(), reminded.clone()]));
    ctx.notification_repo
        .expect_reminder_exists()
        .returning(move |_, reservation_id, _| Ok(reservation_id == reminded_reservation));
    ctx.notification_repo
        .expect_create_notification()
        .withf(move |_, kind, _, message, reservation_id| {
            kind == "RESERVATION_REMINDER"
                && message.contains("Ana - Haircut at 10:30")
                && *reservation_id == Some(fresh_reservation)
        })
        .times(1)
        .returning(|user_id, kind, title, message, reservation_id| {
            Ok(DbNotification {
                id: Uuid::new_v4(),
                user_id,
                kind,
                title,
                message,
                reservation_id,
                is_read: false,
                created_at: Utc::now(),
            })
        });

    let sent = test_confirmation_reminders_wrapper(&mut ctx).await.unwrap();
    assert_eq!(sent, 1);
}

#[test]
fn test_job_schedules() {
    let at = |text: &str| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M").unwrap();

    assert!(Job::DailyReminders.schedule().matches(&at("2024-03-18 09:00")));
    assert!(!Job::DailyReminders.schedule().matches(&at("2024-03-18 09:01")));

    assert!(Job::ConfirmationReminders.schedule().matches(&at("2024-03-18 13:30")));
    assert!(!Job::ConfirmationReminders.schedule().matches(&at("2024-03-18 13:15")));

    assert!(Job::PastReservationSweep.schedule().matches(&at("2024-03-18 17:00")));

    // 2024-03-17 is a Sunday
    assert!(Job::NotificationCleanup.schedule().matches(&at("2024-03-17 02:00")));
    assert!(!Job::NotificationCleanup.schedule().matches(&at("2024-03-18 02:00")));

    assert_eq!(Job::RateLimiterPrune.schedule(), JobSchedule::EveryMinutes(5));
}
