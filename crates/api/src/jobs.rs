//! # Background Jobs
//!
//! Recurring maintenance tasks: reminder notifications, the sweep that
//! closes out past reservations, notification cleanup, and pruning of the
//! in-memory rate limiter windows.
//!
//! Wall-clock schedules ("09:00 every day") are evaluated in the configured
//! timezone. The scheduler owns its tasks; `shutdown` stops and joins them.

use std::sync::Arc;

use bookit_core::models::{
    notification::{Notification, NotificationKind},
    reservation::ReservationStatus,
};
use bookit_core::time::TimeOfDay;
use bookit_db::{
    models::DbReminderTarget,
    repositories::{notification as notification_repo, reservation as reservation_repo},
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use eyre::Result;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::ApiState;

/// Read notifications older than this are deleted by the weekly cleanup.
pub const NOTIFICATION_RETENTION_DAYS: i64 = 30;

/// Upper bound on how far ahead a schedule is searched (one week of minutes).
const MAX_LOOKAHEAD_MINUTES: i64 = 7 * 24 * 60;

/// When a job fires, in local wall-clock terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSchedule {
    /// On every minute divisible by `n` (`*/n` in cron terms).
    EveryMinutes(u32),
    /// At minute 0 of every hour.
    Hourly,
    DailyAt(NaiveTime),
    WeeklyAt(Weekday, NaiveTime),
}

impl JobSchedule {
    /// Whether the schedule fires at the local minute `local`.
    pub fn matches(&self, local: &NaiveDateTime) -> bool {
        match *self {
            JobSchedule::EveryMinutes(n) => n > 0 && local.minute() % n == 0,
            JobSchedule::Hourly => local.minute() == 0,
            JobSchedule::DailyAt(at) => local.hour() == at.hour() && local.minute() == at.minute(),
            JobSchedule::WeeklyAt(day, at) => {
                local.weekday() == day && local.hour() == at.hour() && local.minute() == at.minute()
            }
        }
    }

    /// The first whole minute strictly after `now` at which the schedule
    /// fires in `tz`.
    pub fn next_after(&self, now: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let into_minute = Duration::seconds(now.second().into())
            + Duration::nanoseconds(now.nanosecond().into());
        let first = now - into_minute + Duration::minutes(1);

        (0..MAX_LOOKAHEAD_MINUTES)
            .map(|step| first + Duration::minutes(step))
            .find(|instant| self.matches(&instant.with_timezone(&tz).naive_local()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    DailyReminders,
    ConfirmationReminders,
    PastReservationSweep,
    NotificationCleanup,
    RateLimiterPrune,
}

impl Job {
    pub const ALL: [Job; 5] = [
        Job::DailyReminders,
        Job::ConfirmationReminders,
        Job::PastReservationSweep,
        Job::NotificationCleanup,
        Job::RateLimiterPrune,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Job::DailyReminders => "daily-reminders",
            Job::ConfirmationReminders => "confirmation-reminders",
            Job::PastReservationSweep => "update-past-reservations",
            Job::NotificationCleanup => "cleanup-notifications",
            Job::RateLimiterPrune => "prune-rate-limits",
        }
    }

    pub fn schedule(self) -> JobSchedule {
        match self {
            Job::DailyReminders => JobSchedule::DailyAt(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)),
            Job::ConfirmationReminders => JobSchedule::EveryMinutes(30),
            Job::PastReservationSweep => JobSchedule::Hourly,
            Job::NotificationCleanup => JobSchedule::WeeklyAt(
                Weekday::Sun,
                NaiveTime::from_hms_opt(2, 0, 0).unwrap_or(NaiveTime::MIN),
            ),
            Job::RateLimiterPrune => JobSchedule::EveryMinutes(5),
        }
    }

    pub async fn run(self, state: &ApiState, tz: Tz) -> Result<()> {
        let today = Utc::now().with_timezone(&tz).date_naive();
        match self {
            Job::DailyReminders => send_daily_reminders(state, today).await,
            Job::ConfirmationReminders => send_confirmation_reminders(state, today).await,
            Job::PastReservationSweep => sweep_past_reservations(state, today).await,
            Job::NotificationCleanup => cleanup_notifications(state).await,
            Job::RateLimiterPrune => {
                prune_rate_limits(state);
                Ok(())
            }
        }
    }
}

/// Title and text of the reminder a client gets the day before.
pub fn client_reminder(target: &DbReminderTarget) -> (String, String) {
    (
        "Appointment reminder".to_string(),
        format!(
            "You have an appointment tomorrow: {} at {}",
            target.service_name,
            TimeOfDay::from(target.start_time)
        ),
    )
}

/// Title and text of the nudge a provider gets for a still-pending booking.
pub fn provider_reminder(target: &DbReminderTarget) -> (String, String) {
    (
        "Reservation awaiting confirmation".to_string(),
        format!(
            "You have a pending reservation for tomorrow: {} - {} at {}",
            target.user_name,
            target.service_name,
            TimeOfDay::from(target.start_time)
        ),
    )
}

/// PENDING reservations dated before this are considered abandoned.
pub fn stale_pending_cutoff(today: NaiveDate) -> NaiveDate {
    today - Duration::days(1)
}

async fn deliver(
    state: &ApiState,
    recipient: uuid::Uuid,
    target: &DbReminderTarget,
    (title, message): (String, String),
) -> Result<()> {
    let row = notification_repo::create_notification(
        &state.db_pool,
        recipient,
        NotificationKind::ReservationReminder.as_str(),
        &title,
        &message,
        Some(target.reservation_id),
    )
    .await?;
    state.hub.notify_notification(&Notification::try_from(row)?);
    Ok(())
}

async fn send_daily_reminders(state: &ApiState, today: NaiveDate) -> Result<()> {
    let tomorrow = today + Duration::days(1);
    let targets = reservation_repo::reminder_targets(
        &state.db_pool,
        tomorrow,
        ReservationStatus::Confirmed.as_str(),
    )
    .await?;
    info!("Sending {} reminders for {}", targets.len(), tomorrow);

    for target in &targets {
        if let Err(e) = deliver(state, target.user_id, target, client_reminder(target)).await {
            error!("Reminder for reservation {} failed: {:?}", target.reservation_id, e);
        }
    }
    Ok(())
}

async fn send_confirmation_reminders(state: &ApiState, today: NaiveDate) -> Result<()> {
    let tomorrow = today + Duration::days(1);
    let targets = reservation_repo::reminder_targets(
        &state.db_pool,
        tomorrow,
        ReservationStatus::Pending.as_str(),
    )
    .await?;

    let mut sent = 0;
    for target in &targets {
        let already_sent = notification_repo::reminder_exists(
            &state.db_pool,
            target.provider_id,
            target.reservation_id,
            NotificationKind::ReservationReminder.as_str(),
        )
        .await?;
        if already_sent {
            continue;
        }

        match deliver(state, target.provider_id, target, provider_reminder(target)).await {
            Ok(()) => sent += 1,
            Err(e) => error!(
                "Confirmation reminder for reservation {} failed: {:?}",
                target.reservation_id, e
            ),
        }
    }
    debug!("Sent {} confirmation reminders for {}", sent, tomorrow);
    Ok(())
}

async fn sweep_past_reservations(state: &ApiState, today: NaiveDate) -> Result<()> {
    let no_shows = reservation_repo::mark_past_confirmed_no_show(&state.db_pool, today).await?;
    if no_shows > 0 {
        info!("Marked {} past reservations as NO_SHOW", no_shows);
    }

    let cancelled =
        reservation_repo::cancel_stale_pending(&state.db_pool, stale_pending_cutoff(today)).await?;
    if cancelled > 0 {
        info!("Cancelled {} stale pending reservations", cancelled);
    }
    Ok(())
}

async fn cleanup_notifications(state: &ApiState) -> Result<()> {
    let deleted =
        notification_repo::delete_read_older_than(&state.db_pool, NOTIFICATION_RETENTION_DAYS).await?;
    info!("Deleted {} old notifications", deleted);
    Ok(())
}

fn prune_rate_limits(state: &ApiState) {
    let now_ms = Utc::now().timestamp_millis();
    let windows = state.auth_limiter.prune_expired(now_ms) + state.general_limiter.prune_expired(now_ms);
    let channels = state.hub.prune();
    debug!("Pruned {} rate limit windows and {} idle channels", windows, channels);
}

/// Owns the job tasks.
pub struct JobScheduler {
    state: Arc<ApiState>,
    timezone: Tz,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl JobScheduler {
    pub fn new(state: Arc<ApiState>, timezone: Tz) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            state,
            timezone,
            shutdown,
            handles: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    /// Spawns one task per job. Calling it twice is a no-op.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        for job in Job::ALL {
            let state = Arc::clone(&self.state);
            let stop = self.shutdown.subscribe();
            self.handles
                .push(tokio::spawn(run_job(job, state, self.timezone, stop)));
        }
        info!("Started {} background jobs in {}", self.handles.len(), self.timezone);
    }

    /// Signals every task to stop and waits for them.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!("Job task ended abnormally: {}", e);
            }
        }
        info!("Background jobs stopped");
    }
}

async fn run_job(job: Job, state: Arc<ApiState>, tz: Tz, mut stop: watch::Receiver<bool>) {
    loop {
        let now = Utc::now();
        let Some(next) = job.schedule().next_after(now, tz) else {
            error!("Job {} has no upcoming run, stopping it", job.name());
            return;
        };
        let wait = (next - now).to_std().unwrap_or_default();

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = stop.changed() => return,
        }
        if *stop.borrow() {
            return;
        }

        debug!("Running job {}", job.name());
        match job.run(&state, tz).await {
            Ok(()) => debug!("Job {} completed", job.name()),
            Err(e) => error!("Job {} failed: {:?}", job.name(), e),
        }
    }
}
