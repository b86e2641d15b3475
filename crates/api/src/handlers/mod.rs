//! Request handlers. Each submodule owns one resource; shared loaders that
//! turn stored rows into engine inputs live here.

pub mod auth;
pub mod availability;
pub mod notification;
pub mod reservation;
pub mod schedule;
pub mod service;

use bookit_core::{
    availability::{BookedInterval, ScheduleWindow},
    models::schedule::Schedule,
};
use bookit_db::{models::convert_all, repositories};
use chrono::NaiveDate;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::middleware::error_handling::AppError;

/// Active schedule windows of a service, in engine form.
pub(crate) async fn load_windows<'e, E>(
    executor: E,
    service_id: Uuid,
) -> Result<Vec<ScheduleWindow>, AppError>
where
    E: PgExecutor<'e>,
{
    let rows = repositories::schedule::get_active_schedules_for_service(executor, service_id).await?;
    let schedules: Vec<Schedule> = convert_all(rows)?;
    let windows = schedules
        .iter()
        .map(Schedule::window)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(windows)
}

/// Intervals held by PENDING or CONFIRMED reservations on `date`.
pub(crate) async fn load_booked<'e, E>(
    executor: E,
    service_id: Uuid,
    date: NaiveDate,
    exclude: Option<Uuid>,
) -> Result<Vec<BookedInterval>, AppError>
where
    E: PgExecutor<'e>,
{
    let rows =
        repositories::reservation::get_active_intervals(executor, service_id, date, exclude).await?;
    Ok(rows
        .into_iter()
        .map(|(start, end)| BookedInterval::new(start.into(), end.into()))
        .collect())
}
