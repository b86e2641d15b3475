use crate::models::DbSchedule;
use chrono::{NaiveTime, Utc};
use eyre::Result;
use sqlx::{PgExecutor, Pool, Postgres};
use uuid::Uuid;

pub async fn create_schedule(
    pool: &Pool<Postgres>,
    service_id: Uuid,
    day_of_week: i16,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<DbSchedule> {
    let id = Uuid::new_v4();

    tracing::debug!(
        "Creating schedule: id={}, service={}, day={}, {}-{}",
        id, service_id, day_of_week, start_time, end_time
    );

    let schedule = sqlx::query_as::<_, DbSchedule>(
        r#"
        INSERT INTO schedules (id, service_id, day_of_week, start_time, end_time, is_active, created_at)
        VALUES ($1, $2, $3, $4, $5, TRUE, $6)
        RETURNING id, service_id, day_of_week, start_time, end_time, is_active, created_at
        "#,
    )
    .bind(id)
    .bind(service_id)
    .bind(day_of_week)
    .bind(start_time)
    .bind(end_time)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(schedule)
}

/// All schedules, optionally restricted to one service.
pub async fn list_schedules(
    pool: &Pool<Postgres>,
    service_id: Option<Uuid>,
) -> Result<Vec<DbSchedule>> {
    let schedules = sqlx::query_as::<_, DbSchedule>(
        r#"
        SELECT id, service_id, day_of_week, start_time, end_time, is_active, created_at
        FROM schedules
        WHERE ($1::uuid IS NULL OR service_id = $1)
        ORDER BY service_id, day_of_week, start_time
        "#,
    )
    .bind(service_id)
    .fetch_all(pool)
    .await?;

    Ok(schedules)
}

pub async fn get_active_schedules_for_service<'e, E>(
    executor: E,
    service_id: Uuid,
) -> Result<Vec<DbSchedule>>
where
    E: PgExecutor<'e>,
{
    let schedules = sqlx::query_as::<_, DbSchedule>(
        r#"
        SELECT id, service_id, day_of_week, start_time, end_time, is_active, created_at
        FROM schedules
        WHERE service_id = $1 AND is_active = TRUE
        ORDER BY day_of_week, start_time
        "#,
    )
    .bind(service_id)
    .fetch_all(executor)
    .await?;

    tracing::debug!(
        "Found {} active schedules for service {}",
        schedules.len(),
        service_id
    );
    Ok(schedules)
}
