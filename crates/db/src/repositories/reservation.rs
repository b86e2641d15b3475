use crate::models::{DbReminderTarget, DbReservation, DbService};
use chrono::{NaiveDate, NaiveTime, Utc};
use eyre::{eyre, Result};
use sqlx::{PgExecutor, Pool, Postgres, QueryBuilder};
use uuid::Uuid;

const RESERVATION_COLUMNS: &str = "r.id, r.user_id, r.service_id, r.date, r.start_time, r.end_time, \
     r.status, r.notes, r.total_price, r.created_at, r.updated_at";

/// Which reservations a caller is allowed to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationScope {
    All,
    /// Reservations made by this user.
    User(Uuid),
    /// Reservations on services owned by this provider.
    Provider(Uuid),
}

#[derive(Debug, Clone)]
pub struct ReservationListQuery {
    pub scope: ReservationScope,
    pub status: Option<String>,
    pub service_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub struct NewReservation<'a> {
    pub user_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub notes: Option<&'a str>,
    pub total_price: f64,
}

/// Locks the service row for the rest of the transaction. Concurrent bookings
/// of the same service queue here, so their conflict checks see each other's
/// inserts.
pub async fn lock_service<'e, E>(executor: E, service_id: Uuid) -> Result<Option<DbService>>
where
    E: PgExecutor<'e>,
{
    let service = sqlx::query_as::<_, DbService>(
        r#"
        SELECT id, name, description, duration, price, is_active, provider_id, created_at, updated_at
        FROM services
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(service_id)
    .fetch_optional(executor)
    .await?;

    Ok(service)
}

/// Start and end of every PENDING or CONFIRMED reservation of a service on a date.
pub async fn get_active_intervals<'e, E>(
    executor: E,
    service_id: Uuid,
    date: NaiveDate,
    exclude: Option<Uuid>,
) -> Result<Vec<(NaiveTime, NaiveTime)>>
where
    E: PgExecutor<'e>,
{
    let intervals = sqlx::query_as::<_, (NaiveTime, NaiveTime)>(
        r#"
        SELECT start_time, end_time
        FROM reservations
        WHERE service_id = $1
          AND date = $2
          AND status IN ('PENDING', 'CONFIRMED')
          AND ($3::uuid IS NULL OR id <> $3)
        ORDER BY start_time
        "#,
    )
    .bind(service_id)
    .bind(date)
    .bind(exclude)
    .fetch_all(executor)
    .await?;

    tracing::debug!(
        "Found {} active reservations for service {} on {}",
        intervals.len(),
        service_id,
        date
    );
    Ok(intervals)
}

pub async fn create_reservation<'e, E>(executor: E, new: &NewReservation<'_>) -> Result<DbReservation>
where
    E: PgExecutor<'e>,
{
    let id = Uuid::new_v4();

    tracing::debug!(
        "Creating reservation: id={}, service={}, date={}, {}-{}",
        id, new.service_id, new.date, new.start_time, new.end_time
    );

    let reservation = sqlx::query_as::<_, DbReservation>(
        r#"
        INSERT INTO reservations
            (id, user_id, service_id, date, start_time, end_time, status, notes, total_price, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, 'PENDING', $7, $8, $9, $9)
        RETURNING id, user_id, service_id, date, start_time, end_time, status, notes, total_price, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(new.user_id)
    .bind(new.service_id)
    .bind(new.date)
    .bind(new.start_time)
    .bind(new.end_time)
    .bind(new.notes)
    .bind(new.total_price)
    .bind(Utc::now())
    .fetch_one(executor)
    .await?;

    Ok(reservation)
}

pub async fn get_reservation_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<DbReservation>>
where
    E: PgExecutor<'e>,
{
    let reservation = sqlx::query_as::<_, DbReservation>(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations r WHERE r.id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(reservation)
}

/// Like `get_reservation_by_id`, but holds a row lock until the transaction ends.
pub async fn lock_reservation<'e, E>(executor: E, id: Uuid) -> Result<Option<DbReservation>>
where
    E: PgExecutor<'e>,
{
    let reservation = sqlx::query_as::<_, DbReservation>(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations r WHERE r.id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(reservation)
}

fn push_reservation_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ReservationListQuery) {
    builder.push(" JOIN services s ON s.id = r.service_id WHERE TRUE");
    match query.scope {
        ReservationScope::All => {}
        ReservationScope::User(user_id) => {
            builder.push(" AND r.user_id = ").push_bind(user_id);
        }
        ReservationScope::Provider(provider_id) => {
            builder.push(" AND s.provider_id = ").push_bind(provider_id);
        }
    }
    if let Some(status) = &query.status {
        builder.push(" AND r.status = ").push_bind(status.clone());
    }
    if let Some(service_id) = query.service_id {
        builder.push(" AND r.service_id = ").push_bind(service_id);
    }
    if let Some(date_from) = query.date_from {
        builder.push(" AND r.date >= ").push_bind(date_from);
    }
    if let Some(date_to) = query.date_to {
        builder.push(" AND r.date <= ").push_bind(date_to);
    }
}

/// One page of reservations visible to the scope, latest date first, plus the total.
pub async fn list_reservations(
    pool: &Pool<Postgres>,
    query: &ReservationListQuery,
) -> Result<(Vec<DbReservation>, i64)> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {RESERVATION_COLUMNS} FROM reservations r"));
    push_reservation_filters(&mut builder, query);
    builder
        .push(" ORDER BY r.date DESC, r.start_time DESC LIMIT ")
        .push_bind(query.limit)
        .push(" OFFSET ")
        .push_bind(query.offset);
    let reservations = builder
        .build_query_as::<DbReservation>()
        .fetch_all(pool)
        .await?;

    let mut counter = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reservations r");
    push_reservation_filters(&mut counter, query);
    let total: i64 = counter.build_query_scalar().fetch_one(pool).await?;

    Ok((reservations, total))
}

/// Updates status and/or notes; `None` keeps the stored value.
pub async fn update_reservation<'e, E>(
    executor: E,
    id: Uuid,
    status: Option<&str>,
    notes: Option<&str>,
) -> Result<DbReservation>
where
    E: PgExecutor<'e>,
{
    let reservation = sqlx::query_as::<_, DbReservation>(
        r#"
        UPDATE reservations
        SET status = COALESCE($2, status),
            notes = COALESCE($3, notes),
            updated_at = $4
        WHERE id = $1
        RETURNING id, user_id, service_id, date, start_time, end_time, status, notes, total_price, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(notes)
    .bind(Utc::now())
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| eyre!("Reservation not found"))?;

    tracing::debug!("Reservation updated: id={}, status={}", id, reservation.status);
    Ok(reservation)
}

pub async fn delete_reservation(pool: &Pool<Postgres>, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM reservations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// CONFIRMED reservations dated before `today` become NO_SHOW.
pub async fn mark_past_confirmed_no_show(pool: &Pool<Postgres>, today: NaiveDate) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE reservations
        SET status = 'NO_SHOW', updated_at = $2
        WHERE status = 'CONFIRMED' AND date < $1
        "#,
    )
    .bind(today)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// PENDING reservations dated before `before` become CANCELLED.
pub async fn cancel_stale_pending(pool: &Pool<Postgres>, before: NaiveDate) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE reservations
        SET status = 'CANCELLED', updated_at = $2
        WHERE status = 'PENDING' AND date < $1
        "#,
    )
    .bind(before)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Reservations on `date` with `status`, joined with the client and service names.
pub async fn reminder_targets(
    pool: &Pool<Postgres>,
    date: NaiveDate,
    status: &str,
) -> Result<Vec<DbReminderTarget>> {
    let targets = sqlx::query_as::<_, DbReminderTarget>(
        r#"
        SELECT r.id AS reservation_id,
               r.user_id,
               u.name AS user_name,
               s.name AS service_name,
               s.provider_id,
               r.start_time
        FROM reservations r
        JOIN users u ON u.id = r.user_id
        JOIN services s ON s.id = r.service_id
        WHERE r.date = $1 AND r.status = $2
        ORDER BY r.start_time
        "#,
    )
    .bind(date)
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(targets)
}
