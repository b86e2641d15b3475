use crate::models::DbService;
use chrono::Utc;
use eyre::{eyre, Result};
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

const SERVICE_COLUMNS: &str =
    "id, name, description, duration, price, is_active, provider_id, created_at, updated_at";

/// Filters for listing services. `None` means "don't filter".
#[derive(Debug, Clone, Default)]
pub struct ServiceListQuery {
    pub is_active: Option<bool>,
    pub provider_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

/// Partial update; `None` fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct ServiceChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub duration: Option<i32>,
    pub price: Option<f64>,
    pub is_active: Option<bool>,
}

pub async fn create_service(
    pool: &Pool<Postgres>,
    provider_id: Uuid,
    name: &str,
    description: Option<&str>,
    duration: i32,
    price: f64,
) -> Result<DbService> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let service = sqlx::query_as::<_, DbService>(&format!(
        r#"
        INSERT INTO services (id, name, description, duration, price, is_active, provider_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7, $7)
        RETURNING {SERVICE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(duration)
    .bind(price)
    .bind(provider_id)
    .bind(now)
    .fetch_one(pool)
    .await?;

    tracing::debug!("Service created: id={}, provider={}", id, provider_id);
    Ok(service)
}

pub async fn get_service_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbService>> {
    let service = sqlx::query_as::<_, DbService>(&format!(
        "SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(service)
}

fn push_service_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ServiceListQuery) {
    builder.push(" WHERE TRUE");
    if let Some(is_active) = query.is_active {
        builder.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(provider_id) = query.provider_id {
        builder.push(" AND provider_id = ").push_bind(provider_id);
    }
}

/// One page of services, newest first, plus the total matching count.
pub async fn list_services(
    pool: &Pool<Postgres>,
    query: &ServiceListQuery,
) -> Result<(Vec<DbService>, i64)> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {SERVICE_COLUMNS} FROM services"));
    push_service_filters(&mut builder, query);
    builder
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(query.limit)
        .push(" OFFSET ")
        .push_bind(query.offset);
    let services = builder.build_query_as::<DbService>().fetch_all(pool).await?;

    let mut counter = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM services");
    push_service_filters(&mut counter, query);
    let total: i64 = counter.build_query_scalar().fetch_one(pool).await?;

    Ok((services, total))
}

pub async fn update_service(
    pool: &Pool<Postgres>,
    id: Uuid,
    changes: &ServiceChanges<'_>,
) -> Result<DbService> {
    let service = sqlx::query_as::<_, DbService>(&format!(
        r#"
        UPDATE services
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            duration = COALESCE($4, duration),
            price = COALESCE($5, price),
            is_active = COALESCE($6, is_active),
            updated_at = $7
        WHERE id = $1
        RETURNING {SERVICE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(changes.name)
    .bind(changes.description)
    .bind(changes.duration)
    .bind(changes.price)
    .bind(changes.is_active)
    .bind(Utc::now())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| eyre!("Service not found"))?;

    Ok(service)
}

pub async fn delete_service(pool: &Pool<Postgres>, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM services WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Number of PENDING or CONFIRMED reservations that still reference the service.
pub async fn count_active_reservations(pool: &Pool<Postgres>, service_id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM reservations
        WHERE service_id = $1 AND status IN ('PENDING', 'CONFIRMED')
        "#,
    )
    .bind(service_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
