use crate::models::DbNotification;
use chrono::{Duration, Utc};
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn create_notification(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    kind: &str,
    title: &str,
    message: &str,
    reservation_id: Option<Uuid>,
) -> Result<DbNotification> {
    let id = Uuid::new_v4();

    let notification = sqlx::query_as::<_, DbNotification>(
        r#"
        INSERT INTO notifications (id, user_id, kind, title, message, reservation_id, is_read, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)
        RETURNING id, user_id, kind, title, message, reservation_id, is_read, created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(kind)
    .bind(title)
    .bind(message)
    .bind(reservation_id)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    tracing::debug!("Notification created: id={}, user={}, kind={}", id, user_id, kind);
    Ok(notification)
}

pub async fn list_notifications_for_user(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    unread_only: bool,
) -> Result<Vec<DbNotification>> {
    let notifications = sqlx::query_as::<_, DbNotification>(
        r#"
        SELECT id, user_id, kind, title, message, reservation_id, is_read, created_at
        FROM notifications
        WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(unread_only)
    .fetch_all(pool)
    .await?;

    Ok(notifications)
}

/// Marks a notification read. Returns `None` when it doesn't exist or
/// belongs to another user.
pub async fn mark_notification_read(
    pool: &Pool<Postgres>,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<DbNotification>> {
    let notification = sqlx::query_as::<_, DbNotification>(
        r#"
        UPDATE notifications
        SET is_read = TRUE
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, kind, title, message, reservation_id, is_read, created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(notification)
}

pub async fn delete_read_older_than(pool: &Pool<Postgres>, days: i64) -> Result<u64> {
    let cutoff = Utc::now() - Duration::days(days);

    let result = sqlx::query("DELETE FROM notifications WHERE is_read = TRUE AND created_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Whether `user_id` already has a notification of `kind` for the reservation.
pub async fn reminder_exists(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    reservation_id: Uuid,
    kind: &str,
) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM notifications
            WHERE user_id = $1 AND reservation_id = $2 AND kind = $3
        )
        "#,
    )
    .bind(user_id)
    .bind(reservation_id)
    .bind(kind)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
