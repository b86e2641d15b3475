//! Row types as stored in PostgreSQL, and their conversions into the domain
//! models of `bookit-core`.

use bookit_core::models::{
    notification::Notification, reservation::Reservation, schedule::Schedule, service::Service,
    user::User,
};
use bookit_core::time::{DayOfWeek, TimeOfDay};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use eyre::{eyre, Report};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbService {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub duration: i32,
    pub price: f64,
    pub is_active: bool,
    pub provider_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSchedule {
    pub id: Uuid,
    pub service_id: Uuid,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbReservation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: String,
    pub notes: Option<String>,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbNotification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub reservation_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A reservation joined with the names the reminder jobs put in their text.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbReminderTarget {
    pub reservation_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub service_name: String,
    pub provider_id: Uuid,
    pub start_time: NaiveTime,
}

impl TryFrom<DbUser> for User {
    type Error = Report;

    fn try_from(row: DbUser) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            role: row.role.parse().map_err(|e: String| eyre!(e))?,
            email: row.email,
            name: row.name,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<DbService> for Service {
    fn from(row: DbService) -> Self {
        Service {
            id: row.id,
            name: row.name,
            description: row.description,
            duration: row.duration,
            price: row.price,
            is_active: row.is_active,
            provider_id: row.provider_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl TryFrom<DbSchedule> for Schedule {
    type Error = Report;

    fn try_from(row: DbSchedule) -> Result<Self, Self::Error> {
        Ok(Schedule {
            id: row.id,
            service_id: row.service_id,
            day_of_week: DayOfWeek::new(row.day_of_week.into())?,
            start_time: TimeOfDay::from(row.start_time),
            end_time: TimeOfDay::from(row.end_time),
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<DbReservation> for Reservation {
    type Error = Report;

    fn try_from(row: DbReservation) -> Result<Self, Self::Error> {
        Ok(Reservation {
            id: row.id,
            user_id: row.user_id,
            service_id: row.service_id,
            date: row.date,
            start_time: TimeOfDay::from(row.start_time),
            end_time: TimeOfDay::from(row.end_time),
            status: row.status.parse().map_err(|e: String| eyre!(e))?,
            notes: row.notes,
            total_price: row.total_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<DbNotification> for Notification {
    type Error = Report;

    fn try_from(row: DbNotification) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind.parse().map_err(|e: String| eyre!(e))?,
            title: row.title,
            message: row.message,
            reservation_id: row.reservation_id,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

/// Converts a batch of rows, failing on the first malformed one.
pub fn convert_all<R, T>(rows: Vec<R>) -> eyre::Result<Vec<T>>
where
    T: TryFrom<R, Error = Report>,
{
    rows.into_iter().map(T::try_from).collect()
}
