use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    ReservationConfirmed,
    ReservationCancelled,
    ReservationReminder,
    ScheduleChange,
    SystemNotification,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::ReservationConfirmed => "RESERVATION_CONFIRMED",
            NotificationKind::ReservationCancelled => "RESERVATION_CANCELLED",
            NotificationKind::ReservationReminder => "RESERVATION_REMINDER",
            NotificationKind::ScheduleChange => "SCHEDULE_CHANGE",
            NotificationKind::SystemNotification => "SYSTEM_NOTIFICATION",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RESERVATION_CONFIRMED" => Ok(NotificationKind::ReservationConfirmed),
            "RESERVATION_CANCELLED" => Ok(NotificationKind::ReservationCancelled),
            "RESERVATION_REMINDER" => Ok(NotificationKind::ReservationReminder),
            "SCHEDULE_CHANGE" => Ok(NotificationKind::ScheduleChange),
            "SYSTEM_NOTIFICATION" => Ok(NotificationKind::SystemNotification),
            other => Err(format!("unknown notification type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub reservation_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
