use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::availability::ScheduleWindow;
use crate::time::{DayOfWeek, InputError, TimeOfDay};

/// A recurring weekly opening window of a service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: Uuid,
    pub service_id: Uuid,
    pub day_of_week: DayOfWeek,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Schedule {
    pub fn window(&self) -> Result<ScheduleWindow, InputError> {
        ScheduleWindow::new(self.day_of_week, self.start_time, self.end_time)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    pub service_id: Uuid,
    #[validate(range(min = 0, max = 6, message = "Invalid day of week"))]
    pub day_of_week: i16,
    #[validate(custom(function = "crate::validation::validate_time_of_day"))]
    pub start_time: String,
    #[validate(custom(function = "crate::validation::validate_time_of_day"))]
    pub end_time: String,
}

impl CreateScheduleRequest {
    /// The requested window, failing when the end is not after the start.
    pub fn window(&self) -> Result<ScheduleWindow, InputError> {
        ScheduleWindow::new(
            DayOfWeek::new(self.day_of_week.into())?,
            TimeOfDay::parse(&self.start_time)?,
            TimeOfDay::parse(&self.end_time)?,
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleQuery {
    pub service_id: Option<Uuid>,
}
