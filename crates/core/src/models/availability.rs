use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::availability::Slot;

/// Query string of `GET /api/availability`. Both fields are required but
/// kept optional here so a missing one becomes a validation error in the
/// response envelope instead of an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub service_id: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
}
