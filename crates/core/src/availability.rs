//! # Availability & Conflict Engine
//!
//! Pure functions over a service's weekly schedule windows and the intervals
//! already booked on one calendar date. Nothing here touches storage; callers
//! load the inputs and are responsible for re-checking under a transaction
//! before persisting a reservation.
//!
//! All intervals are half-open `[start, end)`: two bookings that merely touch
//! (`a.end == b.start`) do not conflict.

use serde::Serialize;

use crate::time::{DayOfWeek, InputError, SlotDuration, TimeOfDay};

/// Candidate start times are offered at this cadence, or at the service
/// duration when that is shorter.
pub const SLOT_STRIDE_MINUTES: u16 = 30;

/// An occupied (or proposed) span on the target date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedInterval {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl BookedInterval {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// The interval a booking of `duration` starting at `start` would occupy.
    pub fn starting_at(start: TimeOfDay, duration: SlotDuration) -> Result<Self, InputError> {
        let end = start
            .checked_add(duration.minutes())
            .ok_or(InputError::PastMidnight {
                start,
                minutes: duration.minutes(),
            })?;
        Ok(Self { start, end })
    }
}

/// One recurring open interval for a service on a given weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    day: DayOfWeek,
    start: TimeOfDay,
    end: TimeOfDay,
}

impl ScheduleWindow {
    pub fn new(day: DayOfWeek, start: TimeOfDay, end: TimeOfDay) -> Result<Self, InputError> {
        if end <= start {
            return Err(InputError::EmptyWindow { start, end });
        }
        Ok(Self { day, start, end })
    }

    pub fn day(&self) -> DayOfWeek {
        self.day
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.end
    }

    fn as_interval(&self) -> BookedInterval {
        BookedInterval::new(self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub is_available: bool,
}

/// Why a proposed reservation was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The start time is not inside any open window for that weekday.
    OutsideSchedule,
    /// The interval intersects an existing active reservation.
    Conflict(BookedInterval),
}

/// Half-open interval intersection.
pub fn overlaps(a: &BookedInterval, b: &BookedInterval) -> bool {
    a.start < b.end && b.start < a.end
}

/// Candidate slots of `duration` inside one window, in ascending start order.
///
/// The cursor advances by `min(30, duration)`, so long services get
/// staggered, overlapping candidates rather than only back-to-back ones.
pub fn generate_slots(
    window: &ScheduleWindow,
    duration: SlotDuration,
    booked: &[BookedInterval],
) -> Vec<Slot> {
    let length = duration.minutes();
    let stride = length.min(SLOT_STRIDE_MINUTES);
    let window_end = window.end.minutes();

    let mut slots = Vec::new();
    let mut cursor = window.start.minutes();
    while cursor + length <= window_end {
        // Both bounds are <= window_end <= 23:59, so construction cannot fail.
        let (Some(start), Some(end)) = (
            TimeOfDay::from_minutes(cursor),
            TimeOfDay::from_minutes(cursor + length),
        ) else {
            break;
        };
        let candidate = BookedInterval::new(start, end);
        slots.push(Slot {
            start_time: start,
            end_time: end,
            is_available: !booked.iter().any(|b| overlaps(&candidate, b)),
        });
        cursor += stride;
    }
    slots
}

/// All slots for `day` across every matching window, merged and sorted by
/// start time. Slots from different windows that share a start keep window
/// order.
pub fn day_slots(
    windows: &[ScheduleWindow],
    day: DayOfWeek,
    duration: SlotDuration,
    booked: &[BookedInterval],
) -> Vec<Slot> {
    let mut slots: Vec<Slot> = windows
        .iter()
        .filter(|w| w.day == day)
        .flat_map(|w| generate_slots(w, duration, booked))
        .collect();
    slots.sort_by_key(|slot| slot.start_time);
    slots
}

/// Admission check for a proposed reservation.
///
/// Only the start time has to fall inside a window; a booking may run past
/// the window's closing time.
pub fn can_book(
    proposed: &BookedInterval,
    windows: &[ScheduleWindow],
    day: DayOfWeek,
    existing: &[BookedInterval],
) -> Result<(), Rejection> {
    let in_schedule = windows
        .iter()
        .any(|w| w.day == day && w.start <= proposed.start && proposed.start < w.end);
    if !in_schedule {
        return Err(Rejection::OutsideSchedule);
    }

    match existing.iter().find(|e| overlaps(proposed, e)) {
        Some(conflict) => Err(Rejection::Conflict(*conflict)),
        None => Ok(()),
    }
}

/// Two windows of one service clash when they share a weekday and overlap.
pub fn windows_conflict(a: &ScheduleWindow, b: &ScheduleWindow) -> bool {
    a.day == b.day && overlaps(&a.as_interval(), &b.as_interval())
}
