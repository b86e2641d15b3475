//! # Bookit Core
//!
//! Domain types for the bookit reservation service, plus the availability
//! and conflict engine that every booking path goes through.

/// Slot generation and reservation admission
pub mod availability;
/// Error type shared by all crates
pub mod errors;
/// Domain entities and request/response types
pub mod models;
/// Time-of-day, weekday and duration value types
pub mod time;
/// Request validation helpers
pub mod validation;
