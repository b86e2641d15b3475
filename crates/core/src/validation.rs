//! Glue between `validator` derives and [`BookError`].

use validator::{Validate, ValidationError, ValidationErrors};

use crate::errors::{BookError, BookResult};
use crate::time::TimeOfDay;

/// Custom validator for `HH:MM` fields.
pub fn validate_time_of_day(value: &str) -> Result<(), ValidationError> {
    TimeOfDay::parse(value).map(|_| ()).map_err(|_| {
        let mut error = ValidationError::new("time_of_day");
        error.message = Some("Invalid time format (HH:MM)".into());
        error
    })
}

/// Runs the derived validation and folds all failures into one
/// `BookError::Validation`, formatted as `field: message` pairs.
pub fn validate_request<T: Validate>(request: &T) -> BookResult<()> {
    request
        .validate()
        .map_err(|errors| BookError::Validation(describe(&errors)))
}

pub fn describe(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, field_errors)| {
            let field = field.to_string();
            field_errors.iter().map(move |error| {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                format!("{field}: {message}")
            })
        })
        .collect();
    messages.sort();
    messages.join(", ")
}
