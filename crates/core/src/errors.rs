use thiserror::Error;

use crate::availability::Rejection;
use crate::time::InputError;

#[derive(Error, Debug)]
pub enum BookError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Too many requests, retry in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Database error: {0}")]
    Database(#[from] eyre::Report),

    #[error("Internal server error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub type BookResult<T> = Result<T, BookError>;

impl From<Rejection> for BookError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::OutsideSchedule => {
                BookError::Validation("Requested time is outside the service schedule".to_string())
            }
            Rejection::Conflict(existing) => BookError::Conflict(format!(
                "A reservation already exists from {} to {}",
                existing.start, existing.end
            )),
        }
    }
}
