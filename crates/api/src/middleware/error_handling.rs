//! # Error Handling Middleware
//!
//! Maps domain errors to HTTP status codes and the `{ success: false, error }`
//! envelope so every failure leaves the API in the same shape.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bookit_core::{
    availability::Rejection, errors::BookError, models::response::ApiResponse, time::InputError,
};

/// Application error wrapper that provides HTTP status code mapping
///
/// `AppError` wraps `BookError` and implements `IntoResponse`, so handlers can
/// return `Result<_, AppError>` and use `?` on anything convertible into a
/// `BookError`.
///
/// # Example
///
/// ```
/// use axum::Json;
/// use bookit_api::middleware::error_handling::AppError;
/// use bookit_core::errors::BookError;
///
/// async fn handler(found: bool) -> Result<Json<u32>, AppError> {
///     if !found {
///         return Err(BookError::NotFound("Service not found".into()).into());
///     }
///     Ok(Json(1))
/// }
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct AppError(pub BookError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BookError::NotFound(_) => StatusCode::NOT_FOUND,
            BookError::Validation(_) | BookError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            BookError::Conflict(_) => StatusCode::CONFLICT,
            BookError::Authentication(_) => StatusCode::UNAUTHORIZED,
            BookError::Authorization(_) => StatusCode::FORBIDDEN,
            BookError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            BookError::Database(_) | BookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text sent to the client. Server-side failures are logged in full and
    /// reported with a generic message.
    fn public_message(&self) -> String {
        match &self.0 {
            BookError::NotFound(msg)
            | BookError::Validation(msg)
            | BookError::Conflict(msg)
            | BookError::Authentication(msg)
            | BookError::Authorization(msg) => msg.clone(),
            BookError::Database(_) | BookError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {:?}", self.0);
        }

        let body = Json(ApiResponse::error(self.public_message()));
        let mut response = (status, body).into_response();

        if let BookError::RateLimited { retry_after_secs } = &self.0 {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Automatic conversion from BookError to AppError
impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        AppError(err)
    }
}

/// Automatic conversion from eyre::Report to AppError
///
/// Repository functions return `eyre::Result`; their failures surface as
/// `BookError::Database`.
impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(BookError::Database(err))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError(BookError::Database(err.into()))
    }
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        AppError(BookError::InvalidInput(err))
    }
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> Self {
        AppError(rejection.into())
    }
}

/// Maps a BookError to an HTTP response
pub fn map_error(err: BookError) -> Response {
    AppError(err).into_response()
}
