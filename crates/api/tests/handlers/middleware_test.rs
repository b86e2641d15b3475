use axum::http::{header, StatusCode};
use bookit_api::middleware::{
    auth,
    error_handling::map_error,
    rate_limit::{RateLimitRule, RateLimiter},
};
use bookit_core::{availability::Rejection, errors::BookError, time::InputError};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_error_handling_not_found() {
    let response = map_error(BookError::NotFound("Service not found".to_string()));

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "error": "Service not found" })
    );
}

#[tokio::test]
async fn test_error_handling_validation() {
    let response = map_error(BookError::Validation("Invalid input".to_string()));
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = map_error(BookError::InvalidInput(InputError::Time("25:00".to_string())));
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_error_handling_rejections() {
    let response = map_error(Rejection::OutsideSchedule.into());
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let taken = bookit_core::availability::BookedInterval::new(
        bookit_core::time::TimeOfDay::parse("09:00").unwrap(),
        bookit_core::time::TimeOfDay::parse("10:00").unwrap(),
    );
    let response = map_error(Rejection::Conflict(taken).into());
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(response).await["error"],
        "A reservation already exists from 09:00 to 10:00"
    );
}

#[tokio::test]
async fn test_error_handling_authentication() {
    let response = map_error(BookError::Authentication("Invalid credentials".to_string()));
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_error_handling_authorization() {
    let response = map_error(BookError::Authorization("Not authorized".to_string()));
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_error_handling_database_hides_details() {
    let response = map_error(BookError::Database(eyre::eyre!("relation \"users\" does not exist")));

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Internal server error");
}

#[tokio::test]
async fn test_error_handling_rate_limited() {
    let response = map_error(BookError::RateLimited { retry_after_secs: 42 });

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "42");
}

#[test]
fn test_rate_limit_window_resets() {
    let limiter = RateLimiter::new(RateLimitRule {
        max_requests: 1,
        window_ms: 60_000,
    });

    assert!(limiter.check_at("10.0.0.1:/api/auth/login", 0).allowed);
    let blocked = limiter.check_at("10.0.0.1:/api/auth/login", 1_000);
    assert!(!blocked.allowed);
    assert_eq!(blocked.retry_after_secs, 59);

    // Other keys are counted separately
    assert!(limiter.check_at("10.0.0.2:/api/auth/login", 1_000).allowed);
    // A new window starts after the reset
    assert!(limiter.check_at("10.0.0.1:/api/auth/login", 60_001).allowed);
}

#[test]
fn test_password_hashing() {
    let password = "test_password";
    let hash = auth::hash_password(password).unwrap();

    assert_ne!(hash, password);
    assert!(hash.starts_with("$argon2"));
    assert!(auth::verify_password(password, &hash).unwrap());
    assert!(!auth::verify_password("wrong_password", &hash).unwrap());
}

#[test]
fn test_token_from_other_secret_is_rejected() {
    let issuer = auth::TokenKeys::new("one-secret", 1);
    let verifier = auth::TokenKeys::new("another-secret", 1);
    let user = crate::test_utils::caller(bookit_core::models::user::UserRole::Client).0;

    let token = issuer.issue(&user).unwrap();
    assert!(matches!(
        verifier.verify(&token),
        Err(BookError::Authentication(_))
    ));
}
