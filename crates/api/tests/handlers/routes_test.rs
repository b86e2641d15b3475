use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::TestServer;
use bookit_api::{build_router, middleware::rate_limit::{LIMIT_HEADER, REMAINING_HEADER}};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::test_utils::TestContext;

fn server() -> TestServer {
    let ctx = TestContext::new();
    TestServer::new(build_router(ctx.build_state())).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = server();

    let response = server.get("/api/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["message"], "Booking API is running");
}

#[tokio::test]
async fn test_general_tier_headers() {
    let server = server();

    let first = server.get("/api/health").await;
    let second = server.get("/api/health").await;

    assert_eq!(first.header(LIMIT_HEADER), "60");
    assert_eq!(first.header(REMAINING_HEADER), "59");
    assert_eq!(second.header(REMAINING_HEADER), "58");
}

#[tokio::test]
async fn test_me_requires_token() {
    let server = server();

    let response = server.get("/api/auth/me").await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.json::<Value>(),
        json!({ "success": false, "error": "Access token required" })
    );
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let server = server();

    let response = server
        .post("/api/reservations")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer not-a-jwt"))
        .json(&json!({ "serviceId": uuid::Uuid::new_v4(), "date": "2024-03-18", "startTime": "09:00" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "Invalid or expired token");
}

#[tokio::test]
async fn test_availability_requires_parameters() {
    let server = server();

    let response = server.get("/api/availability").await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        "serviceId and date are required"
    );
}

#[tokio::test]
async fn test_malformed_login_body_is_enveloped() {
    let server = server();

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": "not-an-email", "password": "secret123" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["success"], false);
}

#[test_log::test(tokio::test)]
async fn test_auth_tier_blocks_after_five_attempts() {
    let server = server();

    for _ in 0..5 {
        let response = server.post("/api/auth/login").json(&json!({})).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    let blocked = server.post("/api/auth/login").json(&json!({})).await;
    assert_eq!(blocked.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(blocked.header(REMAINING_HEADER), "0");
    assert!(blocked.headers().contains_key("retry-after"));
}

#[tokio::test]
async fn test_unknown_route() {
    let server = server();

    let response = server.get("/api/does-not-exist").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "Route not found");
}
