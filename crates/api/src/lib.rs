//! # Bookit API
//!
//! The API crate provides the web server for the booking service: accounts,
//! services and their weekly schedules, availability lookups, reservations,
//! and in-app notifications.
//!
//! ## Architecture
//!
//! This crate follows a layered architecture:
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Implement request processing logic
//! - **Middleware**: Authentication, rate limiting and error mapping
//! - **Jobs**: Recurring reminders and housekeeping
//! - **Config**: Handle environment and application configuration
//!
//! Availability and conflict decisions live in `bookit_core::availability`;
//! handlers only load the data the engine needs and persist its verdicts.

/// Configuration module for API settings
pub mod config;
/// Validating request extractors
pub mod extract;
/// Request handlers that implement business logic
pub mod handlers;
/// Scheduled background jobs
pub mod jobs;
/// Middleware for authentication, rate limiting, and error handling
pub mod middleware;
/// Per-user event fan-out
pub mod notify;
/// Route definitions and API endpoint structure
pub mod routes;

use std::{sync::Arc, time::Duration};

use axum::{
    error_handling::HandleErrorLayer,
    http::{HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    BoxError, Json, Router,
};
use bookit_core::models::response::ApiResponse;
use eyre::Result;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::{
    jobs::JobScheduler,
    middleware::{
        auth::TokenKeys,
        rate_limit::{self, RateLimitRule, RateLimiter},
    },
    notify::NotificationHub,
};

/// Shared application state that is accessible to all request handlers
///
/// # Example
///
/// ```rust,ignore
/// let state = Arc::new(ApiState::new(db_pool, TokenKeys::new(&secret, 168)));
/// let app = build_router(state);
/// ```
pub struct ApiState {
    /// PostgreSQL connection pool for database operations
    pub db_pool: PgPool,
    /// Token signing and verification keys
    pub tokens: TokenKeys,
    /// Strict tier applied to login and registration
    pub auth_limiter: Arc<RateLimiter>,
    /// Tier applied to every other route
    pub general_limiter: Arc<RateLimiter>,
    pub hub: Arc<NotificationHub>,
}

impl ApiState {
    pub fn new(db_pool: PgPool, tokens: TokenKeys) -> Self {
        Self {
            db_pool,
            tokens,
            auth_limiter: Arc::new(RateLimiter::new(RateLimitRule::AUTH)),
            general_limiter: Arc::new(RateLimiter::new(RateLimitRule::GENERAL)),
            hub: Arc::new(NotificationHub::new()),
        }
    }
}

/// Builds the application router with every route and the rate limit tiers.
pub fn build_router(state: Arc<ApiState>) -> Router {
    let credentials = routes::auth::credential_routes().layer(from_fn_with_state(
        Arc::clone(&state.auth_limiter),
        rate_limit::enforce,
    ));

    let api = Router::new()
        .merge(routes::health::routes())
        .merge(routes::auth::routes())
        .merge(routes::service::routes())
        .merge(routes::schedule::routes())
        .merge(routes::availability::routes())
        .merge(routes::reservation::routes())
        .merge(routes::notification::routes())
        .layer(from_fn_with_state(
            Arc::clone(&state.general_limiter),
            rate_limit::enforce,
        ));

    Router::new()
        .merge(credentials)
        .merge(api)
        .fallback(route_not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn route_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::error("Route not found")),
    )
        .into_response()
}

async fn handle_timeout(err: BoxError) -> Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(ApiResponse::error("Request timed out")),
        )
            .into_response()
    } else {
        tracing::error!("Unhandled middleware error: {}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("Internal server error")),
        )
            .into_response()
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
        .allow_origin(allowed)
        .allow_credentials(true)
}

/// Starts the API server with the provided configuration and database connection
///
/// Initializes logging, builds the router, launches the background jobs when
/// enabled, and serves until Ctrl-C.
///
/// # Example
///
/// ```rust,ignore
/// let config = ApiConfig::from_env()?;
/// let db_pool = bookit_db::create_pool(&config.database_url).await?;
/// start_server(config, db_pool).await?;
/// ```
pub async fn start_server(config: config::ApiConfig, db_pool: PgPool) -> Result<()> {
    // Initialize tracing for logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let tokens = TokenKeys::new(&config.jwt_secret, config.jwt_expiry_hours);
    let state = Arc::new(ApiState::new(db_pool, tokens));

    let app = build_router(Arc::clone(&state));

    // Apply CORS configuration if origins are specified
    let app = match &config.cors_origins {
        Some(origins) => app.layer(cors_layer(origins)),
        None => app,
    };

    // Add request timeout middleware
    let app = app.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout))
            .timeout(Duration::from_secs(config.request_timeout)),
    );

    let mut scheduler = JobScheduler::new(Arc::clone(&state), config.scheduler_timezone);
    if config.jobs_enabled {
        scheduler.start();
    } else {
        info!("Background jobs disabled");
    }

    // Start the HTTP server
    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
