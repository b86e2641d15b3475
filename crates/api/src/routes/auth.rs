use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

/// Login and registration, throttled with the strict auth tier.
pub fn credential_routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
}

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new().route("/api/auth/me", get(handlers::auth::me))
}
