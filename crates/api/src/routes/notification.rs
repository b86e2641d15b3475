use axum::{
    routing::{get, put},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/notifications",
            get(handlers::notification::list_notifications),
        )
        .route(
            "/api/notifications/:id/read",
            put(handlers::notification::mark_read),
        )
}
