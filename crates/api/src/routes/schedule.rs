use axum::{routing::get, Router};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new().route(
        "/api/schedules",
        get(handlers::schedule::list_schedules).post(handlers::schedule::create_schedule),
    )
}
