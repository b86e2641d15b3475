use axum::{routing::get, Router};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/reservations",
            get(handlers::reservation::list_reservations)
                .post(handlers::reservation::create_reservation),
        )
        .route(
            "/api/reservations/:id",
            get(handlers::reservation::get_reservation)
                .put(handlers::reservation::update_reservation)
                .delete(handlers::reservation::delete_reservation),
        )
}
