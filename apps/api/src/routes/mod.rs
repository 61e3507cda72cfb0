pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::collage::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Form flow
        .route("/", get(handlers::handle_index))
        .route("/generate_pdf", post(handlers::handle_generate_pdf))
        // JSON API
        .route(
            "/api/v1/collage/preview",
            post(handlers::handle_preview),
        )
        .with_state(state)
}
