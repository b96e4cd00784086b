use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all store endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handler::health_handler))
        .route("/api/store/getLogs", get(handler::get_logs_handler))
        .route("/api/store/appendLog", post(handler::append_log_handler))
        .route("/api/store/getContent", get(handler::get_content_handler))
        .route("/api/store/setContent", post(handler::set_content_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
