pub mod routes;
pub mod ws;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// HTTP + WS surface. Anything unmatched falls through to the built front-end.
pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let index = static_dir.join("index.html");

    Router::new()
        .route("/api/analyze", post(routes::analyze))
        .route("/api/health", get(routes::health))
        .route("/api/analyses", get(routes::get_analyses))
        .route("/api/analyses/{cache_key}", get(routes::get_analysis))
        .route("/api/counters", get(routes::get_counters))
        .route("/ws", get(ws::ws_handler))
        .fallback_service(
            tower_http::services::ServeDir::new(static_dir)
                .fallback(tower_http::services::ServeFile::new(index)),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}
