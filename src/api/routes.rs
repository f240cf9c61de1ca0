//! API Routes
//!
//! Configures the Axum router. The file endpoints sit behind the rate
//! limiter; health and stats do not, so monitoring never eats a client's quota.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    get_file_handler, health_handler, list_handler, rename_handler, stats_handler, upload_handler,
    AppState,
};
use super::middleware::rate_limit;

/// Creates the main router with all endpoints configured.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let files = Router::new()
        .route("/files", get(list_handler).post(upload_handler))
        .route("/files/:id", get(get_file_handler))
        .route("/files/:id/rename", post(rename_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .merge(files)
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
