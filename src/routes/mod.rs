pub mod azampay;

use axum::{middleware::map_response, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handlers::health::{health_check, root_handler};
use crate::middleware::cors::with_cors_headers;
use crate::state::AppState;

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .nest("/api/azampay", azampay::azampay_routes())
        .layer(map_response(with_cors_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
