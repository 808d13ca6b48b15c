use axum::{routing::post, Router};

use crate::handlers::{callbacks, purchases};
use crate::middleware::cors::preflight;
use crate::state::AppState;

pub fn azampay_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(purchases::pay_via_azampay).options(preflight))
        .route(
            "/callback",
            post(callbacks::azampay_payment_callback)
                .options(preflight)
                .fallback(callbacks::method_not_allowed),
        )
}
