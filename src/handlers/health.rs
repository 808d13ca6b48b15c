use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn root_handler() -> &'static str {
    "Betslip payments API"
}

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db_status = match state.store.ping().await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    Json(json!({
        "status": "healthy",
        "database": db_status,
        "environment": state.config.azampay_environment,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
