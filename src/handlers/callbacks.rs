// handlers/callbacks.rs
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::services::reconciliation::ReconcileError;
use crate::state::AppState;

/// POST /api/azampay/callback
///
/// AzamPay retries anything that is not a 200, so once a callback carries a
/// usable identifier every outcome is acknowledged with 200. Only malformed
/// JSON and callbacks without identifiers get a 400.
pub async fn azampay_payment_callback(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            let raw = String::from_utf8_lossy(&body);
            let preview: String = raw.chars().take(500).collect();
            error!(error = %e, raw_body = %preview, "Invalid JSON in callback body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid JSON request body in callback." })),
            )
                .into_response();
        }
    };

    info!(payload = %payload, "AzamPay callback received");

    match state.reconciler.reconcile(&payload).await {
        Ok(outcome) => {
            info!(outcome = ?outcome, "Callback acknowledged");
            (StatusCode::OK, Json(json!({ "message": outcome.message() }))).into_response()
        }
        Err(ReconcileError::CorrelationMissing) => {
            error!(payload = %payload, "Missing usable transaction identifier (utilityref or reference)");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": ReconcileError::CorrelationMissing.to_string() })),
            )
                .into_response()
        }
        Err(e) => {
            // Acknowledge anyway; retries would hit the same storage problem
            error!(error = ?e, "Callback acknowledged with internal error");
            (StatusCode::OK, Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}

pub async fn method_not_allowed() -> Response {
    warn!("Received non-POST method on callback endpoint");
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        Json(json!({ "error": "Method Not Allowed. Only POST is accepted." })),
    )
        .into_response()
}
