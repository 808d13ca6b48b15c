// handlers/purchases.rs
use axum::{body::Bytes, extract::State, response::Json};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::purchase::{PurchaseRequest, PurchaseResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub message: String,
    pub success: bool,
    pub azampay_transaction_id: Option<String>,
    pub purchase_record: PurchaseResponse,
}

/// POST /api/azampay/checkout
pub async fn pay_via_azampay(
    State(state): State<AppState>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<CheckoutResponse>> {
    info!(user_id = %user.user_id, "Checkout request from authenticated user");

    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, "Failed to parse JSON body");
        AppError::InvalidJson
    })?;

    let request: PurchaseRequest = serde_json::from_value(payload.clone()).map_err(|e| {
        error!(error = %e, body = %payload, "Missing or invalid parameters in request body");
        AppError::invalid_data(e.to_string())
    })?;

    request.validate().map_err(|e| {
        error!(error = %e, body = %payload, "Missing or invalid parameters in request body");
        AppError::invalid_data(e.to_string())
    })?;

    info!(
        phone = %request.phone,
        provider = %request.provider,
        betslip_id = %request.betslip_id,
        amount = ?request.amount,
        "Checkout request params"
    );

    let initiated = state
        .purchase_service
        .initiate(&user.user_id, &request)
        .await?;

    let acceptance = initiated.acceptance;
    Ok(Json(CheckoutResponse {
        message: acceptance
            .message
            .unwrap_or_else(|| "MNO Payment initiated successfully with AzamPay.".to_string()),
        success: acceptance.success.unwrap_or(true),
        azampay_transaction_id: acceptance.transaction_id,
        purchase_record: initiated.purchase.into(),
    }))
}
