// src/errors.rs
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Which AzamPay endpoint a gateway failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEndpoint {
    Token,
    MnoCheckout,
}

impl GatewayEndpoint {
    fn rejection_message(&self) -> &'static str {
        match self {
            GatewayEndpoint::Token => "Failed to obtain AzamPay access token.",
            GatewayEndpoint::MnoCheckout => "MNO Payment initiation failed with AzamPay.",
        }
    }
}

impl fmt::Display for GatewayEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayEndpoint::Token => f.write_str("token"),
            GatewayEndpoint::MnoCheckout => f.write_str("MNO payment"),
        }
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Network error: Failed to reach AzamPay {endpoint} endpoint.")]
    Unreachable {
        endpoint: GatewayEndpoint,
        message: String,
    },

    #[error("AzamPay {endpoint} request timed out; the outcome is unknown.")]
    TimedOut { endpoint: GatewayEndpoint },

    #[error("{}", .endpoint.rejection_message())]
    Rejected {
        endpoint: GatewayEndpoint,
        status: u16,
        details: Value,
    },

    #[error("Invalid JSON response from AzamPay {endpoint} endpoint.")]
    InvalidJson {
        endpoint: GatewayEndpoint,
        body: String,
    },

    #[error("AzamPay access token not found in expected response structure.")]
    MissingAccessToken { details: Value },

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl GatewayError {
    pub fn from_send(endpoint: GatewayEndpoint, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::TimedOut { endpoint }
        } else {
            GatewayError::Unreachable {
                endpoint,
                message: err.to_string(),
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),

    #[error("BSON serialization error: {0}")]
    Bson(#[from] mongodb::bson::ser::Error),

    #[error("Duplicate purchase: {0}")]
    DuplicateKey(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid JSON in request body.")]
    InvalidJson,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("MNO Payment initiated with AzamPay, but failed to save purchase record locally.")]
    Persistence {
        source: StoreError,
        external_transaction_id: String,
        gateway_response: Value,
    },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::InvalidJson => (
                StatusCode::BAD_REQUEST,
                json!({ "error": self.to_string() }),
            ),
            AppError::ValidationError(details) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Missing or invalid fields: phone, provider, betslip_id, and a positive amount are required.",
                    "details": details,
                }),
            ),
            AppError::AuthError(details) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": details }),
            ),
            AppError::Gateway(err) => gateway_response(err),
            AppError::Persistence {
                source,
                external_transaction_id,
                gateway_response,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": self.to_string(),
                    "details": source.to_string(),
                    "external_transaction_id": external_transaction_id,
                    "azampay_response": gateway_response,
                }),
            ),
            AppError::ConfigurationError(_) | AppError::MongoDB(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "An unexpected server error occurred.",
                    "details": self.to_string(),
                }),
            ),
        };

        let mut body = body;
        if let Some(map) = body.as_object_mut() {
            map.insert("success".to_string(), json!(false));
            map.insert("timestamp".to_string(), json!(chrono::Utc::now().to_rfc3339()));
        }

        (status, Json(body)).into_response()
    }
}

fn gateway_response(err: &GatewayError) -> (StatusCode, Value) {
    match err {
        GatewayError::Unreachable { message, .. } => (
            StatusCode::BAD_GATEWAY,
            json!({ "error": err.to_string(), "details": message }),
        ),
        GatewayError::TimedOut { .. } => (
            StatusCode::BAD_GATEWAY,
            json!({
                "error": err.to_string(),
                "details": "The payment may or may not have been initiated; no purchase record was saved.",
            }),
        ),
        GatewayError::Rejected { status, details, .. } => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            json!({
                "error": err.to_string(),
                "details": details,
                "statusCode": status,
            }),
        ),
        GatewayError::InvalidJson { body, .. } => (
            StatusCode::BAD_GATEWAY,
            json!({ "error": err.to_string(), "details": body }),
        ),
        GatewayError::MissingAccessToken { details } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": err.to_string(), "details": details }),
        ),
        GatewayError::Client(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "An unexpected server error occurred.", "details": message }),
        ),
    }
}

// Helper conversion functions
impl AppError {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::AuthError(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::ConfigurationError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message_depends_on_endpoint() {
        let token = GatewayError::Rejected {
            endpoint: GatewayEndpoint::Token,
            status: 401,
            details: json!({}),
        };
        assert_eq!(token.to_string(), "Failed to obtain AzamPay access token.");

        let checkout = GatewayError::Rejected {
            endpoint: GatewayEndpoint::MnoCheckout,
            status: 400,
            details: json!({}),
        };
        assert_eq!(checkout.to_string(), "MNO Payment initiation failed with AzamPay.");
    }

    #[test]
    fn rejected_status_is_passed_through() {
        let response = AppError::from(GatewayError::Rejected {
            endpoint: GatewayEndpoint::MnoCheckout,
            status: 422,
            details: json!({ "message": "bad msisdn" }),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn status_codes_follow_error_taxonomy() {
        let cases = vec![
            (AppError::InvalidJson, StatusCode::BAD_REQUEST),
            (AppError::invalid_data("amount"), StatusCode::BAD_REQUEST),
            (AppError::unauthorized("no token"), StatusCode::UNAUTHORIZED),
            (
                AppError::from(GatewayError::TimedOut {
                    endpoint: GatewayEndpoint::MnoCheckout,
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::from(GatewayError::InvalidJson {
                    endpoint: GatewayEndpoint::Token,
                    body: "<html>".to_string(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::from(GatewayError::Unreachable {
                    endpoint: GatewayEndpoint::MnoCheckout,
                    message: "connection refused".to_string(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::from(GatewayError::MissingAccessToken { details: json!({}) }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Persistence {
                    source: StoreError::Unavailable("down".to_string()),
                    external_transaction_id: "BS1_abc".to_string(),
                    gateway_response: json!({ "transactionId": "AZ1" }),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
