use serde::Serialize;
use serde_json::Value;

// Token request body
#[derive(Debug, Serialize)]
pub struct TokenRequest {
    #[serde(rename = "appName")]
    pub app_name: String,
    #[serde(rename = "clientId")]
    pub client_id: String,
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

// MNO checkout request body
#[derive(Debug, Clone, Serialize)]
pub struct MnoCheckoutRequest {
    #[serde(rename = "accountNumber")]
    pub account_number: String,
    pub amount: f64,
    pub currency: String,
    #[serde(rename = "externalId")]
    pub external_id: String,
    pub provider: String,
}

/// Accepted checkout. `raw` is kept verbatim on the purchase record.
#[derive(Debug, Clone)]
pub struct CheckoutAcceptance {
    pub raw: Value,
    pub transaction_id: Option<String>,
    pub message: Option<String>,
    pub success: Option<bool>,
}

impl CheckoutAcceptance {
    pub fn from_value(raw: Value) -> Self {
        let transaction_id = raw
            .get("transactionId")
            .and_then(non_empty_str)
            .map(str::to_string);
        let message = raw
            .get("message")
            .and_then(non_empty_str)
            .map(str::to_string);
        let success = raw.get("success").and_then(Value::as_bool);

        CheckoutAcceptance {
            raw,
            transaction_id,
            message,
            success,
        }
    }
}

/// `data.accessToken` from the token endpoint response.
pub fn access_token_from(token_response: &Value) -> Option<String> {
    token_response
        .get("data")
        .and_then(|data| data.get("accessToken"))
        .and_then(non_empty_str)
        .map(str::to_string)
}

/// Fields read from an AzamPay callback body.
///
/// The callback is untrusted, so identifiers only count when they are
/// non-empty strings.
#[derive(Debug, Clone, Default)]
pub struct CallbackFields {
    pub utility_ref: Option<String>,
    pub reference: Option<String>,
    pub transaction_status: String,
    pub message: Option<String>,
    pub msisdn: Option<String>,
    pub amount: Option<f64>,
}

impl CallbackFields {
    pub fn from_payload(payload: &Value) -> Self {
        let text = |key: &str| payload.get(key).and_then(non_empty_str).map(str::to_string);

        let transaction_status = match payload.get("transactionstatus") {
            None | Some(Value::Null) => "unknown".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };

        let amount = match payload.get("amount") {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };

        CallbackFields {
            utility_ref: text("utilityref"),
            reference: text("reference"),
            transaction_status,
            message: text("message"),
            msisdn: text("msisdn"),
            amount,
        }
    }
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.trim().is_empty())
}
