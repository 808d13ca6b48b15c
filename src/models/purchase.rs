use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

/// Payment state of a purchase. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Failed,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Completed => "completed",
            PurchaseStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PurchaseStatus::Completed | PurchaseStatus::Failed)
    }
}

// Database model for the purchases collection (MongoDB)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub betslip_id: String,
    pub phone: String,
    pub payment_method: String,
    pub amount_paid: f64,
    pub status: PurchaseStatus,

    // Correlation surface: gateway id and our own externalId
    pub transaction_reference: String,
    pub external_transaction_id: String,

    pub gateway_response: Value,
    #[serde(default)]
    pub gateway_callback_response: Option<Value>,
    #[serde(default)]
    pub gateway_message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    /// A freshly initiated purchase, waiting for the gateway callback.
    pub fn pending(
        user_id: &str,
        request: &PurchaseRequest,
        external_transaction_id: String,
        transaction_reference: String,
        gateway_response: Value,
    ) -> Self {
        let now = Utc::now();
        Purchase {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            betslip_id: request.betslip_id.trim().to_string(),
            phone: request.phone.trim().to_string(),
            payment_method: request.provider.trim().to_string(),
            amount_paid: request.amount.unwrap_or_default(),
            status: PurchaseStatus::Pending,
            transaction_reference,
            external_transaction_id,
            gateway_response,
            gateway_callback_response: None,
            gateway_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields written when a callback moves a purchase out of `pending`.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub status: PurchaseStatus,
    pub gateway_callback_response: Value,
    pub gateway_message: String,
    pub settled_at: DateTime<Utc>,
}

/// Stored field a callback identifier is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupField {
    ExternalTransactionId,
    TransactionReference,
}

impl LookupField {
    pub fn column(&self) -> &'static str {
        match self {
            LookupField::ExternalTransactionId => "external_transaction_id",
            LookupField::TransactionReference => "transaction_reference",
        }
    }

    pub fn key(self, value: impl Into<String>) -> CorrelationKey {
        CorrelationKey {
            field: self,
            value: value.into(),
        }
    }

    pub fn value_of<'a>(&self, purchase: &'a Purchase) -> &'a str {
        match self {
            LookupField::ExternalTransactionId => &purchase.external_transaction_id,
            LookupField::TransactionReference => &purchase.transaction_reference,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationKey {
    pub field: LookupField,
    pub value: String,
}

// Body of the checkout request sent by the betting app
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PurchaseRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub phone: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub provider: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub betslip_id: String,
    #[serde(default)]
    #[validate(required, range(exclusive_min = 0.0))]
    pub amount: Option<f64>,
}

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

/// Correlation id sent to AzamPay as `externalId`: the betslip id plus a
/// random suffix, so it stays traceable while being unique per attempt.
pub fn new_external_id(betslip_id: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", betslip_id.trim(), &suffix[..12])
}

// Model for purchase response
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub id: String,
    pub user_id: String,
    pub betslip_id: String,
    pub phone: String,
    pub payment_method: String,
    pub amount_paid: f64,
    pub status: PurchaseStatus,
    pub transaction_reference: String,
    pub external_transaction_id: String,
    pub gateway_response: Value,
    pub gateway_callback_response: Option<Value>,
    pub gateway_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Purchase> for PurchaseResponse {
    fn from(purchase: Purchase) -> Self {
        PurchaseResponse {
            id: purchase.id,
            user_id: purchase.user_id,
            betslip_id: purchase.betslip_id,
            phone: purchase.phone,
            payment_method: purchase.payment_method,
            amount_paid: purchase.amount_paid,
            status: purchase.status,
            transaction_reference: purchase.transaction_reference,
            external_transaction_id: purchase.external_transaction_id,
            gateway_response: purchase.gateway_response,
            gateway_callback_response: purchase.gateway_callback_response,
            gateway_message: purchase.gateway_message,
            created_at: purchase.created_at,
            updated_at: purchase.updated_at,
        }
    }
}
