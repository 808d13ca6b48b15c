// services/reconciliation.rs
//
// Reconciles AzamPay callbacks against stored purchases.
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::database::purchase_store::PurchaseStore;
use crate::errors::StoreError;
use crate::models::azampay::CallbackFields;
use crate::models::purchase::{CorrelationKey, LookupField, Purchase, PurchaseStatus, Settlement};

pub const DEFAULT_GATEWAY_MESSAGE: &str = "No message provided by AzamPay.";

/// Gateway payment status after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    Success,
    Failure,
    Unrecognized,
}

// AzamPay spells failure both ways.
const STATUS_VOCABULARY: &[(&str, GatewayStatus)] = &[
    ("success", GatewayStatus::Success),
    ("failure", GatewayStatus::Failure),
    ("failed", GatewayStatus::Failure),
];

impl GatewayStatus {
    pub fn parse(raw: &str) -> Self {
        let normalized = normalize(raw);
        STATUS_VOCABULARY
            .iter()
            .find(|(token, _)| *token == normalized)
            .map(|(_, status)| *status)
            .unwrap_or(GatewayStatus::Unrecognized)
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl PurchaseStatus {
    /// Transition function. Terminal states never change; an unrecognized
    /// gateway status leaves a pending purchase pending.
    pub fn next(self, gateway_status: &GatewayStatus) -> PurchaseStatus {
        if self.is_terminal() {
            return self;
        }
        match gateway_status {
            GatewayStatus::Success => PurchaseStatus::Completed,
            GatewayStatus::Failure => PurchaseStatus::Failed,
            GatewayStatus::Unrecognized => self,
        }
    }
}

type Candidate = (LookupField, fn(&CallbackFields) -> Option<&str>);

/// Callback identifiers in priority order. Our own `utilityref` is tried
/// before AzamPay's `reference`, which is not always echoed back.
const RESOLUTION_ORDER: &[Candidate] = &[
    (LookupField::ExternalTransactionId, utility_ref),
    (LookupField::TransactionReference, gateway_reference),
];

fn utility_ref(fields: &CallbackFields) -> Option<&str> {
    fields.utility_ref.as_deref()
}

fn gateway_reference(fields: &CallbackFields) -> Option<&str> {
    fields.reference.as_deref()
}

pub fn resolve_correlation(fields: &CallbackFields) -> Result<CorrelationKey, ReconcileError> {
    RESOLUTION_ORDER
        .iter()
        .find_map(|(field, extract)| {
            extract(fields)
                .filter(|value| !value.trim().is_empty())
                .map(|value| field.key(value))
        })
        .ok_or(ReconcileError::CorrelationMissing)
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Callback data incomplete: Missing transaction identifier.")]
    CorrelationMissing,

    #[error("Internal database error during purchase lookup.")]
    Lookup(#[source] StoreError),

    #[error("Internal database error during purchase update.")]
    Update {
        purchase_id: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The purchase left `pending`.
    Transitioned { purchase_id: String, status: PurchaseStatus },
    /// Already `completed` or `failed`; nothing written.
    AlreadyFinalized { purchase_id: String, status: PurchaseStatus },
    /// Status not recognized; purchase stays pending, nothing written.
    Inconclusive { purchase_id: String, gateway_status: String },
    NotFound,
}

impl ReconcileOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            ReconcileOutcome::Transitioned { .. } | ReconcileOutcome::Inconclusive { .. } => {
                "Callback processed successfully."
            }
            ReconcileOutcome::AlreadyFinalized { .. } => "Transaction already finalized.",
            ReconcileOutcome::NotFound => {
                "Purchase record not found, callback acknowledged but not processed further."
            }
        }
    }
}

pub struct Reconciler {
    store: Arc<dyn PurchaseStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn PurchaseStore>) -> Self {
        Reconciler { store }
    }

    pub async fn reconcile(&self, payload: &Value) -> Result<ReconcileOutcome, ReconcileError> {
        let fields = CallbackFields::from_payload(payload);
        let key = resolve_correlation(&fields)?;
        let gateway_status = GatewayStatus::parse(&fields.transaction_status);

        info!(
            lookup_field = key.field.column(),
            lookup_value = %key.value,
            gateway_status = ?gateway_status,
            "Resolving AzamPay callback"
        );

        let purchase = match self.store.find_one(&key).await {
            Ok(Some(purchase)) => purchase,
            Ok(None) => {
                warn!(
                    lookup_field = key.field.column(),
                    lookup_value = %key.value,
                    "No purchase found for callback; old or unmatched callback"
                );
                return Ok(ReconcileOutcome::NotFound);
            }
            Err(e) => {
                error!(lookup_field = key.field.column(), lookup_value = %key.value, error = %e, "Database error finding purchase");
                return Err(ReconcileError::Lookup(e));
            }
        };

        if purchase.status.is_terminal() {
            info!(
                purchase_id = %purchase.id,
                status = purchase.status.as_str(),
                "Purchase already finalized, ignoring redundant callback"
            );
            return Ok(ReconcileOutcome::AlreadyFinalized {
                purchase_id: purchase.id,
                status: purchase.status,
            });
        }

        warn_on_mismatch(&purchase, &fields);

        let next = purchase.status.next(&gateway_status);
        if next == purchase.status {
            let raw = normalize(&fields.transaction_status);
            warn!(
                purchase_id = %purchase.id,
                gateway_status = %raw,
                "Unrecognized AzamPay transactionstatus, keeping purchase pending"
            );
            return Ok(ReconcileOutcome::Inconclusive {
                purchase_id: purchase.id,
                gateway_status: raw,
            });
        }

        let settlement = Settlement {
            status: next,
            gateway_callback_response: payload.clone(),
            gateway_message: fields
                .message
                .clone()
                .unwrap_or_else(|| DEFAULT_GATEWAY_MESSAGE.to_string()),
            settled_at: Utc::now(),
        };

        match self.store.settle_pending(&purchase.id, &settlement).await {
            Ok(Some(updated)) => {
                info!(purchase_id = %updated.id, status = updated.status.as_str(), "Purchase status updated");
                Ok(ReconcileOutcome::Transitioned {
                    purchase_id: updated.id,
                    status: updated.status,
                })
            }
            Ok(None) => {
                // A concurrent callback finalized it between our read and write
                info!(purchase_id = %purchase.id, "Purchase finalized concurrently, no update applied");
                let status = match self.store.find_one(&key).await {
                    Ok(Some(current)) => current.status,
                    Ok(None) => next,
                    Err(e) => {
                        warn!(
                            purchase_id = %purchase.id,
                            error = %e,
                            "Could not re-read purchase after lost update, reporting requested status"
                        );
                        next
                    }
                };
                Ok(ReconcileOutcome::AlreadyFinalized {
                    purchase_id: purchase.id,
                    status,
                })
            }
            Err(source) => {
                error!(purchase_id = %purchase.id, status = next.as_str(), error = %source, "Database error updating purchase");
                Err(ReconcileError::Update {
                    purchase_id: purchase.id,
                    source,
                })
            }
        }
    }
}

// Callback amount/msisdn are informational only; mismatches are logged.
fn warn_on_mismatch(purchase: &Purchase, fields: &CallbackFields) {
    if let Some(amount) = fields.amount {
        if (amount - purchase.amount_paid).abs() > 0.005 {
            warn!(
                purchase_id = %purchase.id,
                stored_amount = purchase.amount_paid,
                callback_amount = amount,
                "Callback amount differs from purchase amount"
            );
        }
    }
    if let Some(msisdn) = &fields.msisdn {
        if !same_number(msisdn, &purchase.phone) {
            warn!(
                purchase_id = %purchase.id,
                stored_phone = %purchase.phone,
                callback_msisdn = %msisdn,
                "Callback msisdn differs from purchase phone"
            );
        }
    }
}

// Compare on the last nine digits so 0712... and 255712... match.
fn same_number(a: &str, b: &str) -> bool {
    let digits = |s: &str| s.chars().filter(char::is_ascii_digit).collect::<String>();
    let (a, b) = (digits(a), digits(b));
    let tail = |s: &str| s[s.len().saturating_sub(9)..].to_string();
    tail(&a) == tail(&b)
}
