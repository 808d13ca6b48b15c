// services/purchase_service.rs
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::database::purchase_store::PurchaseStore;
use crate::errors::{AppError, GatewayError, Result};
use crate::models::azampay::{CheckoutAcceptance, MnoCheckoutRequest};
use crate::models::purchase::{new_external_id, Purchase, PurchaseRequest};
use crate::services::azampay_service::PaymentGateway;

/// Outcome of a successful initiation: the gateway accepted the charge and
/// the purchase is stored as `pending`.
#[derive(Debug, Clone)]
pub struct InitiatedPurchase {
    pub purchase: Purchase,
    pub acceptance: CheckoutAcceptance,
}

pub struct PurchaseService {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn PurchaseStore>,
    currency: String,
}

impl PurchaseService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn PurchaseStore>,
        currency: String,
    ) -> Self {
        PurchaseService {
            gateway,
            store,
            currency,
        }
    }

    /// Charges the payer through AzamPay and records the purchase.
    ///
    /// `request` must already be validated. Does not wait for the payment to
    /// complete; the outcome arrives later through the callback.
    pub async fn initiate(
        &self,
        user_id: &str,
        request: &PurchaseRequest,
    ) -> Result<InitiatedPurchase> {
        let amount = request
            .amount
            .filter(|a| *a > 0.0)
            .ok_or_else(|| AppError::invalid_data("amount must be a positive number"))?;

        let access_token = self.gateway.get_access_token().await?;

        let external_id = new_external_id(&request.betslip_id);
        let checkout = MnoCheckoutRequest {
            account_number: request.phone.trim().to_string(),
            amount,
            currency: self.currency.clone(),
            external_id: external_id.clone(),
            provider: request.provider.trim().to_string(),
        };

        let acceptance = match self.gateway.mno_checkout(&access_token, &checkout).await {
            Ok(acceptance) => acceptance,
            Err(err @ GatewayError::TimedOut { .. }) => {
                warn!(
                    external_transaction_id = %external_id,
                    user_id = %user_id,
                    "MNO checkout timed out; charge outcome unknown, manual reconciliation needed"
                );
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

        let transaction_reference = acceptance
            .transaction_id
            .clone()
            .unwrap_or_else(|| external_id.clone());

        let purchase = Purchase::pending(
            user_id,
            request,
            external_id.clone(),
            transaction_reference,
            acceptance.raw.clone(),
        );

        info!(
            user_id = %user_id,
            betslip_id = %purchase.betslip_id,
            external_transaction_id = %external_id,
            "Inserting purchase record"
        );

        if let Err(source) = self.store.insert(&purchase).await {
            error!(
                external_transaction_id = %external_id,
                gateway_response = %acceptance.raw,
                error = %source,
                "Failed to insert purchase record after successful checkout"
            );
            return Err(AppError::Persistence {
                source,
                external_transaction_id: external_id,
                gateway_response: acceptance.raw,
            });
        }

        info!(purchase_id = %purchase.id, "Purchase record inserted");
        Ok(InitiatedPurchase { purchase, acceptance })
    }
}
