use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::database::purchase_store::PurchaseStore;
use crate::errors::StoreError;
use crate::models::purchase::{CorrelationKey, Purchase, PurchaseStatus, Settlement};

/// A thread-safe in-memory purchase store.
///
/// Enforces the same uniqueness rules as the MongoDB indexes. Settlement
/// takes the write lock for the whole check-and-write, which gives the same
/// compare-and-set behaviour as `find_one_and_update`.
#[derive(Default, Clone)]
pub struct InMemoryPurchaseStore {
    purchases: Arc<RwLock<HashMap<String, Purchase>>>,
}

impl InMemoryPurchaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, purchase_id: &str) -> Option<Purchase> {
        self.purchases.read().await.get(purchase_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.purchases.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.purchases.read().await.is_empty()
    }
}

#[async_trait]
impl PurchaseStore for InMemoryPurchaseStore {
    async fn insert(&self, purchase: &Purchase) -> Result<(), StoreError> {
        let mut purchases = self.purchases.write().await;

        let clash = purchases.values().find(|existing| {
            existing.external_transaction_id == purchase.external_transaction_id
                || existing.transaction_reference == purchase.transaction_reference
        });
        if purchases.contains_key(&purchase.id) || clash.is_some() {
            return Err(StoreError::DuplicateKey(purchase.external_transaction_id.clone()));
        }

        purchases.insert(purchase.id.clone(), purchase.clone());
        Ok(())
    }

    async fn find_one(&self, key: &CorrelationKey) -> Result<Option<Purchase>, StoreError> {
        let purchases = self.purchases.read().await;
        Ok(purchases
            .values()
            .find(|p| key.field.value_of(p) == key.value)
            .cloned())
    }

    async fn settle_pending(
        &self,
        purchase_id: &str,
        settlement: &Settlement,
    ) -> Result<Option<Purchase>, StoreError> {
        let mut purchases = self.purchases.write().await;
        match purchases.get_mut(purchase_id) {
            Some(purchase) if purchase.status == PurchaseStatus::Pending => {
                purchase.status = settlement.status;
                purchase.gateway_callback_response =
                    Some(settlement.gateway_callback_response.clone());
                purchase.gateway_message = Some(settlement.gateway_message.clone());
                purchase.updated_at = settlement.settled_at;
                Ok(Some(purchase.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::purchase::{LookupField, PurchaseRequest};
    use chrono::Utc;
    use serde_json::json;

    fn purchase(external_id: &str, reference: &str) -> Purchase {
        let request: PurchaseRequest = serde_json::from_value(json!({
            "phone": "0700000000",
            "provider": "Airtel",
            "betslip_id": "BS1",
            "amount": 1000
        }))
        .unwrap();
        Purchase::pending(
            "user-1",
            &request,
            external_id.to_string(),
            reference.to_string(),
            json!({ "transactionId": reference }),
        )
    }

    fn settlement(status: PurchaseStatus) -> Settlement {
        Settlement {
            status,
            gateway_callback_response: json!({ "transactionstatus": "success" }),
            gateway_message: "ok".to_string(),
            settled_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn lookup_by_either_field() {
        let store = InMemoryPurchaseStore::new();
        let p = purchase("BS1_aaa", "AZ1");
        store.insert(&p).await.unwrap();

        let by_external = store
            .find_one(&LookupField::ExternalTransactionId.key("BS1_aaa"))
            .await
            .unwrap();
        assert_eq!(by_external.map(|p| p.id), Some(p.id.clone()));

        let by_reference = store
            .find_one(&LookupField::TransactionReference.key("AZ1"))
            .await
            .unwrap();
        assert_eq!(by_reference.map(|p| p.id), Some(p.id));

        let missing = store
            .find_one(&LookupField::TransactionReference.key("nope"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn duplicate_correlation_ids_are_rejected() {
        let store = InMemoryPurchaseStore::new();
        store.insert(&purchase("BS1_aaa", "AZ1")).await.unwrap();

        let err = store.insert(&purchase("BS1_aaa", "AZ2")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(_)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn settle_only_applies_once() {
        let store = InMemoryPurchaseStore::new();
        let p = purchase("BS1_aaa", "AZ1");
        store.insert(&p).await.unwrap();

        let first = store
            .settle_pending(&p.id, &settlement(PurchaseStatus::Completed))
            .await
            .unwrap();
        assert_eq!(first.map(|p| p.status), Some(PurchaseStatus::Completed));

        let second = store
            .settle_pending(&p.id, &settlement(PurchaseStatus::Failed))
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(store.get(&p.id).await.unwrap().status, PurchaseStatus::Completed);
    }
}
