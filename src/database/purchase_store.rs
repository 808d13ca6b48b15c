use async_trait::async_trait;
use mongodb::{
    bson::{doc, to_bson, Bson, Document},
    options::ReturnDocument,
    Collection, Database,
};
use serde_json::Value;
use tracing::warn;

use crate::errors::StoreError;
use crate::models::purchase::{CorrelationKey, Purchase, PurchaseStatus, Settlement};

pub const PURCHASES_COLLECTION: &str = "purchases";

/// Persistence for purchase records.
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    async fn insert(&self, purchase: &Purchase) -> Result<(), StoreError>;

    /// Single-record lookup. Zero matches is `Ok(None)`.
    async fn find_one(&self, key: &CorrelationKey) -> Result<Option<Purchase>, StoreError>;

    /// Applies `settlement` only if the purchase is still `pending`, as one
    /// atomic step. Returns the updated record, or `None` when the record was
    /// no longer pending (another callback got there first).
    async fn settle_pending(
        &self,
        purchase_id: &str,
        settlement: &Settlement,
    ) -> Result<Option<Purchase>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct MongoPurchaseStore {
    db: Database,
    purchases: Collection<Purchase>,
}

impl MongoPurchaseStore {
    pub fn new(db: Database) -> Self {
        let purchases = db.collection(PURCHASES_COLLECTION);
        MongoPurchaseStore { db, purchases }
    }
}

#[async_trait]
impl PurchaseStore for MongoPurchaseStore {
    async fn insert(&self, purchase: &Purchase) -> Result<(), StoreError> {
        self.purchases.insert_one(purchase).await?;
        Ok(())
    }

    async fn find_one(&self, key: &CorrelationKey) -> Result<Option<Purchase>, StoreError> {
        let mut filter = Document::new();
        filter.insert(key.field.column(), key.value.as_str());
        Ok(self.purchases.find_one(filter).await?)
    }

    async fn settle_pending(
        &self,
        purchase_id: &str,
        settlement: &Settlement,
    ) -> Result<Option<Purchase>, StoreError> {
        // Compare-and-set on status; a plain read-then-write would race
        let filter = doc! {
            "_id": purchase_id,
            "status": PurchaseStatus::Pending.as_str(),
        };
        let update = doc! {
            "$set": {
                "status": settlement.status.as_str(),
                "gateway_callback_response": callback_blob(&settlement.gateway_callback_response),
                "gateway_message": settlement.gateway_message.as_str(),
                "updated_at": to_bson(&settlement.settled_at)?,
            }
        };

        let updated = self
            .purchases
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

/// Raw callback body as BSON. Bodies BSON cannot hold (integers past
/// `i64::MAX`) are kept as their JSON text so the settlement still applies.
fn callback_blob(callback: &Value) -> Bson {
    to_bson(callback).unwrap_or_else(|e| {
        warn!(error = %e, "Callback body not representable as BSON, storing it as text");
        Bson::String(callback.to_string())
    })
}
