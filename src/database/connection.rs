use mongodb::{
    bson::Document,
    options::IndexOptions,
    Client, Collection, Database, IndexModel,
};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::database::purchase_store::PURCHASES_COLLECTION;
use crate::errors::Result;
use crate::models::purchase::Purchase;

pub async fn get_db_client(config: &AppConfig) -> Result<Database> {
    let client = Client::with_uri_str(&config.database_url).await?;
    let db = client.database(&config.database_name);

    match db.list_collection_names().await {
        Ok(collections) => {
            info!(database = %config.database_name, "Connected to database");
            if !collections.iter().any(|c| c == PURCHASES_COLLECTION) {
                warn!("'{}' collection not found, it will be created on first insert", PURCHASES_COLLECTION);
            }
        }
        Err(e) => {
            warn!(database = %config.database_name, error = %e, "Database may not exist or is inaccessible");
        }
    }

    ensure_indexes(&db).await?;
    Ok(db)
}

/// Unique indexes backing both correlation lookups, so a callback
/// identifier can never match more than one purchase.
pub async fn ensure_indexes(db: &Database) -> Result<()> {
    let purchases: Collection<Purchase> = db.collection(PURCHASES_COLLECTION);

    for field in ["external_transaction_id", "transaction_reference"] {
        let mut keys = Document::new();
        keys.insert(field, 1);
        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();
        purchases.create_index(index).await?;
    }

    info!("Purchase indexes ensured");
    Ok(())
}
