use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::purchase_store::PurchaseStore;
use crate::services::azampay_service::PaymentGateway;
use crate::services::purchase_service::PurchaseService;
use crate::services::reconciliation::Reconciler;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn PurchaseStore>,
    pub purchase_service: Arc<PurchaseService>,
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn PurchaseStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let purchase_service =
            PurchaseService::new(gateway, store.clone(), config.currency.clone());
        let reconciler = Reconciler::new(store.clone());

        AppState {
            config: Arc::new(config),
            store,
            purchase_service: Arc::new(purchase_service),
            reconciler: Arc::new(reconciler),
        }
    }
}
