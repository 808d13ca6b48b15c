pub mod azampay_service;
pub mod purchase_service;
pub mod reconciliation;
