//! Betslip purchase payments through AzamPay MNO checkout.
//!
//! Two entry points share the `purchases` collection: the checkout handler
//! charges the payer and stores a `pending` purchase, and the callback
//! handler reconciles AzamPay's asynchronous result against it.

pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
