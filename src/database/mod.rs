pub mod connection;
pub mod memory;
pub mod purchase_store;
