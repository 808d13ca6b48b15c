pub mod azampay;
pub mod purchase;
