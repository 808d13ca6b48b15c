use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use betslip_payments::config::AppConfig;
use betslip_payments::database::connection::get_db_client;
use betslip_payments::database::purchase_store::MongoPurchaseStore;
use betslip_payments::services::azampay_service::AzamPayService;
use betslip_payments::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(config = %config.get_config_info(), "App config loaded");

    let db = get_db_client(&config)
        .await
        .context("Failed to connect to MongoDB")?;
    let store = Arc::new(MongoPurchaseStore::new(db));

    let gateway = Arc::new(
        AzamPayService::new(config.clone()).context("Failed to build AzamPay client")?,
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid HOST/PORT: {}:{}", config.host, config.port))?;

    let app = build_router(AppState::new(config, store, gateway));

    tracing::info!("Server starting on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
