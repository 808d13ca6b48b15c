// config.rs
use std::env;

use crate::errors::{AppError, Result};

const SANDBOX_TOKEN_URL: &str = "https://authenticator-sandbox.azampay.co.tz/api/v1/auth/token";
const SANDBOX_CHECKOUT_URL: &str = "https://sandbox.azampay.co.tz/azampay/checkout";
const PRODUCTION_TOKEN_URL: &str = "https://authenticator.azampay.co.tz/api/v1/auth/token";
const PRODUCTION_CHECKOUT_URL: &str = "https://checkout.azampay.co.tz/azampay/mno/checkout";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub azampay_app_name: String,
    pub azampay_client_id: String,
    pub azampay_client_secret: String,
    pub azampay_environment: String,
    pub azampay_token_url: String,
    pub azampay_checkout_url: String,
    pub currency: String,
    pub gateway_timeout_secs: u64,
    pub jwt_secret: String,
    pub jwt_audience: Option<String>,
    pub database_url: String,
    pub database_name: String,
    pub port: u16,
    pub host: String,
}

impl AppConfig {
    /// Builds the configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` beforehand if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        let azampay_environment =
            env::var("AZAMPAY_ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string());
        let (default_token_url, default_checkout_url) = default_gateway_urls(&azampay_environment);

        // An empty JWT_AUDIENCE disables the audience check.
        let jwt_audience = match env::var("JWT_AUDIENCE") {
            Ok(aud) if aud.trim().is_empty() => None,
            Ok(aud) => Some(aud),
            Err(_) => Some("authenticated".to_string()),
        };

        Ok(AppConfig {
            azampay_app_name: required("AZAMPAY_APP_NAME")?,
            azampay_client_id: required("AZAMPAY_CLIENT_ID")?,
            azampay_client_secret: required("AZAMPAY_CLIENT_SECRET")?,
            azampay_token_url: env::var("AZAMPAY_TOKEN_URL")
                .unwrap_or_else(|_| default_token_url.to_string()),
            azampay_checkout_url: env::var("AZAMPAY_CHECKOUT_URL")
                .unwrap_or_else(|_| default_checkout_url.to_string()),
            azampay_environment,
            currency: env::var("AZAMPAY_CURRENCY").unwrap_or_else(|_| "TZS".to_string()),
            gateway_timeout_secs: parsed("AZAMPAY_TIMEOUT_SECS", 30)?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_audience,
            database_url: required("DATABASE_URL")?,
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "betslips".to_string()),
            port: parsed("PORT", 3000)?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.azampay_environment == "production"
    }

    /// Redacted view of the configuration, safe to log.
    pub fn get_config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "environment": self.azampay_environment,
            "is_production": self.is_production(),
            "app_name": self.azampay_app_name,
            "token_url": self.azampay_token_url,
            "checkout_url": self.azampay_checkout_url,
            "currency": self.currency,
            "gateway_timeout_secs": self.gateway_timeout_secs,
            "client_id_set": !self.azampay_client_id.is_empty(),
            "client_secret_set": !self.azampay_client_secret.is_empty(),
            "jwt_audience": self.jwt_audience,
            "database_name": self.database_name,
            "port": self.port,
            "host": self.host,
        })
    }
}

fn default_gateway_urls(environment: &str) -> (&'static str, &'static str) {
    if environment == "production" {
        (PRODUCTION_TOKEN_URL, PRODUCTION_CHECKOUT_URL)
    } else {
        (SANDBOX_TOKEN_URL, SANDBOX_CHECKOUT_URL)
    }
}

fn required(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::configuration(format!("{} must be set", key))),
    }
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| {
                AppError::configuration(format!("{} must be a number, got '{}'", key, raw))
            }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        azampay_app_name: "app".to_string(),
        azampay_client_id: "id".to_string(),
        azampay_client_secret: "secret".to_string(),
        azampay_environment: "sandbox".to_string(),
        azampay_token_url: "http://localhost/token".to_string(),
        azampay_checkout_url: "http://localhost/checkout".to_string(),
        currency: "TZS".to_string(),
        gateway_timeout_secs: 5,
        jwt_secret: "test-secret".to_string(),
        jwt_audience: None,
        database_url: "mongodb://localhost".to_string(),
        database_name: "test".to_string(),
        port: 0,
        host: "127.0.0.1".to_string(),
    }
}
