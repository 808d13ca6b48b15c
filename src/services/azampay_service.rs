// services/azampay_service.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde_json::Value;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::errors::{GatewayEndpoint, GatewayError};
use crate::models::azampay::{
    access_token_from, CheckoutAcceptance, MnoCheckoutRequest, TokenRequest,
};

/// Outbound calls to the payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn get_access_token(&self) -> Result<String, GatewayError>;

    async fn mno_checkout(
        &self,
        access_token: &str,
        request: &MnoCheckoutRequest,
    ) -> Result<CheckoutAcceptance, GatewayError>;
}

#[derive(Debug, Clone)]
pub struct AzamPayService {
    config: AppConfig,
    client: Client,
}

impl AzamPayService {
    pub fn new(config: AppConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.gateway_timeout_secs))
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(AzamPayService { config, client })
    }

    async fn read_json(
        endpoint: GatewayEndpoint,
        response: Response,
    ) -> Result<Value, GatewayError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::from_send(endpoint, e))?;

        if !status.is_success() {
            error!(%endpoint, status = status.as_u16(), body = %text, "AzamPay request failed");
            let details = serde_json::from_str(&text).unwrap_or(Value::String(text));
            return Err(GatewayError::Rejected {
                endpoint,
                status: status.as_u16(),
                details,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            error!(%endpoint, error = %e, body = %text, "Failed to parse AzamPay response JSON");
            GatewayError::InvalidJson { endpoint, body: text }
        })
    }
}

#[async_trait]
impl PaymentGateway for AzamPayService {
    async fn get_access_token(&self) -> Result<String, GatewayError> {
        info!(url = %self.config.azampay_token_url, "Requesting AzamPay access token");

        let token_request = TokenRequest {
            app_name: self.config.azampay_app_name.clone(),
            client_id: self.config.azampay_client_id.clone(),
            client_secret: self.config.azampay_client_secret.clone(),
        };

        let response = self
            .client
            .post(&self.config.azampay_token_url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&token_request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Network error fetching AzamPay token");
                GatewayError::from_send(GatewayEndpoint::Token, e)
            })?;

        let token_data = Self::read_json(GatewayEndpoint::Token, response).await?;

        match access_token_from(&token_data) {
            Some(token) => {
                info!("AzamPay token acquired");
                Ok(token)
            }
            None => {
                error!(response = %token_data, "Access token missing in AzamPay response");
                Err(GatewayError::MissingAccessToken { details: token_data })
            }
        }
    }

    async fn mno_checkout(
        &self,
        access_token: &str,
        request: &MnoCheckoutRequest,
    ) -> Result<CheckoutAcceptance, GatewayError> {
        info!(
            url = %self.config.azampay_checkout_url,
            external_id = %request.external_id,
            provider = %request.provider,
            amount = request.amount,
            "Initiating MNO checkout"
        );

        let response = self
            .client
            .post(&self.config.azampay_checkout_url)
            .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
            .header(header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(external_id = %request.external_id, error = %e, "Network error sending MNO checkout");
                GatewayError::from_send(GatewayEndpoint::MnoCheckout, e)
            })?;

        let body = Self::read_json(GatewayEndpoint::MnoCheckout, response).await?;
        let acceptance = CheckoutAcceptance::from_value(body);
        info!(
            external_id = %request.external_id,
            transaction_id = ?acceptance.transaction_id,
            "MNO checkout accepted by AzamPay"
        );
        Ok(acceptance)
    }
}
