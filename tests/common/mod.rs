#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use betslip_payments::config::AppConfig;
use betslip_payments::database::memory::InMemoryPurchaseStore;
use betslip_payments::database::purchase_store::PurchaseStore;
use betslip_payments::errors::{GatewayEndpoint, GatewayError, StoreError};
use betslip_payments::models::azampay::{CheckoutAcceptance, MnoCheckoutRequest};
use betslip_payments::models::purchase::{CorrelationKey, Purchase, Settlement};
use betslip_payments::services::azampay_service::PaymentGateway;
use betslip_payments::{build_router, AppState};

pub const JWT_SECRET: &str = "integration-test-secret";
pub const CHECKOUT_PATH: &str = "/api/azampay/checkout";
pub const CALLBACK_PATH: &str = "/api/azampay/callback";

pub fn test_config() -> AppConfig {
    AppConfig {
        azampay_app_name: "betcrack".to_string(),
        azampay_client_id: "client-id".to_string(),
        azampay_client_secret: "client-secret".to_string(),
        azampay_environment: "sandbox".to_string(),
        azampay_token_url: "http://gateway.invalid/token".to_string(),
        azampay_checkout_url: "http://gateway.invalid/checkout".to_string(),
        currency: "TZS".to_string(),
        gateway_timeout_secs: 5,
        jwt_secret: JWT_SECRET.to_string(),
        jwt_audience: Some("authenticated".to_string()),
        database_url: "mongodb://unused".to_string(),
        database_name: "test".to_string(),
        port: 0,
        host: "127.0.0.1".to_string(),
    }
}

pub fn bearer(user_id: &str) -> String {
    let claims = json!({
        "sub": user_id,
        "aud": "authenticated",
        "role": "authenticated",
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}

/// Scripted gateway double that counts outbound calls.
pub struct StubGateway {
    pub token_result: Mutex<Option<GatewayError>>,
    pub checkout_result: Mutex<Option<GatewayError>>,
    pub checkout_body: Value,
    pub token_calls: AtomicUsize,
    pub checkout_calls: AtomicUsize,
    pub checkouts: Mutex<Vec<MnoCheckoutRequest>>,
}

impl StubGateway {
    pub fn accepting(checkout_body: Value) -> Self {
        StubGateway {
            token_result: Mutex::new(None),
            checkout_result: Mutex::new(None),
            checkout_body,
            token_calls: AtomicUsize::new(0),
            checkout_calls: AtomicUsize::new(0),
            checkouts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_token(err: GatewayError) -> Self {
        let stub = Self::accepting(json!({}));
        *stub.token_result.lock().unwrap() = Some(err);
        stub
    }

    pub fn failing_checkout(err: GatewayError) -> Self {
        let stub = Self::accepting(json!({}));
        *stub.checkout_result.lock().unwrap() = Some(err);
        stub
    }

    pub fn outbound_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst) + self.checkout_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn get_access_token(&self) -> Result<String, GatewayError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        match self.token_result.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok("stub-access-token".to_string()),
        }
    }

    async fn mno_checkout(
        &self,
        access_token: &str,
        request: &MnoCheckoutRequest,
    ) -> Result<CheckoutAcceptance, GatewayError> {
        assert_eq!(access_token, "stub-access-token");
        self.checkout_calls.fetch_add(1, Ordering::SeqCst);
        self.checkouts.lock().unwrap().push(request.clone());
        match self.checkout_result.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(CheckoutAcceptance::from_value(self.checkout_body.clone())),
        }
    }
}

/// Store that fails every operation, for persistence-error paths.
pub struct BrokenStore;

#[async_trait]
impl PurchaseStore for BrokenStore {
    async fn insert(&self, _purchase: &Purchase) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("insert refused".to_string()))
    }

    async fn find_one(&self, _key: &CorrelationKey) -> Result<Option<Purchase>, StoreError> {
        Err(StoreError::Unavailable("lookup refused".to_string()))
    }

    async fn settle_pending(
        &self,
        _purchase_id: &str,
        _settlement: &Settlement,
    ) -> Result<Option<Purchase>, StoreError> {
        Err(StoreError::Unavailable("update refused".to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("down".to_string()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryPurchaseStore>,
    pub gateway: Arc<StubGateway>,
}

impl TestApp {
    pub fn new(gateway: StubGateway) -> Self {
        let store = Arc::new(InMemoryPurchaseStore::new());
        let gateway = Arc::new(gateway);
        let state = AppState::new(test_config(), store.clone(), gateway.clone());
        TestApp {
            router: build_router(state),
            store,
            gateway,
        }
    }

    pub fn accepting() -> Self {
        Self::new(StubGateway::accepting(json!({
            "success": true,
            "transactionId": "AZ-TXN-1",
            "message": "Request in progress. You will receive a callback shortly"
        })))
    }

    pub async fn checkout(&self, auth: Option<&str>, body: &str) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(CHECKOUT_PATH)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        send(&self.router, builder.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn callback(&self, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(CALLBACK_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(&self.router, request).await
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub fn purchase_body(amount: Value) -> String {
    json!({
        "phone": "0700000000",
        "provider": "Airtel",
        "betslip_id": "BS1",
        "amount": amount
    })
    .to_string()
}

pub fn unreachable(endpoint: GatewayEndpoint) -> GatewayError {
    GatewayError::Unreachable {
        endpoint,
        message: "connection refused".to_string(),
    }
}
