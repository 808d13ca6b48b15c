use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::state::AppState;

// Only `sub` is used; other claims in the token are ignored.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// The authenticated caller, taken from a `Bearer` JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

pub fn verify_bearer(
    authorization: Option<&str>,
    config: &AppConfig,
) -> Result<AuthUser, AppError> {
    let token = authorization
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            error!("Missing or invalid Authorization header");
            AppError::unauthorized("Missing or invalid Authorization header")
        })?;

    let mut validation = Validation::new(Algorithm::HS256);
    match &config.jwt_audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        error!(error = %e, "User authentication failed");
        AppError::unauthorized("User not authenticated or token invalid.")
    })?;

    let user_id = token_data.claims.sub;
    if user_id.trim().is_empty() {
        return Err(AppError::unauthorized("User not authenticated or token invalid."));
    }

    Ok(AuthUser { user_id })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        verify_bearer(authorization, &state.config)
    }
}
