use axum::{
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
pub const ALLOW_METHODS: &str = "POST, OPTIONS";

pub fn cors_headers() -> [(HeaderName, HeaderValue); 3] {
    [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(ALLOW_ORIGIN)),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS)),
        (header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS)),
    ]
}

/// Stamps the fixed CORS headers on every response, errors included.
pub async fn with_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    for (name, value) in cors_headers() {
        headers.insert(name, value);
    }
    response
}

/// Answers OPTIONS before any other processing.
pub async fn preflight() -> impl IntoResponse {
    (cors_headers(), "ok")
}
