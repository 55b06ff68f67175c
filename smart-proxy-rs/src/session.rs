//! Per-request session correlation

use std::fmt;

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id minted for a single inbound request. Used for tracing only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        SessionId(backend_sdk::util::generate_request_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Assign a fresh session id, expose it to handlers and echo it on the response
pub async fn session_middleware(mut req: Request, next: Next) -> Response {
    let session = SessionId::generate();
    tracing::debug!(session_id = %session, path = %req.uri().path(), "session opened");
    req.extensions_mut().insert(session.clone());

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(session.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
