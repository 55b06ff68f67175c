//! Gateway error type and its HTTP rendering

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use backend_sdk::ErrorEnvelope;
use thiserror::Error;

/// Failures that leave the HTTP layer
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Missing or mismatched bearer credential
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed inbound payload
    #[error("Validation error: {0}")]
    Validation(String),

    /// Failure reported by a backend client
    #[error("Backend error: {0}")]
    Backend(ErrorEnvelope),
}

impl ProxyError {
    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            ProxyError::Unauthorized(message) => ErrorEnvelope::with_message(401, message.clone()),
            ProxyError::Validation(message) => ErrorEnvelope::with_message(400, message.clone()),
            ProxyError::Backend(envelope) => envelope.clone(),
        }
    }
}

impl From<ErrorEnvelope> for ProxyError {
    fn from(envelope: ErrorEnvelope) -> Self {
        ProxyError::Backend(envelope)
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Validation(format!("Invalid JSON body: {}", err))
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let envelope = self.envelope();
        let status = StatusCode::from_u16(envelope.status).unwrap_or(StatusCode::BAD_GATEWAY);
        (status, Json(envelope)).into_response()
    }
}
