//! Error handling for the backend SDK
//!
//! Two layers live here:
//! - `ServiceError`, the internal taxonomy the clients and the retry executor reason about
//! - `ErrorEnvelope`, the uniform `{status, body | message}` value every client operation
//!   hands back to its caller instead of a raw transport error

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod mapping;

/// Result type for internal SDK operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Status used when a failure has no upstream status of its own.
pub const DEFAULT_ERROR_STATUS: u16 = 502;

/// Main error type for the backend SDK
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Missing or rejected credentials
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network-level failures, including timeouts
    #[error("Transport error: {message}")]
    Transport { message: String, timeout: bool },

    /// Non-2xx answer from an upstream backend
    #[error("Upstream returned {status}")]
    Upstream { status: u16, body: Value },

    /// Response parsing errors
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Reserved for privacy enforcement failures
    #[error("Policy violation: {0}")]
    PolicyViolation(String),
}

impl ServiceError {
    pub fn authentication(message: impl Into<String>) -> Self {
        ServiceError::Authentication(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        ServiceError::Transport {
            message: message.into(),
            timeout: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        ServiceError::Transport {
            message: message.into(),
            timeout: true,
        }
    }

    pub fn upstream(status: u16, body: Value) -> Self {
        ServiceError::Upstream { status, body }
    }

    pub fn parsing(message: impl Into<String>) -> Self {
        ServiceError::Parsing(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration(message.into())
    }

    /// Transport failures and upstream statuses in the retryable set may be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Transport { .. } => true,
            ServiceError::Upstream { status, .. } => mapping::is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Convert reqwest errors to ServiceError
impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::timeout(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            ServiceError::transport(format!("Connection error: {}", err))
        } else if err.is_decode() {
            ServiceError::parsing(format!("Response decode error: {}", err))
        } else if let Some(status) = err.status() {
            ServiceError::upstream(status.as_u16(), Value::Null)
        } else {
            ServiceError::transport(format!("HTTP client error: {}", err))
        }
    }
}

/// Convert serde_json errors to ServiceError
impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::parsing(format!("JSON error: {}", err))
    }
}

/// Uniform failure value returned across every backend client boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorEnvelope {
    pub fn with_message(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: None,
            message: Some(message.into()),
        }
    }

    pub fn with_body(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
            message: None,
        }
    }
}

impl std::fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.message, &self.body) {
            (Some(message), _) => write!(f, "{}: {}", self.status, message),
            (None, Some(body)) => write!(f, "{}: {}", self.status, body),
            (None, None) => write!(f, "{}", self.status),
        }
    }
}

impl From<ServiceError> for ErrorEnvelope {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Upstream { status, body } => match body {
                Value::Null => {
                    ErrorEnvelope::with_message(status, format!("Upstream returned {}", status))
                }
                Value::String(text) => ErrorEnvelope::with_message(status, text),
                body => ErrorEnvelope::with_body(status, body),
            },
            ServiceError::Transport { message, timeout } => {
                let status = if timeout { 504 } else { DEFAULT_ERROR_STATUS };
                ErrorEnvelope::with_message(status, message)
            }
            ServiceError::Parsing(message) => {
                ErrorEnvelope::with_message(DEFAULT_ERROR_STATUS, message)
            }
            ServiceError::Authentication(message) => ErrorEnvelope::with_message(401, message),
            ServiceError::Validation(message) => ErrorEnvelope::with_message(400, message),
            ServiceError::Configuration(message) => ErrorEnvelope::with_message(500, message),
            ServiceError::PolicyViolation(message) => ErrorEnvelope::with_message(403, message),
        }
    }
}
