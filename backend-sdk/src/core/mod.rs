//! Core abstractions for the backend SDK
//!
//! - `BackendKind`: the tagged selection between the local and remote chat backends
//! - `ChatBackend`: the capability every chat backend client implements
//! - `CallContext`: per-request data that travels with each upstream call

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorEnvelope;
use crate::models::{ChatRequest, ModelCard};

/// Which chat backend serves a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    Remote,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Remote => "remote",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which remote credential a call should present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Credential {
    #[default]
    Primary,
    Secondary,
}

/// Per-request call data, owned by the request's task
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Session correlation id, forwarded as `X-Request-ID` where the backend traces it
    pub request_id: String,
    pub credential: Credential,
}

impl CallContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            credential: Credential::Primary,
        }
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }
}

/// Raw backend body handed back for normalization
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply {
    pub kind: BackendKind,
    /// Model the backend was asked for, after alias substitution
    pub model: String,
    pub body: Value,
}

/// Capability shared by the chat backends
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn base_url(&self) -> &str;

    /// Send one chat request. Failures come back as an `ErrorEnvelope`, never a panic
    /// or raw transport error.
    async fn chat(
        &self,
        request: ChatRequest,
        ctx: &CallContext,
    ) -> Result<BackendReply, ErrorEnvelope>;

    /// Models this backend can serve
    async fn list_models(&self) -> Result<Vec<ModelCard>, ErrorEnvelope>;
}
