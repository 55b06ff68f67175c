//! # Backend SDK
//!
//! Upstream clients for the smart proxy.
//!
//! This crate provides:
//!
//! - A normalized OpenAI-shaped request/response envelope (`models`)
//! - `LocalChatClient` and `RemoteChatClient`, both implementing `ChatBackend`
//! - `ToolSearchClient` for the `web_search` / `keyword_search` tools backend
//! - Retry with exponential backoff and jitter for the remote backend
//! - `ErrorEnvelope`, the uniform failure value returned by every client operation

pub mod core;
pub use core::{BackendKind, BackendReply, CallContext, ChatBackend, Credential};

pub mod error;
pub use error::{ErrorEnvelope, Result, ServiceError};

pub mod models;
pub use models::{ChatMessage, ChatRequest, ChatResponse, MessageContent, ModelCard, Usage};

pub mod resilience;
pub use resilience::{RetryConfig, RetryExecutor};

pub mod services;
pub use services::{local, remote, search};
pub use services::{LocalChatClient, RemoteChatClient, SearchTool, ToolSearchClient};

pub mod util;

#[cfg(test)]
mod tests;
