//! Resilience patterns for backend clients

mod retry;

pub use retry::{RetryConfig, RetryExecutor};
