//! Common utilities for backend clients

use std::fmt;
use std::time::Duration;

use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;

use crate::error::{
    mapping::{classify_http_error, map_http_error},
    Result, ServiceError,
};

/// UserAgent structure for identifying the proxy to upstream services
#[derive(Debug, Clone)]
pub struct UserAgent {
    pub app_name: String,
    pub version: String,
    pub extra: Option<String>,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            app_name: "smart-proxy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: None,
        }
    }
}

impl UserAgent {
    pub fn for_client(extra: &str) -> Self {
        Self {
            extra: Some(extra.to_string()),
            ..Self::default()
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.version)?;
        if let Some(ref extra) = self.extra {
            write!(f, " ({})", extra)?;
        }
        Ok(())
    }
}

/// Build a standard HTTP client with a bounded timeout
pub fn build_http_client(user_agent: Option<UserAgent>, timeout: Duration) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    let ua = user_agent.unwrap_or_default().to_string();

    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(&ua)
            .map_err(|e| ServiceError::configuration(format!("Invalid user agent: {}", e)))?,
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .gzip(true)
        .build()
        .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Turn an upstream response into `T`, or the matching `ServiceError`
pub async fn read_json<T: DeserializeOwned>(service: &str, response: Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => format!("Failed to read error response: {}", e),
        };
        log::warn!(
            "{} answered {} ({})",
            service,
            status,
            classify_http_error(status.as_u16())
        );
        return Err(map_http_error(status, &body));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ServiceError::parsing(format!("Failed to parse {} response: {}", service, e)))
}

/// Join a base URL and a path without doubling slashes
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_format() {
        let ua = UserAgent::for_client("remote-chat").to_string();
        assert!(ua.starts_with("smart-proxy/"));
        assert!(ua.ends_with("(remote-chat)"));
    }

    #[test]
    fn test_endpoint_join() {
        assert_eq!(endpoint("http://h:1/", "/api/chat"), "http://h:1/api/chat");
        assert_eq!(endpoint("http://h:1/v1", "chat/completions"), "http://h:1/v1/chat/completions");
    }
}
