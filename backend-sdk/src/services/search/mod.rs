//! Tool-search client
//!
//! Forwards `web_search` and `keyword_search` calls to the tools backend. Each call is made
//! once and carries the session id in `X-Request-ID`.

mod models;
pub use models::*;

use std::time::{Duration, Instant};

use config_rs::{ProxyConfig, Secret};
use reqwest::Client;
use serde_json::Value;

use crate::core::CallContext;
use crate::error::{ErrorEnvelope, Result, ServiceError};
use crate::services::common::{build_http_client, endpoint, read_json, UserAgent};
use crate::util::elapsed_ms;

const SERVICE: &str = "tool-search";

/// Client for the tools backend
#[derive(Debug, Clone)]
pub struct ToolSearchClient {
    http_client: Client,
    base_url: String,
    api_key: Option<Secret>,
}

impl ToolSearchClient {
    pub fn builder() -> ToolSearchClientBuilder {
        ToolSearchClientBuilder::default()
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        Self::builder()
            .base_url(&config.tools_base_url)
            .api_key(config.remote_api_key.clone())
            .timeout(config.upstream_timeout)
            .build()
    }

    pub async fn web_search(
        &self,
        arguments: Value,
        ctx: &CallContext,
    ) -> std::result::Result<Value, ErrorEnvelope> {
        self.call(SearchTool::WebSearch, arguments, ctx).await
    }

    pub async fn keyword_search(
        &self,
        arguments: Value,
        ctx: &CallContext,
    ) -> std::result::Result<Value, ErrorEnvelope> {
        self.call(SearchTool::KeywordSearch, arguments, ctx).await
    }

    /// Dispatch by tool name
    pub async fn call(
        &self,
        tool: SearchTool,
        arguments: Value,
        ctx: &CallContext,
    ) -> std::result::Result<Value, ErrorEnvelope> {
        let start = Instant::now();

        match self.post(tool, &arguments, ctx).await {
            Ok(result) => {
                log::info!(
                    "[{}] {} {} completed in {}ms",
                    ctx.request_id,
                    SERVICE,
                    tool,
                    elapsed_ms(start)
                );
                Ok(result)
            }
            Err(err) => {
                log::error!("[{}] {} {} failed: {}", ctx.request_id, SERVICE, tool, err);
                Err(err.into())
            }
        }
    }

    async fn post(&self, tool: SearchTool, arguments: &Value, ctx: &CallContext) -> Result<Value> {
        let url = endpoint(&self.base_url, tool.as_str());
        log::debug!("Sending request to {}: POST {}", SERVICE, url);

        let mut request = self
            .http_client
            .post(&url)
            .header("X-Request-ID", &ctx.request_id)
            .json(arguments);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose());
        }

        let response = request.send().await?;
        read_json(SERVICE, response).await
    }
}

/// Builder for the tool-search client
#[derive(Debug, Default)]
pub struct ToolSearchClientBuilder {
    base_url: Option<String>,
    api_key: Option<Secret>,
    timeout: Option<Duration>,
}

impl ToolSearchClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn api_key(mut self, key: Secret) -> Self {
        self.api_key = Some(key);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ToolSearchClient> {
        let base_url = self
            .base_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ServiceError::configuration("Tools backend base URL is required"))?;

        let http_client = build_http_client(
            Some(UserAgent::for_client(SERVICE)),
            self.timeout.unwrap_or(Duration::from_secs(60)),
        )?;

        Ok(ToolSearchClient {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: self.api_key.filter(|key| !key.is_empty()),
        })
    }
}
