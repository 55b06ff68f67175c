//! Remote chat backend client
//!
//! Posts OpenAI-shaped chat payloads with bearer auth. Every call goes through the
//! `RetryExecutor`: up to three attempts on transport failures (timeouts included) and on
//! 429/500/502/503/504.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use config_rs::{ProxyConfig, Secret};
use reqwest::Client;
use serde_json::Value;

use crate::core::{BackendKind, BackendReply, CallContext, ChatBackend, Credential};
use crate::error::{ErrorEnvelope, Result, ServiceError};
use crate::models::{ChatRequest, ModelCard};
use crate::resilience::{RetryConfig, RetryExecutor};
use crate::services::common::{build_http_client, endpoint, read_json, UserAgent};
use crate::util::elapsed_ms;

const SERVICE: &str = "remote-chat";

/// Remote chat backend client
#[derive(Debug, Clone)]
pub struct RemoteChatClient {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Secret,
    secondary_api_key: Option<Secret>,
    retry: RetryExecutor,
}

impl RemoteChatClient {
    pub fn builder() -> RemoteChatClientBuilder {
        RemoteChatClientBuilder::default()
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .base_url(&config.remote_base_url)
            .model(&config.remote_model)
            .api_key(config.remote_api_key.clone())
            .timeout(config.upstream_timeout);
        if let Some(key) = &config.remote_secondary_api_key {
            builder = builder.secondary_api_key(key.clone());
        }
        builder.build()
    }

    fn key_for(&self, credential: Credential) -> &Secret {
        match (credential, &self.secondary_api_key) {
            (Credential::Secondary, Some(key)) => key,
            _ => &self.api_key,
        }
    }

    async fn post_once(&self, request: &ChatRequest, key: &Secret, attempt: u32) -> Result<Value> {
        let url = endpoint(&self.base_url, "chat/completions");
        log::debug!("Sending request to {}: POST {} (attempt {})", SERVICE, url, attempt);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(key.expose())
            .json(request)
            .send()
            .await?;

        read_json(SERVICE, response).await
    }
}

#[async_trait]
impl ChatBackend for RemoteChatClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn chat(
        &self,
        mut request: ChatRequest,
        ctx: &CallContext,
    ) -> std::result::Result<BackendReply, ErrorEnvelope> {
        let start = Instant::now();
        if request.model.is_empty() {
            request.model = self.model.clone();
        }
        request.stream = false;

        let key = self.key_for(ctx.credential);
        if key.is_empty() {
            let err = ServiceError::authentication("No API key configured for the remote backend");
            return Err(err.into());
        }

        let result = self
            .retry
            .execute(|attempt| self.post_once(&request, key, attempt))
            .await;

        match result {
            Ok(body) => {
                log::info!(
                    "[{}] {} served model {} in {}ms",
                    ctx.request_id,
                    SERVICE,
                    request.model,
                    elapsed_ms(start)
                );
                Ok(BackendReply {
                    kind: BackendKind::Remote,
                    model: request.model,
                    body,
                })
            }
            Err(err) => {
                log::error!("[{}] {} call failed: {}", ctx.request_id, SERVICE, err);
                Err(err.into())
            }
        }
    }

    /// The remote model set is fixed by configuration; no upstream call is made
    async fn list_models(&self) -> std::result::Result<Vec<ModelCard>, ErrorEnvelope> {
        Ok(vec![ModelCard::new(self.model.clone(), 0, "remote")])
    }
}

/// Builder for the remote chat client
#[derive(Debug, Default)]
pub struct RemoteChatClientBuilder {
    base_url: Option<String>,
    model: Option<String>,
    api_key: Option<Secret>,
    secondary_api_key: Option<Secret>,
    timeout: Option<Duration>,
    retry_config: Option<RetryConfig>,
}

impl RemoteChatClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: Secret) -> Self {
        self.api_key = Some(key);
        self
    }

    pub fn secondary_api_key(mut self, key: Secret) -> Self {
        self.secondary_api_key = Some(key);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = Some(config);
        self
    }

    pub fn build(self) -> Result<RemoteChatClient> {
        let base_url = self
            .base_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ServiceError::configuration("Remote backend base URL is required"))?;

        let http_client = build_http_client(
            Some(UserAgent::for_client(SERVICE)),
            self.timeout.unwrap_or(Duration::from_secs(60)),
        )?;

        Ok(RemoteChatClient {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: self.model.unwrap_or_else(|| "gpt-4o".to_string()),
            api_key: self.api_key.unwrap_or_else(|| Secret::new("")),
            secondary_api_key: self.secondary_api_key.filter(|key| !key.is_empty()),
            retry: RetryExecutor::new(self.retry_config.unwrap_or_default()),
        })
    }
}
