//! Local chat backend client
//!
//! Talks to a self-hosted chat API (`POST /api/chat`, `GET /api/tags`). Calls are made
//! once; a timeout or transport failure is returned as a terminal `ErrorEnvelope`.

mod models;
pub use models::*;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use config_rs::ProxyConfig;
use reqwest::Client;
use serde_json::{Map, Value};

use crate::core::{BackendKind, BackendReply, CallContext, ChatBackend};
use crate::error::{ErrorEnvelope, Result, ServiceError};
use crate::models::{ChatRequest, ModelCard};
use crate::services::common::{build_http_client, endpoint, read_json, UserAgent};
use crate::util::elapsed_ms;

const SERVICE: &str = "local-chat";

/// OpenAI parameter name -> local backend option name
const OPTION_MAP: [(&str, &str); 5] = [
    ("temperature", "temperature"),
    ("top_p", "top_p"),
    ("max_tokens", "num_predict"),
    ("seed", "seed"),
    ("stop", "stop"),
];

/// Local chat backend client
#[derive(Debug, Clone)]
pub struct LocalChatClient {
    http_client: Client,
    base_url: String,
    default_model: String,
    alias: String,
}

impl LocalChatClient {
    pub fn builder() -> LocalChatClientBuilder {
        LocalChatClientBuilder::default()
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        Self::builder()
            .base_url(&config.local_base_url)
            .default_model(&config.local_default_model)
            .alias(&config.local_alias)
            .timeout(config.upstream_timeout)
            .build()
    }

    /// Resolve the generic alias (or an empty model) to the configured default
    pub fn resolve_model(&self, requested: &str) -> String {
        let requested = requested
            .strip_prefix("local/")
            .or_else(|| requested.strip_prefix("ollama/"))
            .unwrap_or(requested);

        if requested.is_empty() || requested == self.alias {
            self.default_model.clone()
        } else {
            requested.to_string()
        }
    }

    /// Translate the normalized envelope into the local backend's request shape
    pub fn to_local_request(&self, request: ChatRequest) -> LocalChatRequest {
        let mut options = Map::new();
        for (from, to) in OPTION_MAP {
            if let Some(value) = request.extra.get(from) {
                options.insert(to.to_string(), value.clone());
            }
        }

        LocalChatRequest {
            model: self.resolve_model(&request.model),
            messages: request
                .messages
                .into_iter()
                .map(|m| LocalMessage {
                    content: m.content.as_text(),
                    role: m.role,
                    tool_calls: m.tool_calls,
                })
                .collect(),
            stream: false,
            tools: request.tools,
            options,
        }
    }

    async fn post_chat(&self, body: &LocalChatRequest) -> Result<Value> {
        let url = endpoint(&self.base_url, "api/chat");
        log::debug!("Sending request to {}: POST {}", SERVICE, url);

        let response = self.http_client.post(&url).json(body).send().await?;
        read_json(SERVICE, response).await
    }

    async fn get_tags(&self) -> Result<LocalTagsResponse> {
        let url = endpoint(&self.base_url, "api/tags");
        log::debug!("Sending request to {}: GET {}", SERVICE, url);

        let response = self.http_client.get(&url).send().await?;
        read_json(SERVICE, response).await
    }
}

#[async_trait]
impl ChatBackend for LocalChatClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn chat(
        &self,
        request: ChatRequest,
        ctx: &CallContext,
    ) -> std::result::Result<BackendReply, ErrorEnvelope> {
        let start = Instant::now();
        let local_request = self.to_local_request(request);
        let model = local_request.model.clone();

        match self.post_chat(&local_request).await {
            Ok(body) => {
                log::info!(
                    "[{}] {} served model {} in {}ms",
                    ctx.request_id,
                    SERVICE,
                    model,
                    elapsed_ms(start)
                );
                Ok(BackendReply {
                    kind: BackendKind::Local,
                    model,
                    body,
                })
            }
            Err(err) => {
                log::error!("[{}] {} call failed: {}", ctx.request_id, SERVICE, err);
                Err(err.into())
            }
        }
    }

    async fn list_models(&self) -> std::result::Result<Vec<ModelCard>, ErrorEnvelope> {
        let tags = self.get_tags().await.map_err(ErrorEnvelope::from)?;

        Ok(tags
            .models
            .into_iter()
            .map(|tag| {
                let created = tag
                    .modified_at
                    .as_deref()
                    .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
                    .map(|ts| ts.timestamp())
                    .unwrap_or(0);
                ModelCard::new(tag.name, created, "local")
            })
            .collect())
    }
}

/// Builder for the local chat client
#[derive(Debug, Default)]
pub struct LocalChatClientBuilder {
    base_url: Option<String>,
    default_model: Option<String>,
    alias: Option<String>,
    timeout: Option<Duration>,
}

impl LocalChatClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<LocalChatClient> {
        let base_url = self
            .base_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ServiceError::configuration("Local backend base URL is required"))?;

        let http_client = build_http_client(
            Some(UserAgent::for_client(SERVICE)),
            self.timeout.unwrap_or(Duration::from_secs(60)),
        )?;

        Ok(LocalChatClient {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_model: self.default_model.unwrap_or_else(|| "llama3.1:8b".to_string()),
            alias: self.alias.unwrap_or_else(|| "local".to_string()),
        })
    }
}
