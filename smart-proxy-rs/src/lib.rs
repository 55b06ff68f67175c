//! # Smart Proxy
//!
//! LLM gateway in front of a self-hosted chat backend, a remote chat backend and a remote
//! tool-search backend. Every inbound request is authenticated, given a fresh session id,
//! anonymized, routed by the routing policy and dispatched to exactly one backend client.
//!
//! Routes:
//! - `GET /health` liveness, no auth
//! - `POST /proxy/generate` routed chat call, backend body returned verbatim
//! - `POST /proxy/tools` tool-search pass-through
//! - `GET /v1/models`, `POST /v1/chat/completions` OpenAI-compatible surface

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use backend_sdk::{
    BackendKind, CallContext, ChatBackend, ChatMessage, ChatRequest, Credential, LocalChatClient,
    RemoteChatClient, SearchTool, ServiceError, ToolSearchClient,
};
use config_rs::ProxyConfig;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

pub mod anonymizer;
pub mod auth_middleware;
pub mod error;
pub mod openai_shim;
pub mod routing_policy;
pub mod session;

use error::ProxyError;
use routing_policy::{
    CostTier, ModelTable, PrivacyLevel, RouteRequest, RoutingDecision, RoutingPolicy,
};
use session::SessionId;

pub const CALLER_ID_HEADER: &str = "x-caller-id";
pub const ROUTE_MODEL_HEADER: &str = "x-route-model";
pub const ROUTE_REASON_HEADER: &str = "x-route-reason";
pub const POLICY_VERSION_HEADER: &str = "x-policy-version";

/// Chat body accepted by `/proxy/generate` and `/v1/chat/completions`: an OpenAI chat request
/// plus the caller's routing intent.
#[derive(Debug, Deserialize)]
pub struct RoutedChatRequest {
    #[serde(default)]
    pub privacy_level: Option<PrivacyLevel>,

    #[serde(default)]
    pub max_cost_tier: Option<CostTier>,

    #[serde(default)]
    pub research_requested: bool,

    /// Raw prompt, used as the single user message when `messages` is absent
    #[serde(default)]
    pub prompt: Option<String>,

    #[serde(flatten)]
    pub chat: ChatRequest,
}

impl RoutedChatRequest {
    /// Build from an already-anonymized JSON body
    pub fn from_value(mut body: Value) -> Result<Self, ProxyError> {
        let map = body.as_object_mut().ok_or_else(|| {
            ProxyError::Validation("Request body must be a JSON object".to_string())
        })?;

        let has_messages = map.get("messages").is_some_and(|m| !m.is_null());
        if !has_messages {
            let prompt = map
                .get("prompt")
                .and_then(Value::as_str)
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| {
                    ProxyError::Validation("Either messages or prompt is required".to_string())
                })?;
            let message = serde_json::to_value(ChatMessage::user(prompt))?;
            map.insert("messages".to_string(), Value::Array(vec![message]));
        }

        let request: Self = serde_json::from_value(body)?;
        if request.chat.messages.is_empty() {
            return Err(ProxyError::Validation("messages must not be empty".to_string()));
        }
        Ok(request)
    }

    pub fn privacy(&self) -> PrivacyLevel {
        self.privacy_level.unwrap_or_default()
    }

    pub fn route_request(&self) -> RouteRequest {
        let prompt = self
            .prompt
            .clone()
            .unwrap_or_else(|| self.chat.last_user_text());

        RouteRequest::new(prompt)
            .research(self.research_requested)
            .privacy(self.privacy())
            .cost(self.max_cost_tier.unwrap_or_default())
    }
}

/// Body of `/proxy/tools`
#[derive(Debug, Deserialize)]
pub struct ToolRequest {
    pub tool: SearchTool,

    #[serde(default)]
    pub arguments: Value,
}

/// Parse a raw body and redact it before anything else sees it
fn anonymized_body(body: &Bytes) -> Result<Value, ProxyError> {
    let mut value: Value = serde_json::from_slice(body)?;
    anonymizer::anonymize_in_place(&mut value);
    Ok(value)
}

fn set_header(response: &mut Response, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        response.headers_mut().insert(HeaderName::from_static(name), value);
    }
}

fn route_headers(response: &mut Response, model: &str, decision: &RoutingDecision) {
    set_header(response, ROUTE_MODEL_HEADER, model);
    set_header(response, ROUTE_REASON_HEADER, &decision.reason);
    set_header(response, POLICY_VERSION_HEADER, &decision.policy_version);
}

/// Gateway state: immutable configuration and one client per backend
pub struct SmartProxy {
    config: ProxyConfig,
    policy: RoutingPolicy,
    local: LocalChatClient,
    remote: RemoteChatClient,
    tools: ToolSearchClient,
}

impl SmartProxy {
    pub fn new(
        config: ProxyConfig,
        local: LocalChatClient,
        remote: RemoteChatClient,
        tools: ToolSearchClient,
    ) -> Self {
        let policy = RoutingPolicy::new(ModelTable {
            local_model: config.local_default_model.clone(),
            remote_model: config.remote_model.clone(),
        });

        Self {
            config,
            policy,
            local,
            remote,
            tools,
        }
    }

    /// Build the production client set from configuration
    pub fn from_config(config: ProxyConfig) -> Result<Self, ServiceError> {
        let local = LocalChatClient::from_config(&config)?;
        let remote = RemoteChatClient::from_config(&config)?;
        let tools = ToolSearchClient::from_config(&config)?;
        Ok(Self::new(config, local, remote, tools))
    }

    /// Create the Axum router with all routes and middleware
    pub fn create_router(self: Arc<Self>) -> Router {
        let secret = self.config.proxy_secret.clone();
        let body_limit = self.config.max_request_bytes;

        Router::new()
            .route("/health", get(Self::health_handler))
            .route("/proxy/generate", post(Self::generate_handler))
            .route("/proxy/tools", post(Self::tools_handler))
            .route("/v1/models", get(Self::models_handler))
            .route("/v1/chat/completions", post(Self::chat_completions_handler))
            // auth runs inside the session layer so rejections still carry X-Request-ID
            .layer(middleware::from_fn_with_state(secret, auth_middleware::auth_middleware))
            .layer(middleware::from_fn(session::session_middleware))
            .layer(TraceLayer::new_for_http())
            // the `Bytes` extractor has its own 2 MiB cap; the configured limit replaces it
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(RequestBodyLimitLayer::new(body_limit))
            .with_state(self)
    }

    fn backend(&self, kind: BackendKind) -> &dyn ChatBackend {
        match kind {
            BackendKind::Local => &self.local,
            BackendKind::Remote => &self.remote,
        }
    }

    /// The configured internal caller gets the secondary remote key
    fn credential_for(&self, headers: &HeaderMap) -> Credential {
        let caller = headers.get(CALLER_ID_HEADER).and_then(|v| v.to_str().ok());
        match (caller, self.config.remote_secondary_caller.as_deref()) {
            (Some(caller), Some(expected)) if caller == expected => Credential::Secondary,
            _ => Credential::Primary,
        }
    }

    async fn health_handler() -> impl IntoResponse {
        Json(json!({"status": "ok"}))
    }

    async fn generate_handler(
        State(state): State<Arc<Self>>,
        Extension(session): Extension<SessionId>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Response, ProxyError> {
        let request = RoutedChatRequest::from_value(anonymized_body(&body)?)?;
        let decision = state.policy.decide(&request.route_request());
        tracing::info!(
            session_id = %session,
            backend = %decision.backend,
            upstream = state.backend(decision.backend).base_url(),
            model = %decision.model_id,
            reason = %decision.reason,
            policy_version = %decision.policy_version,
            "routing /proxy/generate"
        );

        let ctx =
            CallContext::new(session.as_str()).with_credential(state.credential_for(&headers));
        let mut chat = request.chat;
        chat.model = decision.model_id.clone();

        let reply = state.backend(decision.backend).chat(chat, &ctx).await?;

        let mut response = (StatusCode::OK, Json(reply.body)).into_response();
        route_headers(&mut response, &reply.model, &decision);
        Ok(response)
    }

    async fn tools_handler(
        State(state): State<Arc<Self>>,
        Extension(session): Extension<SessionId>,
        body: Bytes,
    ) -> Result<Response, ProxyError> {
        let request: ToolRequest = serde_json::from_value(anonymized_body(&body)?)?;
        let arguments = match request.arguments {
            Value::Null => json!({}),
            arguments => arguments,
        };
        tracing::info!(session_id = %session, tool = %request.tool, "forwarding tool call");

        let ctx = CallContext::new(session.as_str());
        let result = state.tools.call(request.tool, arguments, &ctx).await?;

        Ok(Json(json!({
            "session_id": session.as_str(),
            "tool": request.tool,
            "result": result,
        }))
        .into_response())
    }

    async fn models_handler(State(state): State<Arc<Self>>) -> impl IntoResponse {
        let local = state.local.list_models().await;
        let remote = match state.remote.list_models().await {
            Ok(cards) => cards,
            Err(err) => {
                tracing::warn!("Remote model listing unavailable: {}", err);
                Vec::new()
            }
        };

        Json(openai_shim::models_listing(local, remote))
    }

    async fn chat_completions_handler(
        State(state): State<Arc<Self>>,
        Extension(session): Extension<SessionId>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Response, ProxyError> {
        let request = RoutedChatRequest::from_value(anonymized_body(&body)?)?;
        let decision = state.policy.decide(&request.route_request());
        let selector =
            openai_shim::ModelSelector::parse(&request.chat.model, &state.config.local_alias);
        let target = openai_shim::dispatch(selector, &decision, request.privacy());
        tracing::info!(
            session_id = %session,
            backend = %target.backend,
            upstream = state.backend(target.backend).base_url(),
            model = %target.model,
            overridden = target.overridden,
            reason = %decision.reason,
            policy_version = %decision.policy_version,
            "routing /v1/chat/completions"
        );

        let mut chat = request.chat;
        if chat.stream {
            tracing::debug!(session_id = %session, "streaming requested; answering non-streamed");
        }
        chat.model = target.model.clone();
        let prompt_chars = chat.char_count();

        let ctx =
            CallContext::new(session.as_str()).with_credential(state.credential_for(&headers));
        let reply = state.backend(target.backend).chat(chat, &ctx).await?;
        let completion = openai_shim::normalize(reply, prompt_chars)?;

        let mut response = Json(completion).into_response();
        route_headers(&mut response, &target.model, &decision);
        Ok(response)
    }
}
