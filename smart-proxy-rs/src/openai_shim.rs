//! # OpenAI-compatible protocol shim
//!
//! Presents `/v1/models` and `/v1/chat/completions` in the OpenAI chat-completions shape no
//! matter which backend served the call. Responses always carry integer `usage` counts; when a
//! backend omits them they are estimated at four characters per token.

use backend_sdk::{
    models::{Choice, ResponseMessage},
    BackendKind, BackendReply, ChatResponse, ErrorEnvelope, ModelCard, Usage,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::routing_policy::{PrivacyLevel, RoutingDecision};

/// What the caller's `model` field asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSelector {
    /// Let the routing policy choose
    Auto,
    Local(String),
    Remote(String),
}

impl ModelSelector {
    pub fn parse(model: &str, local_alias: &str) -> Self {
        let model = model.trim();
        if model.is_empty() || model.eq_ignore_ascii_case("auto") {
            ModelSelector::Auto
        } else if model == local_alias
            || model.starts_with("local/")
            || model.starts_with("ollama/")
        {
            ModelSelector::Local(model.to_string())
        } else {
            ModelSelector::Remote(model.to_string())
        }
    }
}

/// Final backend and model for a chat-completions call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub backend: BackendKind,
    pub model: String,
    pub overridden: bool,
}

/// Combine the caller's selector with the policy decision. An explicit model is honored,
/// except that a high privacy level always keeps the call local.
pub fn dispatch(
    selector: ModelSelector,
    decision: &RoutingDecision,
    privacy: PrivacyLevel,
) -> Dispatch {
    let from_policy = Dispatch {
        backend: decision.backend,
        model: decision.model_id.clone(),
        overridden: false,
    };

    match selector {
        _ if privacy == PrivacyLevel::High => from_policy,
        ModelSelector::Auto => from_policy,
        ModelSelector::Local(model) => Dispatch {
            backend: BackendKind::Local,
            model,
            overridden: true,
        },
        ModelSelector::Remote(model) => Dispatch {
            backend: BackendKind::Remote,
            model,
            overridden: true,
        },
    }
}

/// Body of `GET /v1/models`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelCard>,
}

/// Merge the local and remote listings. A failed local listing is logged and skipped.
pub fn models_listing(
    local: Result<Vec<ModelCard>, ErrorEnvelope>,
    remote: Vec<ModelCard>,
) -> ModelList {
    let mut data = match local {
        Ok(cards) => cards,
        Err(err) => {
            tracing::warn!("Local model listing unavailable: {}", err);
            Vec::new()
        }
    };
    data.extend(remote);

    ModelList {
        object: "list".to_string(),
        data,
    }
}

fn estimate_tokens(chars: usize) -> u64 {
    chars.div_ceil(4) as u64
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

/// OpenAI wants `arguments` as a JSON string and every call to carry an id and type
fn normalize_tool_calls(calls: &[Value]) -> Vec<Value> {
    calls
        .iter()
        .enumerate()
        .map(|(index, call)| {
            let mut call = match call {
                Value::Object(map) => map.clone(),
                other => return other.clone(),
            };
            call.entry("id")
                .or_insert_with(|| Value::String(format!("call_{}", index)));
            call.entry("type")
                .or_insert_with(|| Value::String("function".to_string()));
            if let Some(Value::Object(function)) = call.get_mut("function") {
                if let Some(args) = function.get_mut("arguments") {
                    if !args.is_string() {
                        *args = Value::String(args.to_string());
                    }
                }
            }
            Value::Object(call)
        })
        .collect()
}

fn message_from(value: Option<&Value>) -> ResponseMessage {
    let role = value
        .and_then(|m| m.get("role"))
        .and_then(Value::as_str)
        .unwrap_or("assistant")
        .to_string();
    let content = value
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let tool_calls = value
        .and_then(|m| m.get("tool_calls"))
        .and_then(Value::as_array)
        .filter(|calls| !calls.is_empty())
        .map(|calls| normalize_tool_calls(calls));

    ResponseMessage {
        role,
        content,
        tool_calls,
    }
}

fn read_count(map: Option<&Map<String, Value>>, key: &str) -> Option<u64> {
    map.and_then(|m| m.get(key)).and_then(Value::as_u64)
}

fn completion_chars(choices: &[Choice]) -> usize {
    choices
        .iter()
        .filter_map(|c| c.message.content.as_deref())
        .map(|c| c.chars().count())
        .sum()
}

/// Turn a raw backend body into an OpenAI chat completion.
///
/// `prompt_chars` is the character count of the request messages, used when the backend does
/// not report prompt tokens.
pub fn normalize(reply: BackendReply, prompt_chars: usize) -> Result<ChatResponse, ErrorEnvelope> {
    if !reply.body.is_object() {
        return Err(ErrorEnvelope::with_message(
            502,
            format!("{} backend returned a non-object body", reply.kind),
        ));
    }

    match reply.kind {
        BackendKind::Local => Ok(normalize_local(reply, prompt_chars)),
        BackendKind::Remote => Ok(normalize_remote(reply, prompt_chars)),
    }
}

fn normalize_local(reply: BackendReply, prompt_chars: usize) -> ChatResponse {
    let body = &reply.body;
    let message = message_from(body.get("message"));
    let finish_reason = if message.tool_calls.is_some() {
        "tool_calls".to_string()
    } else {
        body.get("done_reason")
            .and_then(Value::as_str)
            .unwrap_or("stop")
            .to_string()
    };

    let choices = vec![Choice {
        index: 0,
        message,
        finish_reason: Some(finish_reason),
    }];

    let counts = body.as_object();
    let prompt_tokens =
        read_count(counts, "prompt_eval_count").unwrap_or_else(|| estimate_tokens(prompt_chars));
    let completion_tokens = read_count(counts, "eval_count")
        .unwrap_or_else(|| estimate_tokens(completion_chars(&choices)));

    ChatResponse {
        id: completion_id(),
        object: "chat.completion".to_string(),
        created: body
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.timestamp())
            .unwrap_or_else(now_secs),
        model: body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(&reply.model)
            .to_string(),
        choices,
        usage: Usage::new(prompt_tokens, completion_tokens),
    }
}

fn normalize_remote(reply: BackendReply, prompt_chars: usize) -> ChatResponse {
    let body = &reply.body;
    let choices: Vec<Choice> = body
        .get("choices")
        .and_then(Value::as_array)
        .map(|choices| {
            choices
                .iter()
                .enumerate()
                .map(|(i, choice)| Choice {
                    index: choice
                        .get("index")
                        .and_then(Value::as_u64)
                        .map(|index| index as u32)
                        .unwrap_or(i as u32),
                    message: message_from(choice.get("message")),
                    finish_reason: choice
                        .get("finish_reason")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                })
                .collect()
        })
        .unwrap_or_default();

    let usage = body.get("usage").and_then(Value::as_object);
    let prompt_tokens =
        read_count(usage, "prompt_tokens").unwrap_or_else(|| estimate_tokens(prompt_chars));
    let completion_tokens = read_count(usage, "completion_tokens")
        .unwrap_or_else(|| estimate_tokens(completion_chars(&choices)));

    ChatResponse {
        id: body
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(completion_id),
        object: "chat.completion".to_string(),
        created: body.get("created").and_then(Value::as_i64).unwrap_or_else(now_secs),
        model: body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(&reply.model)
            .to_string(),
        choices,
        usage: Usage::new(prompt_tokens, completion_tokens),
    }
}
