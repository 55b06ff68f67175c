//! Wire shapes of the local (self-hosted) chat backend

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message as the local backend expects it: content is always plain text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalMessage {
    pub role: String,
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<Value>>,
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalChatRequest {
    pub model: String,
    pub messages: Vec<LocalMessage>,
    pub stream: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,

    /// Sampling knobs mapped from OpenAI parameters
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

/// One entry of `GET /api/tags`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocalModelTag {
    pub name: String,

    #[serde(default)]
    pub modified_at: Option<String>,
}

/// Body of `GET /api/tags`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocalTagsResponse {
    #[serde(default)]
    pub models: Vec<LocalModelTag>,
}
