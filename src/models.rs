//! Wire types for the `/chat-messages` endpoint.

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// How the server should deliver the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Streaming,
    Blocking,
}

/// Body of a `POST /chat-messages` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    /// App input variables; always sent, always empty for this client
    pub inputs: serde_json::Map<String, serde_json::Value>,
    pub query: String,
    pub response_mode: ResponseMode,
    /// Omitted until the server has assigned one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub user: String,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            inputs: serde_json::Map::new(),
            query: query.into(),
            response_mode: ResponseMode::Streaming,
            conversation_id: None,
            user: user.into(),
        }
    }

    pub fn with_conversation_id(mut self, conversation_id: Option<String>) -> Self {
        self.conversation_id = conversation_id.filter(|id| !id.is_empty());
        self
    }

    pub fn with_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = mode;
        self
    }
}

/// Result of one completed turn, whichever path produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    pub answer: String,
    pub conversation_id: String,
    pub message_id: String,
}

/// Body of a blocking-mode response.
///
/// Every field is optional on the wire; missing and empty values are
/// resolved by the caller. A field holding anything but a string (`null`,
/// a number, an object) reads as missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BlockingResponse {
    #[serde(default, deserialize_with = "string_or_none")]
    pub answer: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub conversation_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub message_id: Option<String>,
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

impl BlockingResponse {
    /// Resolve into a [`ChatResponse`], filling ids the server left out.
    pub fn into_chat_response(self, original_conversation_id: Option<&str>) -> ChatResponse {
        ChatResponse {
            answer: self.answer.unwrap_or_default(),
            conversation_id: self
                .conversation_id
                .filter(|id| !id.is_empty())
                .or_else(|| original_conversation_id.map(str::to_owned))
                .unwrap_or_default(),
            message_id: self
                .message_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(time_derived_id),
        }
    }
}

/// Message id used when the server never supplied one: current time in
/// milliseconds.
pub fn time_derived_id() -> String {
    Utc::now().timestamp_millis().to_string()
}
