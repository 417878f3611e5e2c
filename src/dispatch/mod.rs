pub mod http;

use serde::{Deserialize, Serialize};

/// One `{role, content}` pair in the outbound message list.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Outbound chat-completion payload.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u64,
}

impl ChatRequest {
    /// Single user message, the shape both probes send.
    pub fn user(model: impl Into<String>, prompt: impl Into<String>, max_tokens: u64) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens,
        }
    }
}

/// The parts of an OpenAI-style completion the probes read.
/// Unknown fields are ignored; the full body is kept in [`CompletionResponse::raw`].
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub model: String,
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    /// Some backends send this instead of `reasoning`, some send both.
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

impl ResponseMessage {
    /// Thinking text under either spelling, `reasoning` preferred.
    pub fn reasoning_text(&self) -> Option<&str> {
        self.reasoning
            .as_deref()
            .or(self.reasoning_content.as_deref())
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    /// True when `total_tokens == prompt_tokens + completion_tokens`.
    pub fn is_consistent(&self) -> bool {
        self.prompt_tokens.checked_add(self.completion_tokens) == Some(self.total_tokens)
    }
}

impl ChatCompletion {
    pub fn first_message(&self) -> Option<&ResponseMessage> {
        self.choices.first().map(|c| &c.message)
    }
}

/// Parsed completion plus the untouched JSON body it came from.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub completion: ChatCompletion,
    pub raw: serde_json::Value,
}
