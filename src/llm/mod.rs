pub mod client;
pub mod openai;
pub mod perplexity;

#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::LlmClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub temperature: f32,
    pub api_key: String,
    pub messages: Vec<ChatMessage>,
    /// Generation attempt this call belongs to, for span attribution only.
    pub attempt: u32,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: String,
}

#[derive(Error, Debug, Clone)]
pub enum ChatError {
    #[error("{0}")]
    Transport(String),

    #[error("{}", format_status(.provider, .status, .request_id, .body))]
    Status {
        provider: String,
        status: u16,
        request_id: Option<String>,
        body: String,
    },

    #[error("{0}")]
    InvalidPayload(String),

    #[error("{0}")]
    EmptyContent(String),
}

impl ChatError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn format_status(provider: &str, status: &u16, request_id: &Option<String>, body: &str) -> String {
    let mut message = format!("{provider} API error {status}");
    if let Some(id) = request_id {
        message.push_str(&format!(" (request_id={id})"));
    }
    if !body.is_empty() {
        message.push_str(": ");
        message.push_str(body);
    }
    message
}

#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    async fn complete(&self, req: &ChatRequest) -> Result<ChatResponse, ChatError>;
    fn name(&self) -> &str;
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.char_indices()
            .take_while(|&(i, _)| i < max)
            .map(|(_, c)| c)
            .collect()
    }
}

/// Trims an upstream error body and caps it at `max` characters, marking the cut.
pub(crate) fn diagnostic_body(body: &str, max: usize) -> String {
    let body = body.trim();
    if body.chars().count() > max {
        let head: String = body.chars().take(max).collect();
        format!("{head}...[truncated]")
    } else {
        body.to_string()
    }
}
