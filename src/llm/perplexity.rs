use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::{ChatError, ChatMessage, ChatRequest, ChatResponse, Provider, diagnostic_body};

pub const PERPLEXITY_API_BASE: &str = "https://api.perplexity.ai";

const ERROR_BODY_LIMIT: usize = 1000;

pub struct PerplexityProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl PerplexityProvider {
    pub fn new(timeout: Duration) -> Result<Self, ChatError> {
        Self::with_api_base(PERPLEXITY_API_BASE, timeout)
    }

    pub fn with_api_base(api_base: &str, timeout: Duration) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
        })
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    model: Option<String>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<MessageContent>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<serde_json::Value>),
    Other(serde::de::IgnoredAny),
}

impl MessageContent {
    fn into_text(self) -> Option<String> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Parts(parts) => Some(
                parts
                    .iter()
                    .filter(|part| part.get("type").and_then(|t| t.as_str()) == Some("text"))
                    .map(|part| part.get("text").and_then(|t| t.as_str()).unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            MessageContent::Other(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[async_trait::async_trait]
impl Provider for PerplexityProvider {
    async fn complete(&self, req: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", req.api_key))
                .map_err(|e| ChatError::Transport(format!("invalid API key header: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = CompletionRequest {
            model: &req.model,
            temperature: req.temperature,
            messages: &req.messages,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Transport(format!("Perplexity request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let request_id = response
                .headers()
                .get("x-request-id")
                .or_else(|| response.headers().get("request-id"))
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let error_body = response.text().await.unwrap_or_default();

            return Err(ChatError::Status {
                provider: "Perplexity".to_string(),
                status: status.as_u16(),
                request_id,
                body: diagnostic_body(&error_body, ERROR_BODY_LIMIT),
            });
        }

        let resp: CompletionResponse = response.json().await.map_err(|e| {
            ChatError::InvalidPayload(format!("Perplexity returned an unreadable response: {e}"))
        })?;

        let Some(choice) = resp.choices.into_iter().next() else {
            return Err(ChatError::EmptyContent(
                "Perplexity returned no choices.".to_string(),
            ));
        };

        let content = choice
            .message
            .and_then(|m| m.content)
            .and_then(MessageContent::into_text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                ChatError::EmptyContent("Perplexity response content is empty.".to_string())
            })?;

        let (input_tokens, output_tokens) = match &resp.usage {
            Some(usage) => (usage.prompt_tokens, usage.completion_tokens),
            None => (0, 0),
        };

        Ok(ChatResponse {
            content,
            model: resp.model.unwrap_or_else(|| req.model.clone()),
            input_tokens,
            output_tokens,
            finish_reason: choice.finish_reason.unwrap_or_default(),
        })
    }

    fn name(&self) -> &str {
        "perplexity"
    }
}
