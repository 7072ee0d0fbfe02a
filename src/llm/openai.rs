use std::time::Duration;

use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    CreateChatCompletionResponse,
};

use super::{ChatError, ChatMessage, ChatRequest, ChatResponse, Provider, Role, diagnostic_body};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

const ERROR_BODY_LIMIT: usize = 1000;

/// Any endpoint speaking the OpenAI chat-completions dialect.
///
/// Requests and responses use the `async-openai` wire types, sent over our own
/// `reqwest` client so the call has a fixed timeout, a single attempt and a
/// visible status code on failure.
pub struct OpenAIProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl OpenAIProvider {
    pub fn new(api_base: Option<&str>, timeout: Duration) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Transport(format!("failed to build HTTP client: {e}")))?;

        let api_base = api_base.unwrap_or(OPENAI_API_BASE);
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
        })
    }
}

fn to_request_message(message: &ChatMessage) -> ChatCompletionRequestMessage {
    match message.role {
        Role::System => ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
            content: ChatCompletionRequestSystemMessageContent::Text(message.content.clone()),
            name: None,
        }),
        Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(message.content.clone()),
            name: None,
        }),
        Role::Assistant => {
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                    message.content.clone(),
                )),
                ..Default::default()
            })
        }
    }
}

#[async_trait::async_trait]
impl Provider for OpenAIProvider {
    async fn complete(&self, req: &ChatRequest) -> Result<ChatResponse, ChatError> {
        #[allow(deprecated)]
        let request = CreateChatCompletionRequest {
            model: req.model.clone(),
            messages: req.messages.iter().map(to_request_message).collect(),
            temperature: Some(req.temperature),
            ..Default::default()
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&req.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Transport(format!("OpenAI-compatible request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let request_id = response
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let error_body = response.text().await.unwrap_or_default();

            return Err(ChatError::Status {
                provider: "OpenAI-compatible".to_string(),
                status: status.as_u16(),
                request_id,
                body: diagnostic_body(&error_body, ERROR_BODY_LIMIT),
            });
        }

        let resp: CreateChatCompletionResponse = response.json().await.map_err(|e| {
            ChatError::InvalidPayload(format!(
                "OpenAI-compatible endpoint returned an unreadable response: {e}"
            ))
        })?;

        let Some(choice) = resp.choices.first() else {
            return Err(ChatError::EmptyContent(
                "OpenAI-compatible endpoint returned no choices.".to_string(),
            ));
        };

        let content = choice
            .message
            .content
            .clone()
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ChatError::EmptyContent("response content is empty.".to_string()))?;

        let finish_reason = choice
            .finish_reason
            .and_then(|r| serde_json::to_value(r).ok())
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        let (input_tokens, output_tokens) = match &resp.usage {
            Some(usage) => (usage.prompt_tokens, usage.completion_tokens),
            None => (0, 0),
        };

        Ok(ChatResponse {
            content,
            model: resp.model,
            input_tokens,
            output_tokens,
            finish_reason,
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}
