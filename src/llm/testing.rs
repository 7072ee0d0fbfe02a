use std::collections::VecDeque;

use parking_lot::Mutex;

use super::{ChatError, ChatMessage, ChatRequest, ChatResponse, Provider};

/// Replays canned replies in order and records every message sequence it is sent.
pub(crate) struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ChatError>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
    api_keys: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub(crate) fn new(replies: Vec<Result<String, ChatError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
            api_keys: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn replying(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub(crate) fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().clone()
    }

    pub(crate) fn api_keys(&self) -> Vec<String> {
        self.api_keys.lock().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    async fn complete(&self, req: &ChatRequest) -> Result<ChatResponse, ChatError> {
        self.calls.lock().push(req.messages.clone());
        self.api_keys.lock().push(req.api_key.clone());

        let reply = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ChatError::Transport("script exhausted".to_string())))?;

        Ok(ChatResponse {
            content: reply,
            model: req.model.clone(),
            input_tokens: 0,
            output_tokens: 0,
            finish_reason: "stop".to_string(),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
