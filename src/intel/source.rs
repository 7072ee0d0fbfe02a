use std::path::PathBuf;
use std::time::Duration;

use opentelemetry::KeyValue;

use super::error::IntelError;
use super::extract::extract_json;
use super::links::{InvalidLink, LinkChecker, verify_links};
use super::model::CityIntel;
use super::prompt;
use crate::llm::{ChatError, ChatMessage, ChatRequest, LlmClient};
use crate::telemetry::metrics::{INTEL_CORRECTIONS, INTEL_FIXTURE_HITS, INTEL_GENERATION_ATTEMPTS};

/// Upstream calls allowed per generation: the first reply plus one correction.
pub const MAX_ATTEMPTS: u32 = 2;

/// A validated record together with the text it was decoded from.
#[derive(Debug, Clone)]
pub struct GeneratedIntel {
    pub intel: CityIntel,
    pub raw_response: String,
    /// Upstream calls spent; zero when served from a fixture.
    pub attempts: u32,
}

#[async_trait::async_trait]
pub trait IntelSource: Send + Sync {
    async fn produce(&self, city_name: &str, country: &str) -> Result<GeneratedIntel, IntelError>;
}

/// Serves a local document in place of the network.
pub struct FixtureSource {
    path: PathBuf,
}

impl FixtureSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl IntelSource for FixtureSource {
    #[tracing::instrument(name = "intel.fixture", skip(self), fields(fixture.path = %self.path.display()))]
    async fn produce(&self, city_name: &str, country: &str) -> Result<GeneratedIntel, IntelError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            IntelError::Config(format!(
                "cannot read intel fixture {}: {e}",
                self.path.display()
            ))
        })?;

        let intel = CityIntel::from_json(raw.trim()).map_err(|e| {
            IntelError::Config(format!(
                "intel fixture {} is not valid city intel: {e}",
                self.path.display()
            ))
        })?;

        INTEL_FIXTURE_HITS.add(1, &[]);
        tracing::info!("Serving city intel from fixture");

        Ok(GeneratedIntel {
            intel,
            raw_response: raw,
            attempts: 0,
        })
    }
}

/// Message history of one generation. Grows by whole exchanges, never shrinks.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn start(system: String, user: String) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
        }
    }

    /// Appends the rejected reply and the follow-up asking to fix it.
    pub fn with_correction(mut self, reply: String, correction: String) -> Self {
        self.messages.push(ChatMessage::assistant(reply));
        self.messages.push(ChatMessage::user(correction));
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

enum Rejection {
    Schema(String),
    Links(Vec<InvalidLink>),
}

impl Rejection {
    fn reason(&self) -> &'static str {
        match self {
            Rejection::Schema(_) => "schema",
            Rejection::Links(_) => "links",
        }
    }

    fn correction(&self) -> String {
        match self {
            Rejection::Schema(error) => prompt::schema_correction(error),
            Rejection::Links(invalid) => prompt::link_correction(invalid),
        }
    }

    fn into_error(self) -> IntelError {
        match self {
            Rejection::Schema(error) => IntelError::Schema(error),
            Rejection::Links(invalid) => IntelError::broken_links(&invalid),
        }
    }
}

/// Asks the chat model, validates its reply and, when enabled, the links in it.
pub struct ResearchSource<'a> {
    pub llm: &'a LlmClient,
    pub links: &'a dyn LinkChecker,
    pub model: &'a str,
    pub temperature: f32,
    pub api_key: String,
    pub verify_urls: bool,
    pub url_timeout: Duration,
}

impl ResearchSource<'_> {
    async fn review(&self, raw: &str) -> Result<CityIntel, Rejection> {
        let intel =
            CityIntel::from_json(extract_json(raw)).map_err(|e| Rejection::Schema(e.to_string()))?;

        if !self.verify_urls {
            return Ok(intel);
        }

        let invalid = verify_links(self.links, &intel, self.url_timeout).await;
        if invalid.is_empty() {
            Ok(intel)
        } else {
            Err(Rejection::Links(invalid))
        }
    }
}

fn record_attempts(attempts: u32, outcome: &'static str) {
    INTEL_GENERATION_ATTEMPTS.record(u64::from(attempts), &[KeyValue::new("outcome", outcome)]);
}

#[async_trait::async_trait]
impl IntelSource for ResearchSource<'_> {
    #[tracing::instrument(
        name = "intel.research",
        skip(self),
        fields(
            gen_ai.request.model = %self.model,
            intel.verify_urls = self.verify_urls,
            intel.attempts = tracing::field::Empty,
        )
    )]
    async fn produce(&self, city_name: &str, country: &str) -> Result<GeneratedIntel, IntelError> {
        let mut conversation = Conversation::start(
            prompt::system_prompt(),
            prompt::user_prompt(city_name, country),
        );
        let mut attempt = 1;

        loop {
            tracing::Span::current().record("intel.attempts", attempt);

            let request = ChatRequest {
                model: self.model.to_string(),
                temperature: self.temperature,
                api_key: self.api_key.clone(),
                messages: conversation.messages().to_vec(),
                attempt,
            };

            let raw = match self.llm.complete(&request).await {
                Ok(response) if response.content.trim().is_empty() => {
                    record_attempts(attempt, "upstream_error");
                    return Err(ChatError::EmptyContent("model reply is empty".to_string()).into());
                }
                Ok(response) => response.content,
                Err(e) => {
                    record_attempts(attempt, "upstream_error");
                    return Err(e.into());
                }
            };

            let rejection = match self.review(&raw).await {
                Ok(intel) => {
                    record_attempts(attempt, "success");
                    tracing::info!(attempts = attempt, "City intel accepted");
                    return Ok(GeneratedIntel {
                        intel,
                        raw_response: raw,
                        attempts: attempt,
                    });
                }
                Err(rejection) => rejection,
            };

            if attempt >= MAX_ATTEMPTS {
                record_attempts(attempt, "rejected");
                return Err(rejection.into_error());
            }

            tracing::warn!(
                attempt,
                reason = rejection.reason(),
                "Model reply rejected, requesting a correction"
            );
            INTEL_CORRECTIONS.add(1, &[KeyValue::new("reason", rejection.reason())]);

            conversation = conversation.with_correction(raw, rejection.correction());
            attempt += 1;
        }
    }
}
