use std::sync::Arc;

use super::error::IntelError;
use super::links::LinkChecker;
use super::settings::SettingsSource;
use super::source::{FixtureSource, GeneratedIntel, IntelSource, ResearchSource};
use crate::llm::LlmClient;

/// Produces validated city intel, from the override fixture when one is
/// configured and from the chat model otherwise.
///
/// Settings are loaded at the start of every call, so the environment may
/// change between generations without rebuilding the generator.
pub struct IntelGenerator {
    llm: Arc<LlmClient>,
    links: Arc<dyn LinkChecker>,
    model: String,
    temperature: f32,
    settings: SettingsSource,
}

impl IntelGenerator {
    pub fn new(
        llm: Arc<LlmClient>,
        links: Arc<dyn LinkChecker>,
        model: impl Into<String>,
        temperature: f32,
        settings: SettingsSource,
    ) -> Self {
        Self {
            llm,
            links,
            model: model.into(),
            temperature,
            settings,
        }
    }

    #[tracing::instrument(
        name = "intel.generate",
        skip(self),
        fields(intel.source = tracing::field::Empty)
    )]
    pub async fn generate(
        &self,
        city_name: &str,
        country: &str,
    ) -> Result<GeneratedIntel, IntelError> {
        let settings = self.settings.load()?;

        let source: Box<dyn IntelSource + '_> = match settings.fixture_path {
            Some(path) => {
                tracing::Span::current().record("intel.source", "fixture");
                Box::new(FixtureSource::new(path))
            }
            None => {
                tracing::Span::current().record("intel.source", "research");
                let api_key = settings.api_key.ok_or_else(|| {
                    IntelError::Config(
                        "LLM_API_KEY (or PERPLEXITY_API_KEY) must be set to generate city intel"
                            .to_string(),
                    )
                })?;
                Box::new(ResearchSource {
                    llm: &self.llm,
                    links: self.links.as_ref(),
                    model: &self.model,
                    temperature: self.temperature,
                    api_key,
                    verify_urls: settings.verify_urls,
                    url_timeout: settings.url_timeout,
                })
            }
        };

        source.produce(city_name, country).await
    }
}
