use std::env;
use std::path::PathBuf;
use std::time::Duration;

use super::error::IntelError;

const DEFAULT_URL_TIMEOUT_SECONDS: u64 = 8;

/// Per-generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct IntelSettings {
    pub api_key: Option<String>,
    pub verify_urls: bool,
    pub url_timeout: Duration,
    pub fixture_path: Option<PathBuf>,
}

impl Default for IntelSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            verify_urls: true,
            url_timeout: Duration::from_secs(DEFAULT_URL_TIMEOUT_SECONDS),
            fixture_path: None,
        }
    }
}

impl IntelSettings {
    pub fn from_env() -> Result<Self, IntelError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from any variable lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, IntelError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let verify_urls = match get("VERIFY_GENERATED_URLS") {
            Some(value) => parse_flag("VERIFY_GENERATED_URLS", &value)?,
            None => true,
        };

        let url_timeout = match get("URL_VERIFY_TIMEOUT_SECONDS") {
            Some(value) => {
                let secs: u64 = value.parse().map_err(|_| {
                    IntelError::Config(format!(
                        "URL_VERIFY_TIMEOUT_SECONDS must be a whole number of seconds, got {value:?}"
                    ))
                })?;
                if secs == 0 {
                    return Err(IntelError::Config(
                        "URL_VERIFY_TIMEOUT_SECONDS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_URL_TIMEOUT_SECONDS),
        };

        Ok(Self {
            api_key: get("LLM_API_KEY").or_else(|| get("PERPLEXITY_API_KEY")),
            verify_urls,
            url_timeout,
            fixture_path: get("INTEL_FIXTURE_PATH").map(PathBuf::from),
        })
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, IntelError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(IntelError::Config(format!(
            "{name} must be a boolean flag, got {value:?}"
        ))),
    }
}

/// Where a generator gets its settings from on each call.
#[derive(Debug, Clone)]
pub enum SettingsSource {
    /// Re-read the process environment every time.
    Env,
    Fixed(IntelSettings),
}

impl SettingsSource {
    pub fn load(&self) -> Result<IntelSettings, IntelError> {
        match self {
            SettingsSource::Env => IntelSettings::from_env(),
            SettingsSource::Fixed(settings) => Ok(settings.clone()),
        }
    }
}
