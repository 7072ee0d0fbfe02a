use std::env;
use std::time::Duration;

/// Process configuration, read once at startup.
///
/// Generation settings that must follow the live environment (credential,
/// link verification, fixture override) live in `intel::IntelSettings`.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub database_url: String,
    pub admin_api_key: String,
    pub llm_provider: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_timeout_seconds: u64,
    pub llm_api_base: Option<String>,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            port: env::var("APP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("APP_PORT must be a number"),
            environment: env::var("APP_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            admin_api_key: env::var("ADMIN_API_KEY").expect("ADMIN_API_KEY must be set"),
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "perplexity".to_string()),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "sonar-pro".to_string()),
            llm_temperature: env::var("LLM_TEMPERATURE")
                .unwrap_or_else(|_| "0.1".to_string())
                .parse()
                .expect("LLM_TEMPERATURE must be a number"),
            llm_timeout_seconds: env::var("LLM_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .expect("LLM_TIMEOUT_SECONDS must be a number"),
            llm_api_base: env::var("LLM_API_BASE").ok().filter(|v| !v.trim().is_empty()),
            otel_service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "transit-intel".to_string()),
            otel_exporter_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_seconds)
    }
}

#[cfg(test)]
impl Config {
    pub(crate) fn for_tests() -> Self {
        Self {
            port: 0,
            environment: "test".to_string(),
            database_url: String::new(),
            admin_api_key: "test-admin-key".to_string(),
            llm_provider: "perplexity".to_string(),
            llm_model: "sonar-pro".to_string(),
            llm_temperature: 0.1,
            llm_timeout_seconds: 5,
            llm_api_base: None,
            otel_service_name: "transit-intel".to_string(),
            otel_exporter_endpoint: "http://localhost:4317".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_production() {
        let mut config = Config::for_tests();
        assert!(!config.is_production());
        config.environment = "production".to_string();
        assert!(config.is_production());
    }

    #[test]
    fn test_llm_timeout() {
        let config = Config::for_tests();
        assert_eq!(config.llm_timeout(), Duration::from_secs(5));
    }
}
