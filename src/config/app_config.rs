use serde::Deserialize;

use crate::domain::{AnalyzerConfig, DomainError, QuotaLimits};
use crate::infrastructure::llm::LlmProviderKind;
use crate::infrastructure::observability::ObservabilityConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub observability: ObservabilityConfig,
    pub analysis: AnalyzerConfig,
    pub quota: QuotaConfig,
    pub ai: AiConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Per-session allowances for AI augmentation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    pub daily_token_limit: u64,
    pub monthly_budget_usd: f64,
    /// Charge the prompt of an abandoned AI call to the session
    pub track_cancelled_cost: bool,
    /// Session used when a request carries none
    pub anonymous_session_id: String,
}

/// Language-model provider settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub enabled: bool,
    pub provider: LlmProviderKind,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub base_url: Option<String>,
    /// Used when neither the request nor the quota recommendation names a model
    pub default_model: Option<String>,
    pub timeout_ms: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Name of the environment variable holding the Postgres connection string
    pub database_url_env: String,
    /// In-memory usage log capacity; oldest records are evicted first
    pub max_usage_records: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_token_limit: 50_000,
            monthly_budget_usd: 5.0,
            track_cancelled_cost: true,
            anonymous_session_id: "anonymous".to_string(),
        }
    }
}

impl QuotaConfig {
    pub fn limits(&self) -> QuotaLimits {
        QuotaLimits::new(self.daily_token_limit, self.monthly_budget_usd)
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: LlmProviderKind::default(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
            default_model: None,
            timeout_ms: 15_000,
            max_tokens: 1200,
            temperature: 0.2,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url_env: "DATABASE_URL".to_string(),
            max_usage_records: 100_000,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings the services cannot run with
    pub fn validate(&self) -> Result<(), DomainError> {
        self.analysis.validate()?;
        self.observability.validate()?;

        if !self.quota.monthly_budget_usd.is_finite() || self.quota.monthly_budget_usd < 0.0 {
            return Err(DomainError::configuration(format!(
                "quota.monthly_budget_usd must be a non-negative number, got {}",
                self.quota.monthly_budget_usd
            )));
        }

        if self.quota.anonymous_session_id.trim().is_empty() {
            return Err(DomainError::configuration(
                "quota.anonymous_session_id cannot be empty",
            ));
        }

        if self.ai.timeout_ms == 0 {
            return Err(DomainError::configuration("ai.timeout_ms must be positive"));
        }

        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(DomainError::configuration(format!(
                "ai.temperature must be between 0 and 2, got {}",
                self.ai.temperature
            )));
        }

        if self.storage.max_usage_records == 0 {
            return Err(DomainError::configuration(
                "storage.max_usage_records must be positive",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_overrides(overrides: &[(&str, &str)]) -> AppConfig {
        let mut builder = config::Config::builder();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).unwrap();
        }

        builder.build().unwrap().try_deserialize().unwrap()
    }

    #[test]
    fn test_empty_configuration_uses_defaults() {
        let config = from_overrides(&[]);

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.analysis.min_chars, 50);
        assert_eq!(config.analysis.max_chars, 15_000);
        assert_eq!(config.analysis.weights.version, "weights-v1");
        assert_eq!(config.quota.daily_token_limit, 50_000);
        assert!(config.quota.track_cancelled_cost);
        assert_eq!(config.ai.provider, LlmProviderKind::OpenAi);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = from_overrides(&[
            ("quota.daily_token_limit", "1000"),
            ("ai.provider", "anthropic"),
            ("logging.format", "json"),
            ("storage.backend", "postgres"),
        ]);

        assert_eq!(config.quota.daily_token_limit, 1000);
        assert_eq!(config.quota.monthly_budget_usd, 5.0);
        assert_eq!(config.ai.provider, LlmProviderKind::Anthropic);
        assert_eq!(config.ai.timeout_ms, 15_000);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
    }

    #[test]
    fn test_quota_limits_in_micros() {
        let limits = QuotaConfig::default().limits();

        assert_eq!(limits.daily_token_limit, 50_000);
        assert_eq!(limits.monthly_budget_micros, 5_000_000);
    }

    #[test]
    fn test_validate_rejects_unbalanced_weights() {
        let mut config = AppConfig::default();
        config.analysis.weights.content = 0.9;

        assert!(matches!(
            config.validate(),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_negative_budget() {
        let mut config = AppConfig::default();
        config.quota.monthly_budget_usd = -1.0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = AppConfig::default();
        config.ai.timeout_ms = 0;

        assert!(config.validate().is_err());
    }
}
