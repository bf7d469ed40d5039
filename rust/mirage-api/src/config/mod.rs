//! Configuration management for Mirage.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. `config/mirage.{yaml,toml,json}` (or the file passed on the command line)
//! 3. `MIRAGE__SECTION__KEY` environment variables (and `.env`)
//! 4. Provider API keys: `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`,
//!    `GOOGLE_API_KEY`, `GROQ_API_KEY`
//!
//! ```rust,ignore
//! use mirage_api::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! let settings = config.llm_settings();
//! ```

pub mod error;
pub mod validator;

pub use error::{ConfigResult, ConfigurationError};
pub use validator::ConfigValidator;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::llm::{LlmSettings, Provider};
use crate::runtime::{ControllerOptions, SimulationTiming};

/// Default config file, relative to the working directory.
const DEFAULT_CONFIG_FILE: &str = "config/mirage";

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Text generation provider credentials.
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Text generation model settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Simulation timings and limits.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load and validate configuration from the default locations.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(None)
    }

    /// Load and validate configuration, reading `path` instead of the
    /// default config file when given.
    pub fn load_from(path: Option<&str>) -> anyhow::Result<Self> {
        let config = Self::load_unchecked(path)?;

        ConfigValidator::validate(&config)
            .map_err(|e| anyhow::anyhow!("Configuration validation failed:\n\n{e}"))?;

        Ok(config)
    }

    /// Load configuration without validation.
    pub fn load_unchecked(path: Option<&str>) -> anyhow::Result<Self> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();

        let file = match path {
            Some(path) => config::File::with_name(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = config::Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("logging.level", default_log_level())?
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("MIRAGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize()?;

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            app_config.providers.openai.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            app_config.providers.anthropic.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            app_config.providers.google.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            app_config.providers.groq.api_key = Some(key);
        }

        Ok(app_config)
    }

    /// Resolve the provider to use.
    ///
    /// An explicit `llm.provider` wins; otherwise the first provider with an
    /// API key, in the order OpenAI, Anthropic, Google, Groq. Without any key
    /// this falls back to OpenAI and every shell request will fail.
    pub fn resolved_provider(&self) -> Provider {
        if let Some(provider) = self.llm.provider {
            return provider;
        }
        [
            Provider::OpenAi,
            Provider::Anthropic,
            Provider::Google,
            Provider::Groq,
        ]
        .into_iter()
        .find(|p| self.providers.get(*p).has_api_key())
        .unwrap_or(Provider::OpenAi)
    }

    /// Build driver settings from the resolved provider.
    pub fn llm_settings(&self) -> LlmSettings {
        let provider = self.resolved_provider();
        let provider_config = self.providers.get(provider);

        LlmSettings {
            base_url: provider_config
                .base_url
                .clone()
                .unwrap_or_else(|| provider.default_base_url().to_string()),
            api_key: provider_config.api_key.clone().filter(|k| !k.is_empty()),
            model: self
                .llm
                .model
                .clone()
                .or_else(|| provider_config.default_model.clone())
                .unwrap_or_else(|| default_model_for(provider).to_string()),
            provider,
            max_tokens: self.llm.max_tokens,
            temperature: self.llm.temperature,
            timeout_secs: self.llm.timeout_secs,
        }
    }
}

/// Model used when neither `llm.model` nor the provider config names one.
fn default_model_for(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi | Provider::Custom => "gpt-4o-mini",
        Provider::Anthropic => "claude-3-5-haiku-latest",
        Provider::Google => "gemini-2.0-flash",
        Provider::Groq => "llama-3.1-8b-instant",
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// API port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_timeout() -> u64 {
    120
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Per-provider credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// OpenAI configuration.
    #[serde(default)]
    pub openai: ProviderConfig,
    /// Anthropic configuration.
    #[serde(default)]
    pub anthropic: ProviderConfig,
    /// Google configuration.
    #[serde(default)]
    pub google: ProviderConfig,
    /// Groq configuration.
    #[serde(default)]
    pub groq: ProviderConfig,
    /// Custom OpenAI-compatible endpoint.
    #[serde(default)]
    pub custom: ProviderConfig,
}

impl ProvidersConfig {
    /// Configuration for one provider.
    pub fn get(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::OpenAi => &self.openai,
            Provider::Anthropic => &self.anthropic,
            Provider::Google => &self.google,
            Provider::Groq => &self.groq,
            Provider::Custom => &self.custom,
        }
    }
}

/// Individual provider configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Base URL override.
    pub base_url: Option<String>,
    /// Default model for this provider.
    pub default_model: Option<String>,
}

impl ProviderConfig {
    /// Whether a non-empty API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_empty())
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Text generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider to use; detected from configured keys when unset.
    #[serde(default)]
    pub provider: Option<Provider>,
    /// Model override.
    #[serde(default)]
    pub model: Option<String>,
    /// Maximum tokens to generate per command.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.2
}

fn default_llm_timeout() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Simulation timings and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Delay between boot lines, in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Delay after the last Linux boot line, in milliseconds.
    #[serde(default = "default_linux_settle_ms")]
    pub linux_settle_ms: u64,
    /// Delay after the last Windows boot line, in milliseconds.
    #[serde(default = "default_windows_settle_ms")]
    pub windows_settle_ms: u64,
    /// How long the disk indicator stays lit, in milliseconds.
    #[serde(default = "default_disk_activity_ms")]
    pub disk_activity_ms: u64,
    /// Trailing transcript characters sent with each command.
    #[serde(default = "default_prompt_tail_chars")]
    pub prompt_tail_chars: usize,
    /// Start with the demo catalog instead of an empty one.
    #[serde(default = "default_true")]
    pub seed_demo_machines: bool,
}

fn default_tick_ms() -> u64 {
    200
}

fn default_linux_settle_ms() -> u64 {
    1500
}

fn default_windows_settle_ms() -> u64 {
    2500
}

fn default_disk_activity_ms() -> u64 {
    600
}

fn default_prompt_tail_chars() -> usize {
    crate::runtime::shell::DEFAULT_TAIL_CHARS
}

fn default_true() -> bool {
    true
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            linux_settle_ms: default_linux_settle_ms(),
            windows_settle_ms: default_windows_settle_ms(),
            disk_activity_ms: default_disk_activity_ms(),
            prompt_tail_chars: default_prompt_tail_chars(),
            seed_demo_machines: true,
        }
    }
}

impl SimulationConfig {
    /// Timer settings for the simulator.
    pub fn timing(&self) -> SimulationTiming {
        SimulationTiming {
            tick: Duration::from_millis(self.tick_ms),
            linux_settle: Duration::from_millis(self.linux_settle_ms),
            windows_settle: Duration::from_millis(self.windows_settle_ms),
            disk_activity: Duration::from_millis(self.disk_activity_ms),
        }
    }

    /// Controller tunables.
    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            prompt_tail_chars: self.prompt_tail_chars,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to use JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timing_matches_boot_scripts() {
        let config = SimulationConfig::default();
        assert_eq!(config.timing(), SimulationTiming::default());
    }

    #[test]
    fn test_provider_detected_from_keys() {
        let mut config = AppConfig::default();
        assert_eq!(config.resolved_provider(), Provider::OpenAi);

        config.providers.anthropic.api_key = Some("sk-ant".to_string());
        assert_eq!(config.resolved_provider(), Provider::Anthropic);

        config.providers.openai.api_key = Some("sk-openai".to_string());
        assert_eq!(config.resolved_provider(), Provider::OpenAi);

        config.llm.provider = Some(Provider::Groq);
        assert_eq!(config.resolved_provider(), Provider::Groq);
    }

    #[test]
    fn test_empty_key_is_not_a_key() {
        let mut config = AppConfig::default();
        config.providers.anthropic.api_key = Some(String::new());
        assert_eq!(config.resolved_provider(), Provider::OpenAi);
        assert!(config.llm_settings().api_key.is_none());
    }

    #[test]
    fn test_llm_settings_model_precedence() {
        let mut config = AppConfig::default();
        config.providers.google.api_key = Some("g-key".to_string());
        let settings = config.llm_settings();
        assert_eq!(settings.provider, Provider::Google);
        assert_eq!(settings.model, "gemini-2.0-flash");
        assert_eq!(settings.base_url, Provider::Google.default_base_url());

        config.providers.google.default_model = Some("gemini-1.5-pro".to_string());
        assert_eq!(config.llm_settings().model, "gemini-1.5-pro");

        config.llm.model = Some("gemini-exp".to_string());
        assert_eq!(config.llm_settings().model, "gemini-exp");
    }

    #[test]
    fn test_provider_config_debug_redacts_key() {
        let provider = ProviderConfig {
            api_key: Some("sk-secret".to_string()),
            ..ProviderConfig::default()
        };
        assert!(!format!("{provider:?}").contains("sk-secret"));
    }
}
