//! Configuration validation for Mirage.
//!
//! Runs once at startup so bad settings fail fast with a fix hint instead of
//! surfacing later as a stuck boot or a shell that never answers.

use super::error::{ConfigResult, ConfigurationError};
use super::{AppConfig, LlmConfig, SimulationConfig};
use crate::llm::Provider;

/// Checks loaded configuration for values the simulator cannot run with.
#[derive(Debug)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the entire application configuration.
    ///
    /// Returns `Ok(())` if valid, or a `ConfigurationError` with all issues.
    pub fn validate(config: &AppConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_simulation(&config.simulation) {
            match e {
                ConfigurationError::Multiple(errs) => errors.extend(errs),
                e => errors.push(e),
            }
        }

        if let Err(e) = Self::validate_llm(&config.llm) {
            match e {
                ConfigurationError::Multiple(errs) => errors.extend(errs),
                e => errors.push(e),
            }
        }

        if let Err(e) = Self::validate_provider(config) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_timeouts(config) {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigurationError::multiple(errors))
        }
    }

    /// Validate simulation timings and limits.
    pub fn validate_simulation(config: &SimulationConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if config.tick_ms == 0 {
            errors.push(ConfigurationError::invalid(
                "simulation.tick_ms must be greater than zero",
                "Set MIRAGE__SIMULATION__TICK_MS to a positive number of milliseconds (default: 200)",
            ));
        }

        if config.prompt_tail_chars == 0 {
            errors.push(ConfigurationError::invalid(
                "simulation.prompt_tail_chars must be greater than zero",
                "Set MIRAGE__SIMULATION__PROMPT_TAIL_CHARS to a positive character count (default: 800)",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigurationError::multiple(errors))
        }
    }

    /// Validate text generation parameters.
    pub fn validate_llm(config: &LlmConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if !(0.0..=2.0).contains(&config.temperature) {
            errors.push(ConfigurationError::invalid(
                format!(
                    "llm.temperature must be between 0.0 and 2.0, got {}",
                    config.temperature
                ),
                "Set MIRAGE__LLM__TEMPERATURE to a value in 0.0..=2.0",
            ));
        }

        if config.max_tokens == 0 {
            errors.push(ConfigurationError::invalid(
                "llm.max_tokens must be greater than zero",
                "Set MIRAGE__LLM__MAX_TOKENS to a positive token count (default: 1024)",
            ));
        }

        if config.timeout_secs == 0 {
            errors.push(ConfigurationError::invalid(
                "llm.timeout_secs must be greater than zero",
                "Set MIRAGE__LLM__TIMEOUT_SECS to a positive number of seconds (default: 60)",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigurationError::multiple(errors))
        }
    }

    /// A custom provider has no default endpoint.
    pub fn validate_provider(config: &AppConfig) -> ConfigResult<()> {
        let provider = config.resolved_provider();
        if provider == Provider::Custom
            && config
                .providers
                .custom
                .base_url
                .as_ref()
                .is_none_or(|url| url.trim().is_empty())
        {
            return Err(ConfigurationError::missing_required(
                "providers.custom.base_url",
                "The custom text generation provider",
                "MIRAGE__PROVIDERS__CUSTOM__BASE_URL",
            ));
        }
        Ok(())
    }

    /// The model call must give up before the HTTP request does.
    pub fn validate_timeouts(config: &AppConfig) -> ConfigResult<()> {
        if config.llm.timeout_secs >= config.server.timeout_secs {
            return Err(ConfigurationError::invalid(
                format!(
                    "llm.timeout_secs ({}) must be less than server.timeout_secs ({})",
                    config.llm.timeout_secs, config.server.timeout_secs
                ),
                "Lower MIRAGE__LLM__TIMEOUT_SECS or raise MIRAGE__SERVER__TIMEOUT_SECS (defaults: 60 and 120)",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigValidator::validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_tick_rejected() {
        let mut config = AppConfig::default();
        config.simulation.tick_ms = 0;
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(err.to_string().contains("MIRAGE__SIMULATION__TICK_MS"));
    }

    #[test]
    fn test_errors_are_collected() {
        let mut config = AppConfig::default();
        config.simulation.tick_ms = 0;
        config.simulation.prompt_tail_chars = 0;
        config.llm.temperature = 3.5;
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(err.count(), 3);
    }

    #[test]
    fn test_llm_timeout_must_undercut_request_timeout() {
        let mut config = AppConfig::default();
        config.llm.timeout_secs = config.server.timeout_secs;
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(err.to_string().contains("MIRAGE__LLM__TIMEOUT_SECS"));

        config.llm.timeout_secs = config.server.timeout_secs - 1;
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_custom_provider_requires_base_url() {
        let mut config = AppConfig::default();
        config.llm.provider = Some(Provider::Custom);
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingRequired { .. }));

        config.providers.custom.base_url = Some("http://localhost:11434".to_string());
        assert!(ConfigValidator::validate(&config).is_ok());
    }
}
