//! Text-generation drivers.
//!
//! The simulated shell treats the language model as an opaque collaborator:
//! one prompt string in, one block of text out. The [`TextGenerator`] trait is
//! that seam; drivers for concrete providers live in [`providers`].
//!
//! # Drivers
//!
//! - [`providers::OpenAiDriver`]: OpenAI, Groq, Google Gemini (OpenAI-compatible
//!   endpoint) and any custom OpenAI-compatible API
//! - [`providers::AnthropicDriver`]: Anthropic Messages API

pub mod providers;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerateResult;

/// LLM connection and model settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Base URL for the LLM API.
    pub base_url: String,
    /// API key for authentication.
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Provider type.
    pub provider: Provider,
    /// Maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature for sampling.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: Provider::OpenAi.default_base_url().to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            provider: Provider::OpenAi,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("provider", &self.provider)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI and compatible APIs.
    #[default]
    OpenAi,
    /// Anthropic Claude.
    Anthropic,
    /// Google Gemini through its OpenAI-compatible endpoint.
    Google,
    /// Groq.
    Groq,
    /// Custom OpenAI-compatible provider.
    Custom,
}

impl Provider {
    /// Get the default base URL for this provider.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Google => "https://generativelanguage.googleapis.com",
            Self::Groq => "https://api.groq.com",
            Self::Custom => "",
        }
    }

    /// Path of the chat completions endpoint relative to the base URL.
    pub fn completions_path(self) -> &'static str {
        match self {
            Self::OpenAi | Self::Custom => "/v1/chat/completions",
            Self::Google => "/v1beta/openai/chat/completions",
            Self::Groq => "/openai/v1/chat/completions",
            Self::Anthropic => "/v1/messages",
        }
    }

    /// Detect provider from base URL.
    pub fn from_base_url(url: &str) -> Self {
        if url.contains("openai.com") {
            Self::OpenAi
        } else if url.contains("anthropic.com") {
            Self::Anthropic
        } else if url.contains("googleapis.com") {
            Self::Google
        } else if url.contains("groq.com") {
            Self::Groq
        } else {
            Self::Custom
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
            Self::Google => write!(f, "google"),
            Self::Groq => write!(f, "groq"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// The external text-generation collaborator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce a response for a single prompt.
    async fn generate(&self, prompt: &str) -> GenerateResult<String>;

    /// Short label for logs and readiness output.
    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_base_url() {
        assert_eq!(Provider::from_base_url("https://api.openai.com"), Provider::OpenAi);
        assert_eq!(
            Provider::from_base_url("https://api.anthropic.com/"),
            Provider::Anthropic
        );
        assert_eq!(
            Provider::from_base_url("https://generativelanguage.googleapis.com"),
            Provider::Google
        );
        assert_eq!(Provider::from_base_url("http://localhost:11434"), Provider::Custom);
    }

    #[test]
    fn test_settings_debug_redacts_key() {
        let settings = LlmSettings {
            api_key: Some("sk-secret".to_string()),
            ..LlmSettings::default()
        };
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
