//! Anthropic Claude API driver.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{GenerateError, GenerateResult};
use crate::llm::{LlmSettings, TextGenerator};

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude API driver.
#[derive(Debug, Clone)]
pub struct AnthropicDriver {
    settings: LlmSettings,
    client: Client,
}

impl AnthropicDriver {
    /// Create a new Anthropic driver.
    pub fn new(settings: LlmSettings) -> GenerateResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| GenerateError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { settings, client })
    }

    /// Build the API URL.
    fn api_url(&self) -> String {
        format!(
            "{}{}",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.provider.completions_path()
        )
    }
}

#[async_trait]
impl TextGenerator for AnthropicDriver {
    async fn generate(&self, prompt: &str) -> GenerateResult<String> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
            "messages": [
                { "role": "user", "content": prompt }
            ],
        });

        let mut request = self
            .client
            .post(self.api_url())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        if let Some(ref api_key) = self.settings.api_key {
            request = request.header("x-api-key", api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GenerateError::Service {
                status: status.as_u16(),
                message: text,
            });
        }

        let message: MessagesResponse = response.json().await?;
        message.into_text()
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.settings.provider, self.settings.model)
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

impl MessagesResponse {
    fn into_text(self) -> GenerateResult<String> {
        let text: Vec<String> = self
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            Err(GenerateError::MalformedResponse(
                "no text blocks in message content".to_string(),
            ))
        } else {
            Ok(text.concat())
        }
    }
}
