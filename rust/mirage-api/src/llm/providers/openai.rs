//! OpenAI and OpenAI-compatible provider driver.
//!
//! This driver supports OpenAI, Groq, Google Gemini's compatibility endpoint,
//! and any OpenAI-compatible API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{GenerateError, GenerateResult};
use crate::llm::{LlmSettings, TextGenerator};

/// OpenAI-compatible API driver.
#[derive(Debug, Clone)]
pub struct OpenAiDriver {
    settings: LlmSettings,
    client: Client,
}

impl OpenAiDriver {
    /// Create a new OpenAI driver.
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
impl TextGenerator for OpenAiDriver {
    async fn generate(&self, prompt: &str) -> GenerateResult<String> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
            "stream": false,
        });

        let mut request = self.client.post(self.api_url()).json(&body);

        if let Some(ref api_key) = self.settings.api_key {
            request = request.bearer_auth(api_key);
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

        let completion: ChatCompletion = response.json().await?;
        completion.into_text()
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.settings.provider, self.settings.model)
    }
}

/// Non-streaming chat completion response.
#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatCompletion {
    fn into_text(self) -> GenerateResult<String> {
        self.choices
            .into_iter()
            .find_map(|c| c.message.and_then(|m| m.content))
            .ok_or_else(|| GenerateError::MalformedResponse("no message content in choices".to_string()))
    }
}
