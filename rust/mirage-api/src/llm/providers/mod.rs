//! LLM provider implementations.

mod anthropic;
mod openai;

pub use anthropic::AnthropicDriver;
pub use openai::OpenAiDriver;

use std::sync::Arc;

use super::{LlmSettings, Provider, TextGenerator};
use crate::error::GenerateResult;

/// Create a generator for the given settings.
pub fn create_generator(settings: LlmSettings) -> GenerateResult<Arc<dyn TextGenerator>> {
    match settings.provider {
        Provider::OpenAi | Provider::Google | Provider::Groq | Provider::Custom => {
            Ok(Arc::new(OpenAiDriver::new(settings)?))
        }
        Provider::Anthropic => Ok(Arc::new(AnthropicDriver::new(settings)?)),
    }
}
