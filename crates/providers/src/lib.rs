//! Model provider implementations for studybot.
//!
//! Every provider implements `studybot_core::Provider`. The only backend is
//! the OpenAI-compatible one, which also covers Ollama's `/v1` endpoint.

pub mod openai_compat;

use std::sync::Arc;
use studybot_config::ProviderConfig;
use studybot_core::error::ProviderError;
use studybot_core::provider::Provider;

pub use openai_compat::OpenAiCompatProvider;

/// Build the configured provider.
pub fn build_from_config(config: &ProviderConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config.api_key.clone().unwrap_or_else(|| config.name.clone());
    let provider = OpenAiCompatProvider::new(&config.name, &config.api_url, api_key)?;
    Ok(Arc::new(provider))
}
