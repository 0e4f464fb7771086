//! LLM integration.
//!
//! The classifier talks to an [`LlmProvider`]; production wires in
//! [`OpenAiCompatProvider`], tests wire in canned responders.

pub mod openai_compat;
pub mod provider;

pub use openai_compat::OpenAiCompatProvider;
pub use provider::*;

use std::sync::Arc;

use crate::config::LlmConfig;

/// Create the classification provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Arc<dyn LlmProvider> {
    tracing::info!(
        "Using OpenAI-compatible endpoint {} (model: {})",
        config.api_base,
        config.model
    );
    Arc::new(OpenAiCompatProvider::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_provider_uses_configured_model() {
        let config = LlmConfig {
            api_base: "https://api.perplexity.ai".to_string(),
            api_key: secrecy::SecretString::from("pplx-test"),
            model: "llama-3.1-sonar-large-128k-online".to_string(),
        };
        let provider = create_provider(&config);
        assert_eq!(provider.model_name(), "llama-3.1-sonar-large-128k-online");
    }
}
