//! LLM provider implementations.
//!
//! Provides a provider factory ([`create_provider`]) that builds the
//! configured remote provider, and a connection test
//! ([`test_provider_connection`]) for verifying the key and endpoint.

pub mod openai_compat;

use secrecy::SecretString;

use parley_core::llm::box_provider::BoxLlmProvider;
use parley_types::config::RelayConfig;
use parley_types::llm::{CompletionRequest, LlmError, Message};

use self::openai_compat::OpenAiCompatibleProvider;

/// Create a [`BoxLlmProvider`] for the endpoint named in `config`.
pub fn create_provider(config: &RelayConfig, api_key: SecretString) -> BoxLlmProvider {
    let oai_config = openai_compat::config::from_relay_config(config, api_key);
    tracing::debug!(
        provider = %oai_config.provider_name,
        base_url = %oai_config.base_url,
        model = %oai_config.model,
        "Creating LLM provider"
    );
    BoxLlmProvider::new(OpenAiCompatibleProvider::new(oai_config))
}

/// Test provider connectivity by sending a minimal completion request.
///
/// Sends a tiny "Hello" message with a minimal token budget and returns the
/// model's reply.
pub async fn test_provider_connection(provider: &BoxLlmProvider) -> Result<String, LlmError> {
    let request = CompletionRequest {
        model: String::new(), // Provider uses its configured default
        messages: vec![Message::user("Hello")],
        max_tokens: 10,
        temperature: Some(0.0),
        stream: false,
    };
    let response = provider.complete(&request).await?;
    Ok(response.content)
}
