//! Configuration for the OpenAI-compatible provider.

use secrecy::SecretString;

use parley_types::config::RelayConfig;
use parley_types::llm::ProviderCapabilities;

/// DashScope's OpenAI-compatible endpoint.
pub const DASHSCOPE_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Configuration for an OpenAI-compatible LLM provider.
///
/// Used to construct an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "dashscope").
    pub provider_name: String,
    pub base_url: String,
    pub api_key: SecretString,
    /// Default model, used when a request leaves the model empty.
    pub model: String,
    pub capabilities: ProviderCapabilities,
}

/// DashScope (Qwen) default configuration.
pub fn dashscope_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "dashscope".into(),
        base_url: DASHSCOPE_BASE_URL.into(),
        api_key,
        model: model.into(),
        capabilities: ProviderCapabilities {
            streaming: true,
            max_context_tokens: 131_072,
            max_output_tokens: 8_192,
        },
    }
}

/// Configuration for whatever endpoint `parley.toml` points at.
pub fn from_relay_config(config: &RelayConfig, api_key: SecretString) -> OpenAiCompatConfig {
    let mut oai = dashscope_defaults(api_key, &config.model);
    if config.base_url.trim_end_matches('/') != DASHSCOPE_BASE_URL {
        oai.provider_name = provider_name_for(&config.base_url);
        oai.base_url = config.base_url.clone();
    }
    oai.capabilities.max_output_tokens = oai.capabilities.max_output_tokens.max(config.max_tokens);
    oai
}

/// Best-effort provider label derived from the endpoint host.
fn provider_name_for(base_url: &str) -> String {
    let host = base_url
        .split("://")
        .nth(1)
        .unwrap_or(base_url)
        .split(['/', ':'])
        .next()
        .unwrap_or_default();
    match host {
        h if h.contains("dashscope") => "dashscope".into(),
        h if h.contains("openai.com") => "openai".into(),
        "" => "openai_compat".into(),
        h => h.to_string(),
    }
}
