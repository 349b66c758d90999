//! Relay configuration types for Parley.
//!
//! `RelayConfig` represents the top-level `parley.toml` that controls the
//! listening address, the remote provider endpoint, the system prompt, and
//! turn limits. All fields have sensible defaults.

use serde::{Deserialize, Serialize};

/// Default system prompt: a community property-service assistant.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a professional customer-service assistant for a residential community's \
property management office. You answer residents' questions about regulations, \
services, and the community covenant.

Your responsibilities:
1. Answer questions about property-management laws and regulations
2. Explain how community services are requested and what rules apply
3. Explain the community covenant and management policies
4. Provide friendly, professional, and accurate consultation

Answering guidelines:
- Keep the language concise and easy to understand
- Be friendly and professional
- If you are not sure, say so honestly and suggest contacting a human agent
- Focus on property-service topics";

/// Top-level configuration for the relay.
///
/// Loaded from `parley.toml`. Missing keys fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Interface to bind the HTTP server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the HTTP server to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the OpenAI-compatible chat-completions endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every completion request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the remote API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// System prompt synthesized at the head of every assembled prompt.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: Option<f64>,

    /// Deadline for one remote call in seconds; `0` disables the deadline.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Capacity of the per-turn event channel between the remote call and
    /// the consumer.
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,

    /// Directory of static files served as a fallback, if set and present.
    #[serde(default)]
    pub web_dir: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_base_url() -> String {
    "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string()
}

fn default_model() -> String {
    "qwen-plus".to_string()
}

fn default_api_key_env() -> String {
    "DASHSCOPE_API_KEY".to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_stream_buffer() -> usize {
    32
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            system_prompt: default_system_prompt(),
            max_tokens: default_max_tokens(),
            temperature: None,
            request_timeout_secs: default_request_timeout_secs(),
            stream_buffer: default_stream_buffer(),
            web_dir: None,
        }
    }
}
