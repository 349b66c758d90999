//! Application state shared by the HTTP handlers and CLI commands.

use std::sync::Arc;

use parley_core::chat::relay::{ChatRelay, RelaySettings};
use parley_core::llm::box_provider::BoxLlmProvider;
use parley_infra::config::resolve_api_key;
use parley_infra::llm::create_provider;
use parley_types::config::RelayConfig;

/// Shared application state.
///
/// Cheap to clone: the relay and config are reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub relay: ChatRelay,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    pub fn new(provider: BoxLlmProvider, config: RelayConfig) -> Self {
        let relay = ChatRelay::new(provider, RelaySettings::from_config(&config));
        Self {
            relay,
            config: Arc::new(config),
        }
    }

    /// Resolve the API key and wire the remote provider into a relay.
    ///
    /// Fails with a configuration error when the key is absent.
    pub fn init(config: RelayConfig) -> anyhow::Result<Self> {
        let api_key = resolve_api_key(&config)?;
        let provider = create_provider(&config, api_key);
        tracing::info!(
            provider = provider.name(),
            model = %config.model,
            "Chat relay initialized"
        );
        Ok(Self::new(provider, config))
    }
}
