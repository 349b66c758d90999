//! Relay configuration loader.
//!
//! Reads `parley.toml` and deserializes it into [`RelayConfig`]. Falls back to
//! defaults when the file is missing or malformed, then applies the `HOST` and
//! `PORT` environment overrides. The remote credential is resolved separately
//! by [`resolve_api_key`] so that commands which never call the provider do
//! not require it.

use std::path::Path;

use secrecy::SecretString;

use parley_types::config::RelayConfig;
use parley_types::error::RelayError;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "parley.toml";

/// Load relay configuration from `path`.
///
/// - If the file does not exist, returns [`RelayConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_relay_config(path: &Path) -> RelayConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            return RelayConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return RelayConfig::default();
        }
    };

    match toml::from_str::<RelayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            RelayConfig::default()
        }
    }
}

/// Apply `HOST` / `PORT` from the process environment.
pub fn apply_env_overrides(config: &mut RelayConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply `HOST` / `PORT` using `lookup` as the environment.
///
/// An unparseable `PORT` is ignored with a warning.
pub fn apply_overrides_from(config: &mut RelayConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("HOST").filter(|h| !h.trim().is_empty()) {
        config.host = host;
    }
    if let Some(port) = lookup("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.port = port,
            Err(err) => tracing::warn!("Ignoring invalid PORT '{port}': {err}"),
        }
    }
}

/// Read the remote API key from the variable named by `config.api_key_env`.
pub fn resolve_api_key(config: &RelayConfig) -> Result<SecretString, RelayError> {
    resolve_api_key_from(config, |key| std::env::var(key).ok())
}

/// Like [`resolve_api_key`] with an explicit environment lookup.
///
/// A missing or blank value is a `Configuration` error.
pub fn resolve_api_key_from(
    config: &RelayConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, RelayError> {
    match lookup(&config.api_key_env) {
        Some(key) if !key.trim().is_empty() => Ok(SecretString::from(key.trim().to_string())),
        _ => Err(RelayError::Configuration(format!(
            "environment variable {} is not set",
            config.api_key_env
        ))),
    }
}
