//! `parley check` -- verify the remote provider is reachable.

use std::time::{Duration, Instant};

use console::style;

use parley_infra::config::resolve_api_key;
use parley_infra::llm::{create_provider, test_provider_connection};
use parley_types::config::RelayConfig;

use super::chat::spinner;

/// Send a tiny completion through the configured provider and report the result.
pub async fn run_check(config: &RelayConfig) -> anyhow::Result<()> {
    let api_key = resolve_api_key(config)?;
    let provider = create_provider(config, api_key);

    println!();
    println!(
        "  {} {} at {}",
        style("Checking").bold(),
        style(provider.name()).cyan(),
        style(&config.base_url).dim()
    );

    let progress = spinner("waiting for reply...");
    let started = Instant::now();
    let result = tokio::time::timeout(Duration::from_secs(30), test_provider_connection(&provider)).await;
    progress.finish_and_clear();

    match result {
        Ok(Ok(reply)) => {
            println!(
                "  {} {} replied in {}ms: {}",
                style("✓").green(),
                style(&config.model).cyan(),
                started.elapsed().as_millis(),
                style(reply.trim()).dim()
            );
            println!();
            Ok(())
        }
        Ok(Err(e)) => {
            println!("  {} {e}", style("✗").red());
            println!();
            Err(e.into())
        }
        Err(_) => {
            println!("  {} no reply within 30s", style("✗").red());
            println!();
            anyhow::bail!("connection check timed out")
        }
    }
}
