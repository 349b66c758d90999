//! Parley CLI and REST API entry point.
//!
//! Binary name: `parley`
//!
//! Parses CLI arguments, loads configuration, then dispatches to the
//! requested command or starts the HTTP server.

mod cli;
mod http;
mod state;

use clap::Parser;
use console::style;

use parley_core::chat::relay::ChatRelay;
use parley_infra::config::{apply_env_overrides, load_relay_config};
use parley_observe::tracing_setup::{TracingOptions, default_filter, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&TracingOptions {
        filter: default_filter(cli.verbose, cli.quiet).to_string(),
        json: cli.json_logs,
        otel: cli.otel,
    })
    .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let mut config = load_relay_config(&cli.config).await;
    apply_env_overrides(&mut config);

    let result = match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            serve(config, cli.quiet).await
        }
        Commands::Check => cli::check::run_check(&config).await,
        Commands::Chat { session } => match AppState::init(config) {
            Ok(state) => cli::chat::loop_runner::run_chat_loop(&state, session).await,
            Err(e) => Err(e),
        },
    };

    shutdown_tracing();
    result
}

async fn serve(config: parley_types::config::RelayConfig, quiet: bool) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::init(config)?;
    let relay = state.relay.clone();

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    if !quiet {
        println!();
        println!(
            "  {} listening on {}",
            style("Parley").cyan().bold(),
            style(format!("http://{local_addr}")).underlined()
        );
        println!(
            "  {}  {} via {}",
            style("Model:").bold(),
            style(&state.config.model).dim(),
            style(relay.provider_name()).dim()
        );
        println!();
    }
    tracing::info!(addr = %local_addr, "HTTP server started");

    let router = http::router::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(relay))
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then cancel every in-flight turn.
async fn shutdown_signal(relay: ChatRelay) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling in-flight turns");
    relay.shutdown();
}
