//! CLI command definitions for the `parley` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;
pub mod check;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use parley_infra::config::DEFAULT_CONFIG_FILE;

/// Session-scoped chat relay for an OpenAI-compatible LLM endpoint.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, env = "PARLEY_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Emit logs as newline-delimited JSON.
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Interface to bind (overrides config and HOST).
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config and PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send a minimal completion to verify the API key and endpoint.
    Check,

    /// Chat with the assistant in the terminal.
    Chat {
        /// Session id to use; a new session is created if omitted.
        #[arg(long)]
        session: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from(["parley", "serve", "--host", "127.0.0.1", "-p", "9000"])
            .unwrap();
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["parley", "chat", "-vv", "--json-logs", "--session", "abc"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.json_logs);
        assert!(matches!(cli.command, Commands::Chat { session: Some(ref s) } if s == "abc"));
    }

    #[test]
    fn test_explicit_config_path() {
        let cli = Cli::try_parse_from(["parley", "--config", "/etc/parley.toml", "check"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/parley.toml"));
        assert!(matches!(cli.command, Commands::Check));
    }
}
