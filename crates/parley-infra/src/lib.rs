//! Infrastructure layer for Parley.
//!
//! Contains the concrete `LlmProvider` implementation that talks to an
//! OpenAI-compatible chat-completions endpoint (DashScope by default) and the
//! loader that turns `parley.toml` plus the environment into a `RelayConfig`.

pub mod config;
pub mod llm;
