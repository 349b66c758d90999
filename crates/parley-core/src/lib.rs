//! Core relay logic for Parley.
//!
//! This crate defines the `LlmProvider` port that remote provider adapters
//! implement, the in-memory `SessionStore`, and the `ChatRelay` that runs one
//! conversational turn at a time per session. It depends only on
//! `parley-types` -- never on `parley-infra` or any HTTP crate.

pub mod chat;
pub mod llm;
