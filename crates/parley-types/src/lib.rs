//! Shared domain types for Parley.
//!
//! This crate contains the types passed between the relay core, the remote
//! provider adapters, and the HTTP layer: conversation messages, LLM
//! request/stream shapes, chat events and reply payloads, errors, and config.
//!
//! Zero infrastructure dependencies -- only serde, uuid, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
