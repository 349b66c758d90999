//! HTTP API layer for Parley.
//!
//! Axum routes under `/api/chat` plus `/health` and `/api/info`, with
//! permissive CORS and request tracing.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;

#[cfg(test)]
pub(crate) mod test_support;
