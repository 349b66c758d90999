use thiserror::Error;

use crate::llm::LlmError;

/// Errors surfaced by the chat relay.
///
/// Per-turn failures (`Remote`, `Transport`, `Timeout`, `Cancelled`) are
/// carried as values in turn outcomes and terminal stream events; they never
/// abort the request-handling context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// A required setting (such as the remote credential) is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The remote completion capability answered with a non-success status.
    #[error("remote call failed: {code} - {message}")]
    Remote { code: String, message: String },

    /// Communicating with the remote capability failed unexpectedly.
    #[error("service error: {0}")]
    Transport(String),

    #[error("remote call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Explicit lookup of a session id that does not exist.
    #[error("session not found")]
    NotFound,

    /// The caller went away or the relay is shutting down.
    #[error("turn cancelled")]
    Cancelled,
}

impl RelayError {
    /// Short label used as the `kind` field in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Configuration(_) => "configuration",
            RelayError::Remote { .. } => "remote",
            RelayError::Transport(_) => "transport",
            RelayError::Timeout { .. } => "timeout",
            RelayError::NotFound => "not_found",
            RelayError::Cancelled => "cancelled",
        }
    }
}

impl From<LlmError> for RelayError {
    fn from(err: LlmError) -> Self {
        if err.is_transport() {
            return RelayError::Transport(err.to_string());
        }
        match err {
            LlmError::Api { code, message } => RelayError::Remote { code, message },
            other => RelayError::Remote {
                code: other.code().to_string(),
                message: other.to_string(),
            },
        }
    }
}
