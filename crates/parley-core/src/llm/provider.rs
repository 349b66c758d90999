//! LlmProvider trait definition.
//!
//! This is the core abstraction over the remote completion capability.
//! `complete` uses RPITIT; `stream` returns a boxed [`EventStream`] so the
//! trait stays usable behind `BoxLlmProvider`.

use std::pin::Pin;

use futures_util::Stream;

use parley_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StreamEvent,
};

/// Boxed stream of provider events, detached from the provider's lifetime.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// Trait for remote completion backends.
///
/// Implementations live in parley-infra (e.g., `OpenAiCompatibleProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "dashscope", "openai").
    fn name(&self) -> &str;

    /// What this provider supports.
    fn capabilities(&self) -> &ProviderCapabilities;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request. Returns a stream of events.
    ///
    /// Any item may be an error; the stream ends after `StreamEvent::Done`
    /// or after the first error. Dropping the stream abandons the call.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> EventStream;
}
