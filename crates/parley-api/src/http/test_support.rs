//! In-memory provider and app builder for handler tests.

use parley_core::llm::box_provider::BoxLlmProvider;
use parley_core::llm::provider::{EventStream, LlmProvider};
use parley_types::config::RelayConfig;
use parley_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, ProviderCapabilities,
    StopReason, StreamEvent, Usage,
};

use crate::state::AppState;

/// Replies `"echo: <message>"`; a user message of `"fail"` yields an API error.
pub(crate) struct EchoProvider {
    capabilities: ProviderCapabilities,
}

impl EchoProvider {
    pub(crate) fn new() -> Self {
        Self {
            capabilities: ProviderCapabilities {
                streaming: true,
                max_context_tokens: 8_000,
                max_output_tokens: 1_000,
            },
        }
    }

    fn last_user_message(request: &CompletionRequest) -> String {
        request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    fn rejection() -> LlmError {
        LlmError::Api {
            code: "InvalidParameter".to_string(),
            message: "bad input".to_string(),
        }
    }
}

impl LlmProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let text = Self::last_user_message(request);
        if text == "fail" {
            return Err(Self::rejection());
        }
        Ok(CompletionResponse {
            id: "echo-1".to_string(),
            content: format!("echo: {text}"),
            model: request.model.clone(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        })
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        let text = Self::last_user_message(&request);
        let events = if text == "fail" {
            vec![Ok(StreamEvent::Connected), Err(Self::rejection())]
        } else {
            vec![
                Ok(StreamEvent::Connected),
                Ok(StreamEvent::TextDelta {
                    text: "echo: ".to_string(),
                }),
                Ok(StreamEvent::TextDelta { text }),
                Ok(StreamEvent::Done),
            ]
        };
        Box::pin(futures_util::stream::iter(events))
    }
}

pub(crate) fn test_state() -> AppState {
    AppState::new(BoxLlmProvider::new(EchoProvider::new()), RelayConfig::default())
}
