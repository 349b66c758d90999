//! Prompt assembly for a single turn.

use parley_types::chat::Message;
use parley_types::llm::CompletionRequest;

use super::relay::RelaySettings;

/// Build the ordered message list sent to the remote capability:
/// the system prompt, the session history, then the new user message.
pub fn assemble_prompt(system_prompt: &str, history: &[Message], user_text: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system_prompt));
    messages.extend_from_slice(history);
    messages.push(Message::user(user_text));
    messages
}

/// Wrap an assembled prompt into a streaming completion request.
pub fn build_request(
    settings: &RelaySettings,
    history: &[Message],
    user_text: &str,
) -> CompletionRequest {
    CompletionRequest {
        model: settings.model.clone(),
        messages: assemble_prompt(&settings.system_prompt, history, user_text),
        max_tokens: settings.max_tokens,
        temperature: settings.temperature,
        stream: true,
    }
}
