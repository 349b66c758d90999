//! Scripted in-memory provider for driving the relay in tests.
//!
//! Each call to `stream`/`complete` consumes the next queued script. A script
//! is a list of steps: text deltas, a failure, a stall that never resolves,
//! or a wait on a `Notify` gate. Requests are recorded so tests can inspect
//! the assembled prompt.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use parley_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason,
    StreamEvent, Usage,
};

use super::provider::{EventStream, LlmProvider};

pub(crate) enum Step {
    Delta(String),
    Fail(LlmError),
    Stall,
    /// A slow remote: sleep before the next step.
    Pause(Duration),
    WaitFor(Arc<Notify>),
}

impl Step {
    pub(crate) fn delta(text: &str) -> Self {
        Step::Delta(text.to_string())
    }

    pub(crate) fn api_error(code: &str, message: &str) -> Self {
        Step::Fail(LlmError::Api {
            code: code.to_string(),
            message: message.to_string(),
        })
    }
}

/// Increments a counter when the owning remote stream is dropped.
struct DropTracker(Arc<AtomicUsize>);

impl Drop for DropTracker {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Cloning shares the script queue, request log, and counters.
#[derive(Clone)]
pub(crate) struct ScriptedProvider {
    scripts: Arc<Mutex<VecDeque<Vec<Step>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    released_streams: Arc<AtomicUsize>,
    delivered_deltas: Arc<AtomicUsize>,
    capabilities: ProviderCapabilities,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            released_streams: Arc::new(AtomicUsize::new(0)),
            delivered_deltas: Arc::new(AtomicUsize::new(0)),
            capabilities: ProviderCapabilities {
                streaming: true,
                max_context_tokens: 32_000,
                max_output_tokens: 2_048,
            },
        }
    }

    /// Queue the script for the next call. Unscripted calls reply "ok".
    pub(crate) fn push_script(&self, steps: Vec<Step>) {
        self.scripts.lock().unwrap().push_back(steps);
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of remote streams that have been dropped (finished or abandoned).
    pub(crate) fn released_streams(&self) -> usize {
        self.released_streams.load(Ordering::SeqCst)
    }

    /// Text deltas pulled out of remote streams so far.
    pub(crate) fn delivered_deltas(&self) -> usize {
        self.delivered_deltas.load(Ordering::SeqCst)
    }

    fn next_script(&self, request: CompletionRequest) -> Vec<Step> {
        self.requests.lock().unwrap().push(request);
        self.scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| vec![Step::delta("ok")])
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let steps = self.next_script(request.clone());
        let mut content = String::new();
        for step in steps {
            match step {
                Step::Delta(text) => content.push_str(&text),
                Step::Fail(err) => return Err(err),
                Step::Stall => std::future::pending::<()>().await,
                Step::Pause(d) => tokio::time::sleep(d).await,
                Step::WaitFor(gate) => gate.notified().await,
            }
        }
        Ok(CompletionResponse {
            id: "scripted-1".to_string(),
            content,
            model: request.model.clone(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        })
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        let steps = self.next_script(request);
        let tracker = DropTracker(self.released_streams.clone());
        let delivered = self.delivered_deltas.clone();

        Box::pin(async_stream::stream! {
            let _tracker = tracker;
            yield Ok(StreamEvent::Connected);
            for step in steps {
                match step {
                    Step::Delta(text) => {
                        delivered.fetch_add(1, Ordering::SeqCst);
                        yield Ok(StreamEvent::TextDelta { text });
                    }
                    Step::Fail(err) => {
                        yield Err(err);
                        return;
                    }
                    Step::Stall => std::future::pending::<()>().await,
                    Step::Pause(d) => tokio::time::sleep(d).await,
                    Step::WaitFor(gate) => gate.notified().await,
                }
            }
            yield Ok(StreamEvent::MessageDelta { stop_reason: StopReason::EndTurn });
            yield Ok(StreamEvent::Done);
        })
    }
}
