//! ChatRelay: runs conversational turns against the remote provider.
//!
//! Every turn runs on its own task and feeds a bounded channel. The streaming
//! entry point hands that channel to the caller as a [`TurnStream`]; the
//! blocking entry point drains it. Turns on the same session queue behind one
//! another, turns on different sessions proceed independently.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use parley_types::chat::{ChatEvent, Message, SessionId, TurnReply};
use parley_types::config::RelayConfig;
use parley_types::error::RelayError;
use parley_types::llm::{ProviderCapabilities, StreamEvent};

use super::prompt::build_request;
use super::store::SessionStore;
use super::turn::{TurnPhase, TurnStream};
use crate::llm::box_provider::BoxLlmProvider;

/// Per-turn settings derived from [`RelayConfig`].
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    /// Deadline for the remote call; `None` waits indefinitely. Time spent
    /// waiting on a slow consumer is not counted.
    pub request_timeout: Option<Duration>,
    /// Capacity of the per-turn event channel.
    pub stream_buffer: usize,
}

impl RelaySettings {
    pub fn from_config(config: &RelayConfig) -> Self {
        let request_timeout = match config.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            request_timeout,
            stream_buffer: config.stream_buffer.max(1),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

/// Result of a blocking turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed { session_id: SessionId, reply: String },
    Failed { session_id: SessionId, error: String },
}

impl TurnOutcome {
    pub fn session_id(&self) -> &SessionId {
        match self {
            TurnOutcome::Completed { session_id, .. } | TurnOutcome::Failed { session_id, .. } => {
                session_id
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TurnOutcome::Completed { .. })
    }

    pub fn into_reply(self) -> TurnReply {
        match self {
            TurnOutcome::Completed { session_id, reply } => TurnReply::completed(session_id, reply),
            TurnOutcome::Failed { session_id, error } => TurnReply::failed(session_id, error),
        }
    }
}

/// Stateless turn orchestrator over a shared [`SessionStore`].
///
/// Cheap to clone: all clones share the store, provider, and shutdown token.
#[derive(Clone)]
pub struct ChatRelay {
    store: Arc<SessionStore>,
    provider: Arc<BoxLlmProvider>,
    settings: Arc<RelaySettings>,
    shutdown: CancellationToken,
}

impl ChatRelay {
    pub fn new(provider: BoxLlmProvider, settings: RelaySettings) -> Self {
        Self {
            store: Arc::new(SessionStore::new()),
            provider: Arc::new(provider),
            settings: Arc::new(settings),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Limits advertised by the remote provider.
    pub fn capabilities(&self) -> &ProviderCapabilities {
        self.provider.capabilities()
    }

    /// Allocate a new, empty session.
    pub fn create_session(&self) -> SessionId {
        self.store.create()
    }

    /// Full history of a session, or `NotFound`.
    pub fn history(&self, session_id: &SessionId) -> Result<Vec<Message>, RelayError> {
        self.store.history(session_id)
    }

    pub fn delete_session(&self, session_id: &SessionId) -> bool {
        self.store.delete(session_id)
    }

    pub fn clear_session(&self, session_id: &SessionId) -> bool {
        self.store.clear(session_id)
    }

    /// Cancel every in-flight turn. Turns started afterwards fail immediately.
    pub fn shutdown(&self) {
        info!("Chat relay shutting down");
        self.shutdown.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Start a streaming turn.
    ///
    /// With no session id a new one is generated; the session only appears
    /// in the store once the turn succeeds. Must be called within a tokio
    /// runtime.
    pub fn stream_turn(
        &self,
        session_id: Option<SessionId>,
        user_text: impl Into<String>,
    ) -> TurnStream {
        let session_id = session_id.unwrap_or_else(SessionId::generate);
        let (tx, rx) = mpsc::channel(self.settings.stream_buffer.max(1));
        let cancel = self.shutdown.child_token();

        let driver = TurnDriver {
            store: self.store.clone(),
            provider: self.provider.clone(),
            settings: self.settings.clone(),
            session_id: session_id.clone(),
            user_text: user_text.into(),
            tx,
            cancel: cancel.clone(),
        };
        let span = info_span!("turn", session_id = %session_id);
        tokio::spawn(driver.run().instrument(span));

        TurnStream::new(session_id, ReceiverStream::new(rx), cancel.drop_guard())
    }

    /// Run a turn to completion and return the full reply or the error.
    pub async fn turn(
        &self,
        session_id: Option<SessionId>,
        user_text: impl Into<String>,
    ) -> TurnOutcome {
        let mut stream = self.stream_turn(session_id, user_text);
        let mut reply = String::new();

        while let Some(event) = stream.next().await {
            match event {
                ChatEvent::Chunk { content } => reply.push_str(&content),
                ChatEvent::Done { session_id } => {
                    return TurnOutcome::Completed { session_id, reply };
                }
                ChatEvent::Error { error } => {
                    return TurnOutcome::Failed {
                        session_id: stream.session_id().clone(),
                        error,
                    };
                }
            }
        }

        TurnOutcome::Failed {
            session_id: stream.session_id().clone(),
            error: RelayError::Cancelled.to_string(),
        }
    }
}

impl std::fmt::Debug for ChatRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRelay")
            .field("provider", &self.provider.name())
            .field("sessions", &self.store.len())
            .finish()
    }
}

/// Everything one turn's producer task owns.
struct TurnDriver {
    store: Arc<SessionStore>,
    provider: Arc<BoxLlmProvider>,
    settings: Arc<RelaySettings>,
    session_id: SessionId,
    user_text: String,
    tx: mpsc::Sender<ChatEvent>,
    cancel: CancellationToken,
}

impl TurnDriver {
    async fn run(self) {
        let mut phase = TurnPhase::Assembling;

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RelayError::Cancelled),
            result = self.drive(&mut phase) => result,
        };

        let err = match result {
            Ok(()) => return,
            // Already committed; only the done event was lost.
            Err(_) if phase.is_terminal() => return,
            Err(err) => err,
        };
        phase.advance(TurnPhase::Failed, &self.session_id);

        match &err {
            RelayError::Cancelled => {
                debug!(kind = err.kind(), "Turn cancelled");
                return;
            }
            RelayError::Transport(_) => error!(kind = err.kind(), error = %err, "Turn failed"),
            _ => warn!(kind = err.kind(), error = %err, "Turn failed"),
        }

        let _ = self
            .tx
            .send(ChatEvent::Error {
                error: err.to_string(),
            })
            .await;
    }

    async fn drive(&self, phase: &mut TurnPhase) -> Result<(), RelayError> {
        let id = &self.session_id;
        let _turn = self.store.lock_turn(id).await;

        let history = self.store.history_or_empty(id);
        let request = build_request(&self.settings, &history, &self.user_text);
        debug!(history_len = history.len(), "Prompt assembled");

        phase.advance(TurnPhase::AwaitingRemote, id);
        let timeout = self.settings.request_timeout;
        let mut deadline = timeout.map(|d| Instant::now() + d);
        let mut remote = self.provider.stream(request);
        let mut reply = String::new();

        loop {
            let next = match deadline {
                Some(at) => tokio::time::timeout_at(at, remote.next())
                    .await
                    .map_err(|_| RelayError::Timeout {
                        secs: timeout.map(|d| d.as_secs()).unwrap_or_default(),
                    })?,
                None => remote.next().await,
            };

            match next {
                Some(Ok(StreamEvent::TextDelta { text })) => {
                    if text.is_empty() {
                        continue;
                    }
                    if *phase == TurnPhase::AwaitingRemote {
                        phase.advance(TurnPhase::StreamingChunks, id);
                    }
                    reply.push_str(&text);
                    let blocked_since = Instant::now();
                    self.tx
                        .send(ChatEvent::Chunk { content: text })
                        .await
                        .map_err(|_| RelayError::Cancelled)?;
                    if let Some(at) = deadline.as_mut() {
                        *at += blocked_since.elapsed();
                    }
                    tokio::task::yield_now().await;
                }
                Some(Ok(StreamEvent::Usage(usage))) => {
                    debug!(
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        "Remote usage"
                    );
                }
                Some(Ok(StreamEvent::Done)) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
            }
        }
        drop(remote);

        if self.tx.is_closed() || self.cancel.is_cancelled() {
            return Err(RelayError::Cancelled);
        }

        phase.advance(TurnPhase::Finalizing, id);
        let reply_len = reply.len();
        self.store.append_turn(id, self.user_text.clone(), reply);
        phase.advance(TurnPhase::Done, id);
        info!(reply_len, "Turn completed");

        let _ = self
            .tx
            .send(ChatEvent::Done {
                session_id: id.clone(),
            })
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::{ScriptedProvider, Step};
    use parley_types::llm::LlmError;
    use std::future::Future;
    use tokio::sync::Notify;

    fn settings() -> RelaySettings {
        RelaySettings {
            system_prompt: "sys".to_string(),
            ..RelaySettings::default()
        }
    }

    fn relay_with(provider: &ScriptedProvider, settings: RelaySettings) -> ChatRelay {
        ChatRelay::new(BoxLlmProvider::new(provider.clone()), settings)
    }

    async fn collect(stream: TurnStream) -> Vec<ChatEvent> {
        tokio::time::timeout(Duration::from_secs(5), stream.collect())
            .await
            .expect("turn stream did not finish")
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        let wait = async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("condition not reached");
    }

    async fn within<T>(fut: impl Future<Output = T>) -> T {
        tokio::time::timeout(Duration::from_secs(5), fut)
            .await
            .expect("timed out")
    }

    fn chunk(s: &str) -> ChatEvent {
        ChatEvent::Chunk {
            content: s.to_string(),
        }
    }

    #[tokio::test]
    async fn test_turn_commits_user_and_assistant() {
        let provider = ScriptedProvider::new();
        provider.push_script(vec![Step::delta("hi "), Step::delta("there")]);
        let relay = relay_with(&provider, settings());
        let id = relay.create_session();

        let outcome = relay.turn(Some(id.clone()), "hello").await;

        assert_eq!(
            outcome.clone().into_reply(),
            TurnReply::completed(id.clone(), "hi there".to_string())
        );
        assert!(outcome.is_success());
        assert_eq!(
            relay.history(&id).unwrap(),
            vec![Message::user("hello"), Message::assistant("hi there")]
        );
    }

    #[tokio::test]
    async fn test_history_grows_by_two_per_successful_turn() {
        let provider = ScriptedProvider::new();
        let relay = relay_with(&provider, settings());
        let id = relay.create_session();

        for i in 0..3 {
            let outcome = relay.turn(Some(id.clone()), format!("q{i}")).await;
            assert!(outcome.is_success());
        }
        let history = relay.history(&id).unwrap();
        assert_eq!(history.len(), 6);
        assert_eq!(history[0], Message::user("q0"));
        assert_eq!(history[4], Message::user("q2"));

        provider.push_script(vec![Step::api_error("InternalError", "boom")]);
        let outcome = relay.turn(Some(id.clone()), "q3").await;
        assert!(!outcome.is_success());
        assert_eq!(relay.history(&id).unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_discards_partial_reply() {
        let provider = ScriptedProvider::new();
        provider.push_script(vec![
            Step::delta("Hel"),
            Step::delta("lo"),
            Step::api_error("InternalError", "upstream reset"),
        ]);
        let relay = relay_with(&provider, settings());
        let id = relay.create_session();

        let events = collect(relay.stream_turn(Some(id.clone()), "hello")).await;

        assert_eq!(
            events,
            vec![
                chunk("Hel"),
                chunk("lo"),
                ChatEvent::Error {
                    error: "remote call failed: InternalError - upstream reset".to_string()
                },
            ]
        );
        assert!(relay.history(&id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_before_any_chunk() {
        let provider = ScriptedProvider::new();
        provider.push_script(vec![Step::Fail(LlmError::Transport(
            "connection refused".to_string(),
        ))]);
        let relay = relay_with(&provider, settings());
        let id = relay.create_session();

        let events = collect(relay.stream_turn(Some(id.clone()), "hello")).await;

        let expected = RelayError::from(LlmError::Transport("connection refused".to_string()));
        assert_eq!(
            events,
            vec![ChatEvent::Error {
                error: expected.to_string()
            }]
        );
        assert!(relay.history(&id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stream_ends_with_done_after_chunks() {
        let provider = ScriptedProvider::new();
        provider.push_script(vec![Step::delta("a"), Step::delta(""), Step::delta("b")]);
        let relay = relay_with(&provider, settings());
        let id = relay.create_session();

        let events = collect(relay.stream_turn(Some(id.clone()), "x")).await;

        assert_eq!(
            events,
            vec![chunk("a"), chunk("b"), ChatEvent::Done { session_id: id }]
        );
    }

    #[tokio::test]
    async fn test_unknown_session_starts_with_empty_history() {
        let provider = ScriptedProvider::new();
        let relay = relay_with(&provider, settings());
        let id = SessionId::from("client-chosen");

        let outcome = relay.turn(Some(id.clone()), "hello").await;
        assert!(outcome.is_success());

        let requests = provider.requests();
        assert_eq!(
            requests[0].messages,
            vec![Message::system("sys"), Message::user("hello")]
        );
        assert_eq!(relay.history(&id).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_second_turn_sees_first_exchange() {
        let provider = ScriptedProvider::new();
        provider.push_script(vec![Step::delta("hi there")]);
        provider.push_script(vec![Step::delta("fine")]);
        let relay = relay_with(&provider, settings());
        let id = relay.create_session();

        relay.turn(Some(id.clone()), "hello").await;
        relay.turn(Some(id.clone()), "how are you").await;

        let second = &provider.requests()[1];
        assert_eq!(
            second.messages,
            vec![
                Message::system("sys"),
                Message::user("hello"),
                Message::assistant("hi there"),
                Message::user("how are you"),
            ]
        );
    }

    #[tokio::test]
    async fn test_sessions_do_not_see_each_other() {
        let provider = ScriptedProvider::new();
        let relay = relay_with(&provider, settings());
        let a = relay.create_session();
        let b = relay.create_session();

        relay.turn(Some(a.clone()), "for a").await;
        relay.turn(Some(b.clone()), "for b").await;

        assert_eq!(relay.history(&a).unwrap()[0], Message::user("for a"));
        assert_eq!(relay.history(&b).unwrap()[0], Message::user("for b"));
        assert_eq!(provider.requests()[1].messages.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_turns_on_same_session_are_serialized() {
        let provider = ScriptedProvider::new();
        let gate = Arc::new(Notify::new());
        provider.push_script(vec![Step::WaitFor(gate.clone()), Step::delta("first")]);
        provider.push_script(vec![Step::delta("second")]);
        let relay = relay_with(&provider, settings());
        let id = relay.create_session();

        let first = tokio::spawn({
            let relay = relay.clone();
            let id = id.clone();
            async move { relay.turn(Some(id), "one").await }
        });
        eventually(|| provider.requests().len() == 1).await;

        let second = tokio::spawn({
            let relay = relay.clone();
            let id = id.clone();
            async move { relay.turn(Some(id), "two").await }
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(provider.requests().len(), 1, "second turn must queue");

        gate.notify_one();
        assert!(within(first).await.unwrap().is_success());
        assert!(within(second).await.unwrap().is_success());

        assert_eq!(
            relay.history(&id).unwrap(),
            vec![
                Message::user("one"),
                Message::assistant("first"),
                Message::user("two"),
                Message::assistant("second"),
            ]
        );
        assert_eq!(provider.requests()[1].messages.len(), 4);
    }

    #[tokio::test]
    async fn test_stalled_session_does_not_block_others() {
        let provider = ScriptedProvider::new();
        provider.push_script(vec![Step::Stall]);
        let relay = relay_with(&provider, settings());
        let a = relay.create_session();
        let b = relay.create_session();

        let _stalled = relay.stream_turn(Some(a.clone()), "stuck");
        eventually(|| provider.requests().len() == 1).await;

        let outcome = within(relay.turn(Some(b.clone()), "hello")).await;
        assert!(outcome.is_success());
        assert!(relay.history(&a).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dropping_stream_cancels_turn() {
        let provider = ScriptedProvider::new();
        provider.push_script(vec![Step::delta("partial"), Step::Stall]);
        let relay = relay_with(&provider, settings());
        let id = relay.create_session();

        let mut stream = relay.stream_turn(Some(id.clone()), "hello");
        assert_eq!(within(stream.next()).await, Some(chunk("partial")));
        drop(stream);

        eventually(|| provider.released_streams() == 1).await;
        assert!(relay.history(&id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stalled_remote_times_out() {
        let provider = ScriptedProvider::new();
        provider.push_script(vec![Step::Stall]);
        let relay = relay_with(
            &provider,
            RelaySettings {
                request_timeout: Some(Duration::from_millis(50)),
                ..settings()
            },
        );
        let id = relay.create_session();

        let events = collect(relay.stream_turn(Some(id.clone()), "hello")).await;

        assert_eq!(
            events,
            vec![ChatEvent::Error {
                error: RelayError::Timeout { secs: 0 }.to_string()
            }]
        );
        assert!(relay.history(&id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_producer_waits_for_slow_consumer() {
        let provider = ScriptedProvider::new();
        provider.push_script((0..20).map(|i| Step::Delta(format!("d{i} "))).collect());
        let relay = relay_with(
            &provider,
            RelaySettings {
                stream_buffer: 1,
                ..settings()
            },
        );

        let mut stream = relay.stream_turn(None, "hello");
        assert_eq!(within(stream.next()).await, Some(chunk("d0 ")));
        tokio::time::sleep(Duration::from_millis(50)).await;

        // One chunk sits in the channel and one is held by the blocked send.
        assert!(
            provider.delivered_deltas() <= 3,
            "producer ran ahead: {} deltas pulled",
            provider.delivered_deltas()
        );
        assert_eq!(provider.released_streams(), 0);

        let rest = collect(stream).await;
        assert_eq!(rest.len(), 20);
        assert!(matches!(rest.last(), Some(ChatEvent::Done { .. })));
        assert_eq!(provider.delivered_deltas(), 20);
    }

    #[tokio::test]
    async fn test_slow_consumer_does_not_count_against_deadline() {
        let provider = ScriptedProvider::new();
        let mut steps: Vec<Step> = ["a", "b", "c", "d", "e"].into_iter().map(Step::delta).collect();
        steps.push(Step::Pause(Duration::from_millis(30)));
        steps.push(Step::delta("f"));
        provider.push_script(steps);
        let relay = relay_with(
            &provider,
            RelaySettings {
                request_timeout: Some(Duration::from_millis(100)),
                stream_buffer: 1,
                ..settings()
            },
        );
        let id = relay.create_session();

        let mut stream = relay.stream_turn(Some(id.clone()), "hello");
        let mut events = Vec::new();
        while let Some(event) = within(stream.next()).await {
            events.push(event);
            tokio::time::sleep(Duration::from_millis(60)).await;
        }

        assert_eq!(events.last(), Some(&ChatEvent::Done { session_id: id.clone() }));
        assert_eq!(relay.history(&id).unwrap()[1].content, "abcdef");
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_turn() {
        let provider = ScriptedProvider::new();
        provider.push_script(vec![Step::Stall]);
        let relay = relay_with(&provider, settings());
        let id = relay.create_session();

        let stream = relay.stream_turn(Some(id.clone()), "hello");
        eventually(|| provider.requests().len() == 1).await;
        relay.shutdown();

        let events = collect(stream).await;
        assert_eq!(
            events,
            vec![ChatEvent::Error {
                error: "turn cancelled".to_string()
            }]
        );
        assert!(relay.is_shutting_down());
        assert!(relay.history(&id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_session_id_is_generated() {
        let provider = ScriptedProvider::new();
        let relay = relay_with(&provider, settings());

        let outcome = relay.turn(None, "hello").await;
        assert!(outcome.is_success());
        assert!(relay.store().contains(outcome.session_id()));

        provider.push_script(vec![Step::api_error("InvalidApiKey", "bad key")]);
        let failed = relay.turn(None, "hello").await;
        assert!(!failed.is_success());
        assert!(!relay.store().contains(failed.session_id()));
        assert_ne!(failed.session_id(), outcome.session_id());
    }

    #[test]
    fn test_settings_from_config() {
        let config = RelayConfig {
            request_timeout_secs: 0,
            stream_buffer: 0,
            ..RelayConfig::default()
        };
        let settings = RelaySettings::from_config(&config);
        assert!(settings.request_timeout.is_none());
        assert_eq!(settings.stream_buffer, 1);
        assert_eq!(
            RelaySettings::default().request_timeout,
            Some(Duration::from_secs(120))
        );
    }
}
