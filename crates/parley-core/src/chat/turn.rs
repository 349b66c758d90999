//! Per-turn state machine and the consumer-facing event stream.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use pin_project_lite::pin_project;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::DropGuard;
use tracing::debug;

use parley_types::chat::{ChatEvent, SessionId};
use parley_types::error::RelayError;

/// Lifecycle of a single turn.
///
/// `Done` and `Failed` are terminal. Any live phase may fail, since a turn
/// can be cancelled at any suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Reading history and building the prompt.
    Assembling,
    /// Remote call issued, no delta received yet.
    AwaitingRemote,
    StreamingChunks,
    /// Committing the user/assistant pair to history.
    Finalizing,
    Done,
    Failed,
}

impl TurnPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, TurnPhase::Done | TurnPhase::Failed)
    }

    pub fn can_advance_to(self, next: TurnPhase) -> bool {
        use TurnPhase::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Assembling, AwaitingRemote) => true,
            (AwaitingRemote, StreamingChunks | Finalizing) => true,
            (StreamingChunks, Finalizing) => true,
            (Finalizing, Done) => true,
            _ => false,
        }
    }

    /// Move to `next`, logging the transition.
    pub(crate) fn advance(&mut self, next: TurnPhase, session_id: &SessionId) {
        debug_assert!(
            self.can_advance_to(next),
            "invalid turn transition {self} -> {next}"
        );
        debug!(session_id = %session_id, from = %self, to = %next, "Turn phase");
        *self = next;
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnPhase::Assembling => "assembling",
            TurnPhase::AwaitingRemote => "awaiting_remote",
            TurnPhase::StreamingChunks => "streaming_chunks",
            TurnPhase::Finalizing => "finalizing",
            TurnPhase::Done => "done",
            TurnPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

pin_project! {
    /// Events of one streaming turn: zero or more chunks, then exactly one
    /// `Done` or `Error`.
    ///
    /// Dropping the stream cancels the turn; nothing is committed to history.
    pub struct TurnStream {
        session_id: SessionId,
        #[pin]
        events: ReceiverStream<ChatEvent>,
        _cancel_on_drop: DropGuard,
        finished: bool,
    }
}

impl TurnStream {
    pub(crate) fn new(
        session_id: SessionId,
        events: ReceiverStream<ChatEvent>,
        cancel_on_drop: DropGuard,
    ) -> Self {
        Self {
            session_id,
            events,
            _cancel_on_drop: cancel_on_drop,
            finished: false,
        }
    }

    /// Session this turn belongs to (generated if the caller supplied none).
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }
}

impl Stream for TurnStream {
    type Item = ChatEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ChatEvent>> {
        let this = self.project();
        if *this.finished {
            return Poll::Ready(None);
        }
        match this.events.poll_next(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    *this.finished = true;
                }
                Poll::Ready(Some(event))
            }
            // Producer stopped without a terminal event (shutdown).
            Poll::Ready(None) => {
                *this.finished = true;
                Poll::Ready(Some(ChatEvent::Error {
                    error: RelayError::Cancelled.to_string(),
                }))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl fmt::Debug for TurnStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnStream")
            .field("session_id", &self.session_id)
            .field("finished", &self.finished)
            .finish()
    }
}
