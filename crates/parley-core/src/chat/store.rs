//! In-memory session store.
//!
//! `SessionStore` maps session ids to their ordered history using a sharded
//! `DashMap`. Shard guards are only held for the synchronous read or append
//! and are never held across `.await`. A second map holds one async mutex per
//! session id so the relay can serialize turns on the same session without
//! blocking unrelated sessions.
//!
//! Sessions live for the lifetime of the process or until deleted; there is
//! no eviction or capacity bound.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use parley_types::chat::{Message, MessageRole, SessionId};
use parley_types::error::RelayError;

type TurnLocks = Arc<DashMap<SessionId, Arc<Mutex<()>>>>;

/// Concurrent owner of every session's conversation history.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, Vec<Message>>,
    turn_locks: TurnLocks,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh session with an empty history.
    pub fn create(&self) -> SessionId {
        let id = SessionId::generate();
        self.sessions.insert(id.clone(), Vec::new());
        debug!(session_id = %id, "Session created");
        id
    }

    /// Append one message, creating an empty history first if `id` is unknown.
    pub fn upsert_append(&self, id: &SessionId, role: MessageRole, content: impl Into<String>) {
        let message = Message {
            role,
            content: content.into(),
        };
        self.sessions.entry(id.clone()).or_default().push(message);
    }

    /// Commit a completed turn: the user message, then the assistant reply.
    ///
    /// Both entries are appended under one shard guard, so no reader ever
    /// observes the user message without its reply. Unknown ids are created.
    pub fn append_turn(&self, id: &SessionId, user: String, assistant: String) {
        let mut history = self.sessions.entry(id.clone()).or_default();
        history.push(Message::user(user));
        history.push(Message::assistant(assistant));
    }

    /// History used for prompt assembly. Unknown ids yield an empty history.
    pub fn history_or_empty(&self, id: &SessionId) -> Vec<Message> {
        self.sessions
            .get(id)
            .map(|h| h.value().clone())
            .unwrap_or_default()
    }

    /// History for explicit retrieval. Unknown ids are `NotFound`.
    pub fn history(&self, id: &SessionId) -> Result<Vec<Message>, RelayError> {
        self.sessions
            .get(id)
            .map(|h| h.value().clone())
            .ok_or(RelayError::NotFound)
    }

    /// Remove a session and its history. Returns whether it existed.
    pub fn delete(&self, id: &SessionId) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            debug!(session_id = %id, "Session deleted");
        }
        removed
    }

    /// Empty the history of an existing session but keep the session.
    pub fn clear(&self, id: &SessionId) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut history) => {
                history.clear();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Wait for exclusive turn access to `id`.
    ///
    /// Waiters queue in FIFO order. Acquiring the guard never creates a
    /// session. The lock entry is discarded once nobody holds or waits on it,
    /// including when a waiter is cancelled before acquiring.
    pub async fn lock_turn(&self, id: &SessionId) -> TurnGuard {
        let lock = self.turn_locks.entry(id.clone()).or_default().clone();
        // Declared before the wait, so a cancelled wait drops it last.
        let slot = LockSlot {
            id: id.clone(),
            locks: self.turn_locks.clone(),
            lock: Some(lock.clone()),
        };
        let guard = lock.lock_owned().await;
        TurnGuard {
            _guard: guard,
            slot,
        }
    }

    #[cfg(test)]
    fn turn_lock_count(&self) -> usize {
        self.turn_locks.len()
    }
}

/// Exclusive access to one session for the duration of a turn.
pub struct TurnGuard {
    // Field order matters: the mutex guard is released before the slot.
    _guard: OwnedMutexGuard<()>,
    slot: LockSlot,
}

impl std::fmt::Debug for TurnGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnGuard").field("id", &self.slot.id).finish()
    }
}

/// One interest in a session's lock entry, held from before the wait until
/// the guard is released.
struct LockSlot {
    id: SessionId,
    locks: TurnLocks,
    lock: Option<Arc<Mutex<()>>>,
}

impl Drop for LockSlot {
    fn drop(&mut self) {
        drop(self.lock.take());
        // Only the map's own reference left: nobody holds or waits on it.
        self.locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
