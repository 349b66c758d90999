//! Session state and turn orchestration.
//!
//! `SessionStore` owns every session's history; `ChatRelay` borrows a copy
//! of it per turn, calls the remote provider, and commits the exchange back
//! only when the turn succeeds.

pub mod prompt;
pub mod relay;
pub mod store;
pub mod turn;
