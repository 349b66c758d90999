//! Session HTTP handlers.
//!
//! Endpoints:
//! - POST   /api/chat/session                  - Create a session
//! - GET    /api/chat/history/{session_id}       - Get a session's history
//! - DELETE /api/chat/history/{session_id}       - Delete a session
//! - POST   /api/chat/history/{session_id}/clear - Clear history but keep session

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use parley_types::chat::{DeleteReply, HistoryReply, SessionCreated, SessionId};
use parley_types::error::RelayError;

use crate::http::error::AppError;
use crate::state::AppState;

/// POST /api/chat/session
pub async fn create_session(State(state): State<AppState>) -> Json<SessionCreated> {
    Json(SessionCreated {
        success: true,
        session_id: state.relay.create_session(),
    })
}

/// GET /api/chat/history/{session_id}
pub async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<(StatusCode, Json<HistoryReply>), AppError> {
    match state.relay.history(&SessionId::from(session_id)) {
        Ok(history) => Ok((StatusCode::OK, Json(HistoryReply::found(history)))),
        Err(RelayError::NotFound) => Ok((StatusCode::NOT_FOUND, Json(HistoryReply::not_found()))),
        Err(e) => Err(e.into()),
    }
}

/// DELETE /api/chat/history/{session_id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> (StatusCode, Json<DeleteReply>) {
    let deleted = state.relay.delete_session(&SessionId::from(session_id));
    reply(deleted)
}

/// POST /api/chat/history/{session_id}/clear
pub async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> (StatusCode, Json<DeleteReply>) {
    let cleared = state.relay.clear_session(&SessionId::from(session_id));
    reply(cleared)
}

fn reply(success: bool) -> (StatusCode, Json<DeleteReply>) {
    let status = if success {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    (status, Json(DeleteReply { success }))
}
