//! Chat turn endpoints.
//!
//! - POST /api/chat        - blocking turn, returns the full reply
//! - POST /api/chat/stream - SSE streaming turn
//!
//! Each SSE `data:` line is one JSON chat event:
//! - `{"type":"chunk","content":"..."}` -- incremental reply text
//! - `{"type":"done","session_id":"..."}` -- turn committed
//! - `{"type":"error","error":"..."}` -- turn failed, history unchanged

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio_stream::Stream;

use parley_types::chat::{ChatEvent, SessionId, TurnReply};

use crate::http::error::AppError;
use crate::http::extractors::json::ApiJson;
use crate::state::AppState;

/// Request body for both chat endpoints.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Existing session to continue; a new id is generated if absent.
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
    pub message: String,
}

impl ChatRequest {
    fn into_parts(self) -> Result<(Option<SessionId>, String), AppError> {
        if self.message.trim().is_empty() {
            return Err(AppError::Validation("message must not be empty".to_string()));
        }
        let session_id = self
            .session_id
            .filter(|id| !id.trim().is_empty())
            .map(SessionId::from);
        Ok((session_id, self.message))
    }
}

/// POST /api/chat -- run one turn to completion.
///
/// 200 with the reply on success, 502 with the failure payload when the
/// remote call failed.
pub async fn send_message(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ChatRequest>,
) -> Result<(StatusCode, Json<TurnReply>), AppError> {
    let (session_id, message) = body.into_parts()?;

    let outcome = state.relay.turn(session_id, message).await;
    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };

    Ok((status, Json(outcome.into_reply())))
}

/// POST /api/chat/stream -- SSE streaming turn.
///
/// Dropping the response (client disconnect) cancels the turn.
pub async fn stream_chat(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (session_id, message) = body.into_parts()?;

    let mut turn = state.relay.stream_turn(session_id, message);
    tracing::debug!(session_id = %turn.session_id(), "SSE turn started");

    let sse_stream = async_stream::stream! {
        while let Some(event) = turn.next().await {
            yield Ok::<_, Infallible>(to_sse_event(&event));
        }
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

fn to_sse_event(event: &ChatEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_default();
    Event::default().data(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_camel_case_session_id() {
        let body: ChatRequest =
            serde_json::from_str(r#"{"sessionId":"abc","message":"hi"}"#).unwrap();
        let (id, message) = body.into_parts().unwrap();
        assert_eq!(id, Some(SessionId::from("abc")));
        assert_eq!(message, "hi");
    }

    #[test]
    fn test_blank_session_id_is_treated_as_absent() {
        let body: ChatRequest =
            serde_json::from_str(r#"{"session_id":"  ","message":"hi"}"#).unwrap();
        assert_eq!(body.into_parts().unwrap().0, None);
    }

    #[test]
    fn test_empty_message_is_rejected() {
        let body: ChatRequest = serde_json::from_str(r#"{"message":"   "}"#).unwrap();
        assert!(matches!(body.into_parts(), Err(AppError::Validation(_))));
    }
}
