//! Chat turn endpoints.
//!
//! POST /api/v1/chat        - one orchestrated turn, JSON in/out
//! POST /api/v1/chat/stream - SSE variant
//!
//! SSE event types:
//! - `text_delta` — incremental assistant text: `{ "text": "..." }`
//! - `session`    — scrum session selected: `{ "session_id": N }`
//! - `done`       — stream complete: `{}`
//! - `error`      — turn failed: `{ "message": "..." }`

use std::convert::Infallible;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;
use uuid::Uuid;

use standup_core::chat::orchestrator::TurnEvent;
use standup_types::chat::{ChatTurn, MessageRole};
use standup_types::scrum::ScrumDraft;
use standup_types::session::Session;

use crate::http::error::AppError;
use crate::http::extractors::local_user::LocalUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for both chat endpoints.
///
/// The client owns the visible transcript and sends it whole; `message`
/// is the new user turn.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Session the UI currently has open, if any.
    #[serde(default)]
    pub session_id: Option<i64>,
    /// Visible transcript before this turn.
    #[serde(default)]
    pub transcript: Vec<TranscriptEntry>,
    /// The new user message.
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptEntry {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub assistant_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<ScrumDraft>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

fn parse_transcript(entries: Vec<TranscriptEntry>) -> Result<Vec<ChatTurn>, AppError> {
    entries
        .into_iter()
        .map(|entry| {
            let role: MessageRole = entry.role.parse().map_err(AppError::Validation)?;
            Ok(ChatTurn {
                role,
                content: entry.content,
            })
        })
        .collect()
}

/// POST /api/v1/chat - run one conversation turn.
pub async fn chat(
    State(state): State<AppState>,
    local_user: LocalUser,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatResponse>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if body.message.trim().is_empty() {
        return Err(AppError::Validation("Message must not be blank".to_string()));
    }

    let user_id = local_user.resolve(&state).await?;
    let transcript = parse_transcript(body.transcript)?;

    let outcome = state
        .orchestrator
        .run_turn(&user_id, &transcript, body.session_id, &body.message)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(
        ChatResponse {
            assistant_text: outcome.assistant_text,
            draft: outcome.draft,
            session: outcome.session,
        },
        request_id,
        elapsed,
    );

    Ok(Json(resp))
}

/// POST /api/v1/chat/stream - SSE streaming turn.
pub async fn chat_stream(
    State(state): State<AppState>,
    local_user: LocalUser,
    Json(body): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if body.message.trim().is_empty() {
        return Err(AppError::Validation("Message must not be blank".to_string()));
    }

    let user_id = local_user.resolve(&state).await?;
    let transcript = parse_transcript(body.transcript)?;

    let mut turn_events = state.orchestrator.clone().stream_turn(
        user_id,
        transcript,
        body.session_id,
        body.message,
    );

    let sse_stream = async_stream::stream! {
        while let Some(event) = turn_events.next().await {
            match event {
                TurnEvent::Delta(text) => {
                    yield Ok(Event::default()
                        .event("text_delta")
                        .data(serde_json::json!({ "text": text }).to_string()));
                }
                TurnEvent::Completed(outcome) => {
                    if let Some(session) = &outcome.session {
                        yield Ok(Event::default()
                            .event("session")
                            .data(serde_json::json!({ "session_id": session.id }).to_string()));
                    }
                    yield Ok(Event::default().event("done").data("{}"));
                }
                TurnEvent::Failed(message) => {
                    yield Ok(Event::default()
                        .event("error")
                        .data(serde_json::json!({ "message": message }).to_string()));
                }
            }
        }
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transcript_normalizes_roles() {
        let turns = parse_transcript(vec![
            TranscriptEntry {
                role: "User".to_string(),
                content: "hi".to_string(),
            },
            TranscriptEntry {
                role: "ASSISTANT".to_string(),
                content: "hello".to_string(),
            },
        ])
        .unwrap();
        assert_eq!(turns[0].role, MessageRole::User);
        assert_eq!(turns[1].role, MessageRole::Assistant);
    }

    #[test]
    fn test_parse_transcript_rejects_unknown_role() {
        let result = parse_transcript(vec![TranscriptEntry {
            role: "tool".to_string(),
            content: "x".to_string(),
        }]);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
