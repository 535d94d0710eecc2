//! Session CRUD HTTP handlers.
//!
//! Endpoints:
//! - POST   /api/v1/sessions               - Create a free-form session
//! - GET    /api/v1/sessions               - List the caller's sessions
//! - GET    /api/v1/sessions/{id}          - Get a session with messages
//! - DELETE /api/v1/sessions/{id}          - Delete a session
//! - PUT    /api/v1/sessions/{id}/title    - Rename a session
//! - POST   /api/v1/sessions/{id}/messages - Append one message
//! - PUT    /api/v1/sessions/{id}/messages - Replace the transcript

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use standup_types::chat::MessageRole;
use standup_types::scrum::MessageMetadata;
use standup_types::session::NewMessage;

use crate::http::error::AppError;
use crate::http::extractors::local_user::LocalUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Incoming message shape: role arrives as free text and is normalized
/// into the three known roles.
#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Option<MessageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceMessagesBody {
    pub messages: Vec<MessageBody>,
}

#[derive(Debug, Deserialize)]
pub struct RenameBody {
    pub title: String,
}

fn parse_role(role: &str) -> Result<MessageRole, AppError> {
    role.parse::<MessageRole>()
        .map_err(AppError::Validation)
}

fn to_new_message(body: MessageBody) -> Result<NewMessage, AppError> {
    let role = parse_role(&body.role)?;
    let mut message = NewMessage::new(role, body.content);
    if let Some(metadata) = body.metadata {
        message = message.with_metadata(metadata);
    }
    Ok(message)
}

/// POST /api/v1/sessions - Create a free-form session.
pub async fn create_session(
    State(state): State<AppState>,
    local_user: LocalUser,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let user_id = local_user.resolve(&state).await?;
    let session = state.sessions().create_freeform_session(&user_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let session_json = serde_json::to_value(&session)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(session_json, request_id, elapsed)
        .with_link("self", &format!("/api/v1/sessions/{}", session.id));

    Ok(Json(resp))
}

/// GET /api/v1/sessions - List the caller's sessions, most recent first.
pub async fn list_sessions(
    State(state): State<AppState>,
    local_user: LocalUser,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let user_id = local_user.resolve(&state).await?;
    let sessions = state.sessions().list_sessions(&user_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let sessions_json = sessions
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(sessions_json, request_id, elapsed)
        .with_link("self", "/api/v1/sessions");

    Ok(Json(resp))
}

/// GET /api/v1/sessions/{id} - Session detail with ordered messages and
/// scrum update. Foreign ids read as not found.
pub async fn get_session(
    State(state): State<AppState>,
    local_user: LocalUser,
    Path(session_id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let user_id = local_user.resolve(&state).await?;
    let detail = state
        .sessions()
        .get_session(&user_id, session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    let elapsed = start.elapsed().as_millis() as u64;
    let detail_json = serde_json::to_value(&detail)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let resp = ApiResponse::success(detail_json, request_id, elapsed)
        .with_link("self", &format!("/api/v1/sessions/{session_id}"))
        .with_link("messages", &format!("/api/v1/sessions/{session_id}/messages"));

    Ok(Json(resp))
}

/// DELETE /api/v1/sessions/{id} - Delete a session and its children.
pub async fn delete_session(
    State(state): State<AppState>,
    local_user: LocalUser,
    Path(session_id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let user_id = local_user.resolve(&state).await?;
    state.sessions().delete_session(&user_id, session_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(serde_json::json!({"deleted": true}), request_id, elapsed);

    Ok(Json(resp))
}

/// PUT /api/v1/sessions/{id}/title - Rename a session.
pub async fn rename_session(
    State(state): State<AppState>,
    local_user: LocalUser,
    Path(session_id): Path<i64>,
    Json(body): Json<RenameBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if body.title.trim().is_empty() {
        return Err(AppError::Validation("Title must not be blank".to_string()));
    }

    let user_id = local_user.resolve(&state).await?;
    state
        .sessions()
        .rename_session(&user_id, session_id, body.title.trim())
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(serde_json::json!({"renamed": true}), request_id, elapsed);

    Ok(Json(resp))
}

/// POST /api/v1/sessions/{id}/messages - Append one message.
pub async fn append_message(
    State(state): State<AppState>,
    local_user: LocalUser,
    Path(session_id): Path<i64>,
    Json(body): Json<MessageBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let user_id = local_user.resolve(&state).await?;
    let message = to_new_message(body)?;
    state
        .sessions()
        .append_message(&user_id, session_id, &message)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(serde_json::json!({"appended": true}), request_id, elapsed);

    Ok(Json(resp))
}

/// PUT /api/v1/sessions/{id}/messages - Replace the whole transcript.
pub async fn replace_messages(
    State(state): State<AppState>,
    local_user: LocalUser,
    Path(session_id): Path<i64>,
    Json(body): Json<ReplaceMessagesBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let user_id = local_user.resolve(&state).await?;
    let messages = body
        .messages
        .into_iter()
        .map(to_new_message)
        .collect::<Result<Vec<_>, _>>()?;
    state
        .sessions()
        .replace_messages(&user_id, session_id, messages)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(serde_json::json!({"replaced": true}), request_id, elapsed);

    Ok(Json(resp))
}
