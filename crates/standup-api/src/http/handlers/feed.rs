//! External connection status endpoint.
//!
//! GET /api/v1/feed/status - whether the caller's anonymous id has a
//! usable external-account linkage. Answers 200 for unlinked callers
//! (connected: false); this is the one identity-adjacent endpoint that
//! must not 401, since the UI uses it to decide whether to offer the
//! connect flow.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use standup_infra::sqlite::token::SqliteFeedTokenStore;

use crate::http::error::AppError;
use crate::http::extractors::local_user::LocalUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FeedStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// GET /api/v1/feed/status - connection status for the caller.
pub async fn feed_status(
    State(state): State<AppState>,
    local_user: LocalUser,
) -> Result<Json<ApiResponse<FeedStatus>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let token = SqliteFeedTokenStore::new(state.db_pool.clone())
        .find_by_local_user(&local_user.0)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let status = match token {
        Some(token) if token.is_valid_at(Utc::now()) => FeedStatus {
            connected: true,
            expires_at: Some(token.expires_at.to_rfc3339()),
        },
        _ => FeedStatus {
            connected: false,
            expires_at: None,
        },
    };

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(status, request_id, elapsed)))
}
