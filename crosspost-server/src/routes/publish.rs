use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use libcrosspost::types::{Actor, Platform};
use libcrosspost::{authz, pipeline, CrosspostError};

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub post_id: String,
}

/// Session token from either a `session` cookie or a bearer header.
fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(token.to_string());
    }
    headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == "session").then(|| value.to_string())
            })
        })
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Actor, ApiError> {
    let token = session_token(headers).ok_or_else(|| {
        CrosspostError::Authentication("missing session".to_string())
    })?;
    state
        .db
        .get_session(&token)
        .await?
        .ok_or_else(|| CrosspostError::Authentication("invalid session".to_string()).into())
}

/// Single-post publish endpoint.
///
/// Ownership and approval gating happen here before any state change;
/// delivery failure comes back as 502 with the post left in FAILED.
pub async fn manual_publish_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    // Any malformed body (bad JSON, missing postId) is the caller's fault.
    let Json(request) = payload
        .map_err(|e| CrosspostError::InvalidInput(format!("invalid request body: {e}")))?;
    if request.post_id.trim().is_empty() {
        return Err(CrosspostError::InvalidInput("postId is required".to_string()).into());
    }

    let actor = authenticate(&state, &headers).await?;

    let post = state
        .db
        .get_post(&request.post_id)
        .await?
        .ok_or_else(|| CrosspostError::NotFound(format!("post {}", request.post_id)))?;

    authz::authorize_manual_publish(&actor, &post)?;

    let outcome = pipeline::attempt_publish(&state.db, &state.orchestrator, &post).await?;

    // Usage is only meaningful for the constrained platform.
    let usage = if post.platform == Platform::X {
        let now = Utc::now().timestamp();
        Some(state.quota.usage(&state.db, now).await?)
    } else {
        None
    };

    if outcome.success {
        info!(post_id = %post.id, actor_id = %actor.id, "Manual publish succeeded");
        Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "postId": outcome.post_id,
                "platform": outcome.platform,
                "url": outcome.url,
                "publishedAt": outcome.published_at,
                "xMonthlyUsage": usage,
            })),
        )
            .into_response())
    } else {
        Ok((
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "success": false,
                "postId": outcome.post_id,
                "platform": outcome.platform,
                "error": outcome.error,
                "errorKind": outcome.error_kind,
                "xMonthlyUsage": usage,
            })),
        )
            .into_response())
    }
}
