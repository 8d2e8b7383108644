use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use libcrosspost::error::ConfigError;
use libcrosspost::CrosspostError;

use crate::app::AppState;
use crate::error::ApiError;

/// Compare the caller's secret against the configured one without a timing
/// side channel. Hashing both sides first makes byte-wise short circuits
/// useless to an attacker.
fn secrets_match(expected: &str, provided: &str) -> bool {
    Sha256::digest(expected.as_bytes()) == Sha256::digest(provided.as_bytes())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Scheduler entry point. Registered for both GET and POST so either
/// style of external cron trigger works.
pub async fn cron_publish_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let expected = state.cron_secret.as_deref().ok_or_else(|| {
        CrosspostError::Config(ConfigError::MissingField("server.cron_secret".to_string()))
    })?;

    match bearer_token(&headers) {
        Some(provided) if secrets_match(expected, provided) => {}
        Some(_) => {
            warn!("Cron trigger rejected: secret mismatch");
            return Err(CrosspostError::Authentication(
                "invalid cron secret".to_string(),
            )
            .into());
        }
        None => {
            return Err(CrosspostError::Authentication(
                "missing bearer token".to_string(),
            )
            .into());
        }
    }

    let now = Utc::now().timestamp();
    let report = state.dispatcher.run(now).await?;

    if report.processed == 0 && report.skipped == 0 {
        return Ok(Json(json!({
            "processed": 0,
            "message": "no posts due",
            "xMonthlyUsage": report.x_monthly_usage,
        })));
    }

    info!(
        processed = report.processed,
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        "Batch run complete"
    );

    Ok(Json(json!({
        "processed": report.processed,
        "succeeded": report.succeeded,
        "failed": report.failed,
        "skipped": report.skipped,
        "results": report.results,
        "xMonthlyUsage": report.x_monthly_usage,
    })))
}
