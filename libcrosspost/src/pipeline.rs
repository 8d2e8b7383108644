//! Shared publish pipeline step
//!
//! The only place posts move through `Publishing`. Both the batch
//! dispatcher and the manual trigger call [`attempt_publish`], so the two
//! entry points cannot race each other into a double dispatch: the claim is
//! a conditional status update, and losing it means someone else is already
//! handling the post.

use tracing::{error, warn};

use crate::db::Database;
use crate::error::{CrosspostError, Result};
use crate::lifecycle;
use crate::orchestrator::PublishOrchestrator;
use crate::types::{Post, PostStatus, PublishOutcome};

/// Claim the post, deliver it, and write the terminal status.
///
/// The delivery outcome is authoritative: a failed bookkeeping write is
/// logged (distinctly from delivery failures) and does not change the
/// returned outcome.
///
/// # Errors
///
/// `Conflict` when the post is not in a dispatchable state or when the
/// claim is lost to a concurrent dispatch. Adapter failures are not errors
/// here; they come back as a failed outcome.
pub async fn attempt_publish(
    db: &Database,
    orchestrator: &PublishOrchestrator,
    post: &Post,
) -> Result<PublishOutcome> {
    if !lifecycle::is_dispatchable(post.status) {
        return Err(CrosspostError::Conflict(format!(
            "post {} is {} and cannot be dispatched",
            post.id, post.status
        )));
    }

    let claimed = db
        .transition_status(&post.id, post.status, PostStatus::Publishing)
        .await?;
    if !claimed {
        return Err(CrosspostError::Conflict(format!(
            "post {} is already being handled",
            post.id
        )));
    }

    let outcome = orchestrator.publish(post).await;

    if outcome.success {
        let url = outcome.url.as_deref().unwrap_or_default();
        let published_at = outcome
            .published_at
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        if let Err(e) = db.mark_published(&post.id, url, published_at).await {
            error!(
                post_id = %post.id,
                error = %e,
                "Post delivered but terminal status write failed; store is stale"
            );
        }
        // Usage accounting happens after delivery, never on the gating path.
        if post.platform.quota_constrained() {
            if let Err(e) = db.record_usage(post.platform, published_at).await {
                error!(post_id = %post.id, error = %e, "Usage accounting write failed");
            }
        }
    } else {
        let message = outcome.error.as_deref().unwrap_or("delivery failed");
        let kind = outcome
            .error_kind
            .unwrap_or(crate::types::ErrorKind::Transient);
        if let Err(e) = db.mark_failed(&post.id, message, kind).await {
            error!(
                post_id = %post.id,
                error = %e,
                "Failure bookkeeping write failed; post stuck in publishing"
            );
        }
        warn!(post_id = %post.id, platform = %post.platform, error = %message, "Publish failed");
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    use crate::delivery::{AdapterSet, MockAdapter};
    use crate::error::DeliveryError;
    use crate::types::{ErrorKind, Platform};

    async fn setup_db() -> (TempDir, Database) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Database::new(&db_path.to_string_lossy()).await.unwrap();
        (temp_dir, db)
    }

    fn orchestrator_with(adapter: MockAdapter) -> PublishOrchestrator {
        let mut set = AdapterSet::new();
        set.register(Box::new(adapter));
        PublishOrchestrator::new(Arc::new(set), Duration::from_secs(5))
    }

    fn scheduled_post(platform: Platform) -> Post {
        let mut post = Post::new("body".to_string(), platform, "userA".to_string());
        post.status = PostStatus::Scheduled;
        post.scheduled_at = Some(1_700_000_000);
        post
    }

    #[tokio::test]
    async fn test_successful_attempt_marks_published() {
        let (_temp, db) = setup_db().await;
        let orchestrator = orchestrator_with(MockAdapter::success(Platform::Bluesky));
        let post = scheduled_post(Platform::Bluesky);
        db.create_post(&post).await.unwrap();

        let outcome = attempt_publish(&db, &orchestrator, &post).await.unwrap();
        assert!(outcome.success);

        let loaded = db.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, PostStatus::Published);
        assert!(loaded.url.is_some());
        assert!(loaded.published_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_attempt_marks_failed_with_kind() {
        let (_temp, db) = setup_db().await;
        let orchestrator = orchestrator_with(MockAdapter::failure(
            Platform::Bluesky,
            DeliveryError::Network("relay down".to_string()),
        ));
        let post = scheduled_post(Platform::Bluesky);
        db.create_post(&post).await.unwrap();

        let outcome = attempt_publish(&db, &orchestrator, &post).await.unwrap();
        assert!(!outcome.success);

        let loaded = db.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, PostStatus::Failed);
        assert_eq!(loaded.error_kind, Some(ErrorKind::Transient));
        assert!(loaded.error.unwrap().contains("relay down"));
    }

    #[tokio::test]
    async fn test_lost_claim_is_conflict_and_adapter_untouched() {
        let (_temp, db) = setup_db().await;
        let adapter = MockAdapter::success(Platform::Bluesky);
        let (calls, _) = adapter.probes();
        let orchestrator = orchestrator_with(adapter);

        let post = scheduled_post(Platform::Bluesky);
        db.create_post(&post).await.unwrap();

        // A concurrent dispatcher claims the post first.
        db.transition_status(&post.id, PostStatus::Scheduled, PostStatus::Publishing)
            .await
            .unwrap();

        let err = attempt_publish(&db, &orchestrator, &post).await.unwrap_err();
        assert!(matches!(err, CrosspostError::Conflict(_)));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_non_dispatchable_status_is_conflict() {
        let (_temp, db) = setup_db().await;
        let adapter = MockAdapter::success(Platform::Bluesky);
        let (calls, _) = adapter.probes();
        let orchestrator = orchestrator_with(adapter);

        let mut post = scheduled_post(Platform::Bluesky);
        post.status = PostStatus::Published;
        db.create_post(&post).await.unwrap();

        let err = attempt_publish(&db, &orchestrator, &post).await.unwrap_err();
        assert!(matches!(err, CrosspostError::Conflict(_)));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_success_on_x_records_usage() {
        let (_temp, db) = setup_db().await;
        let orchestrator = orchestrator_with(MockAdapter::success(Platform::X));
        let post = scheduled_post(Platform::X);
        db.create_post(&post).await.unwrap();

        let outcome = attempt_publish(&db, &orchestrator, &post).await.unwrap();
        assert!(outcome.success);

        let now = outcome.published_at.unwrap();
        let usage = db.monthly_usage(Platform::X, 500, now).await.unwrap();
        assert_eq!(usage.used, 1);
    }

    #[tokio::test]
    async fn test_failure_on_x_records_no_usage() {
        let (_temp, db) = setup_db().await;
        let orchestrator = orchestrator_with(MockAdapter::failure(
            Platform::X,
            DeliveryError::Rejected("bad request".to_string()),
        ));
        let post = scheduled_post(Platform::X);
        db.create_post(&post).await.unwrap();

        attempt_publish(&db, &orchestrator, &post).await.unwrap();

        let usage = db
            .monthly_usage(Platform::X, 500, 1_700_000_000)
            .await
            .unwrap();
        assert_eq!(usage.used, 0);
    }
}
