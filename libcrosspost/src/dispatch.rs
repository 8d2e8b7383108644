//! Batch dispatcher for scheduled and retryable posts
//!
//! Invoked by an external scheduler at a fixed interval. One run fetches a
//! bounded page of posts, filters it down to due scheduled posts and
//! retryable failures, applies the quota gate and the per-run cap, then
//! processes the survivors strictly sequentially. Sequential processing
//! keeps the quota check meaningful across the run and bounds
//! platform-side load.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::db::Database;
use crate::error::{CrosspostError, Result};
use crate::lifecycle;
use crate::orchestrator::PublishOrchestrator;
use crate::quota::QuotaGate;
use crate::types::{MonthlyUsage, PublishOutcome};

/// Aggregate result of one batch run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Posts that reached a delivery attempt.
    pub processed: u32,
    pub succeeded: u32,
    pub failed: u32,
    /// Posts lost to a concurrent dispatch (claim already taken).
    pub skipped: u32,
    pub results: Vec<PublishOutcome>,
    /// Usage snapshot for the constrained platform, re-read after the run.
    pub x_monthly_usage: MonthlyUsage,
}

pub struct BatchDispatcher {
    db: Database,
    orchestrator: PublishOrchestrator,
    quota: QuotaGate,
    page_size: u32,
    max_per_run: u32,
}

impl BatchDispatcher {
    pub fn new(
        db: Database,
        orchestrator: PublishOrchestrator,
        quota: QuotaGate,
        config: &DispatchConfig,
    ) -> Self {
        Self {
            db,
            orchestrator,
            quota,
            page_size: config.page_size,
            max_per_run: config.max_per_run,
        }
    }

    /// Execute one run. Per-post delivery failures are expected partial
    /// outcomes recorded in the report; they never abort the run.
    pub async fn run(&self, now: i64) -> Result<BatchReport> {
        let page = self.db.list_posts(self.page_size, 0).await?;

        let mut candidates: Vec<_> = page
            .into_iter()
            .filter(|post| lifecycle::batch_eligible(post, now))
            .collect();

        // Fresh read right before the gating decision; concurrent manual
        // triggers move this counter.
        let usage = self.quota.usage(&self.db, now).await?;
        let before_quota = candidates.len();
        candidates.retain(|post| !self.quota.blocks(post.platform, &usage));
        if candidates.len() < before_quota {
            info!(
                excluded = before_quota - candidates.len(),
                platform = %self.quota.platform(),
                remaining = usage.remaining(),
                "Monthly quota exhausted; excluding posts for constrained platform"
            );
        }

        if candidates.is_empty() {
            debug!("No posts eligible for dispatch");
            return Ok(BatchReport {
                processed: 0,
                succeeded: 0,
                failed: 0,
                skipped: 0,
                results: vec![],
                x_monthly_usage: usage,
            });
        }

        candidates.truncate(self.max_per_run as usize);
        info!(count = candidates.len(), "Dispatching eligible posts");

        let mut results = Vec::with_capacity(candidates.len());
        let mut succeeded = 0;
        let mut failed = 0;
        let mut skipped = 0;

        for post in &candidates {
            match crate::pipeline::attempt_publish(&self.db, &self.orchestrator, post).await {
                Ok(outcome) => {
                    if outcome.success {
                        succeeded += 1;
                    } else {
                        failed += 1;
                    }
                    results.push(outcome);
                }
                Err(CrosspostError::Conflict(reason)) => {
                    debug!(post_id = %post.id, %reason, "Skipping post claimed elsewhere");
                    skipped += 1;
                }
                Err(e) => {
                    warn!(post_id = %post.id, error = %e, "Dispatch attempt errored; continuing run");
                    skipped += 1;
                }
            }
        }

        let x_monthly_usage = self.quota.usage(&self.db, now).await?;

        Ok(BatchReport {
            processed: results.len() as u32,
            succeeded,
            failed,
            skipped,
            results,
            x_monthly_usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    use crate::delivery::{AdapterSet, MockAdapter};
    use crate::types::{Platform, Post, PostStatus};

    const NOW: i64 = 1_700_000_000;

    async fn setup_db() -> (TempDir, Database) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Database::new(&db_path.to_string_lossy()).await.unwrap();
        (temp_dir, db)
    }

    fn all_success_orchestrator() -> PublishOrchestrator {
        let mut set = AdapterSet::new();
        for platform in Platform::ALL {
            set.register(Box::new(MockAdapter::success(platform)));
        }
        PublishOrchestrator::new(Arc::new(set), Duration::from_secs(5))
    }

    fn dispatcher(db: Database, limit: u32, max_per_run: u32) -> BatchDispatcher {
        let config = DispatchConfig {
            page_size: 250,
            max_per_run,
            adapter_timeout_secs: 5,
        };
        BatchDispatcher::new(db, all_success_orchestrator(), QuotaGate::for_x(limit), &config)
    }

    async fn seed_scheduled(db: &Database, platform: Platform, scheduled_at: i64) -> Post {
        let mut post = Post::new("body".to_string(), platform, "userA".to_string());
        post.status = PostStatus::Scheduled;
        post.scheduled_at = Some(scheduled_at);
        db.create_post(&post).await.unwrap();
        post
    }

    #[tokio::test]
    async fn test_empty_store_reports_zero() {
        let (_temp, db) = setup_db().await;
        let report = dispatcher(db, 500, 10).run(NOW).await.unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.succeeded, 0);
        assert!(report.results.is_empty());
        assert_eq!(report.x_monthly_usage.limit, 500);
    }

    #[tokio::test]
    async fn test_due_scheduled_post_is_published() {
        let (_temp, db) = setup_db().await;
        let post = seed_scheduled(&db, Platform::Bluesky, NOW - 3600).await;

        let report = dispatcher(db.clone(), 500, 10).run(NOW).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 0);

        let loaded = db.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, PostStatus::Published);
    }

    #[tokio::test]
    async fn test_future_scheduled_post_is_left_alone() {
        let (_temp, db) = setup_db().await;
        let post = seed_scheduled(&db, Platform::Bluesky, NOW + 3600).await;

        let report = dispatcher(db.clone(), 500, 10).run(NOW).await.unwrap();
        assert_eq!(report.processed, 0);

        let loaded = db.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, PostStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_cap_bounds_one_run() {
        let (_temp, db) = setup_db().await;
        for _ in 0..7 {
            seed_scheduled(&db, Platform::Mastodon, NOW - 60).await;
        }

        let report = dispatcher(db.clone(), 500, 3).run(NOW).await.unwrap();
        assert_eq!(report.processed, 3);

        // The rest remain scheduled for the next run.
        let remaining = db
            .list_posts(250, 0)
            .await
            .unwrap()
            .into_iter()
            .filter(|p| p.status == PostStatus::Scheduled)
            .count();
        assert_eq!(remaining, 4);
    }

    #[tokio::test]
    async fn test_quota_exhaustion_excludes_only_x() {
        let (_temp, db) = setup_db().await;
        for _ in 0..3 {
            seed_scheduled(&db, Platform::X, NOW - 60).await;
        }
        for _ in 0..2 {
            seed_scheduled(&db, Platform::Bluesky, NOW - 60).await;
        }
        // Exhaust the X quota.
        db.record_usage(Platform::X, NOW).await.unwrap();
        db.record_usage(Platform::X, NOW).await.unwrap();

        let report = dispatcher(db.clone(), 2, 10).run(NOW).await.unwrap();
        assert_eq!(report.processed, 2);
        assert!(report
            .results
            .iter()
            .all(|r| r.platform == Platform::Bluesky));

        // X posts untouched, still scheduled.
        let x_scheduled = db
            .list_posts(250, 0)
            .await
            .unwrap()
            .into_iter()
            .filter(|p| p.platform == Platform::X && p.status == PostStatus::Scheduled)
            .count();
        assert_eq!(x_scheduled, 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_never_selected() {
        let (_temp, db) = setup_db().await;
        let mut post = Post::new("body".to_string(), Platform::X, "userA".to_string());
        post.status = PostStatus::Failed;
        post.error = Some("X API: monthly limit reached".to_string());
        db.create_post(&post).await.unwrap();

        // However many runs happen, the post stays failed and untouched.
        let dispatcher = dispatcher(db.clone(), 500, 10);
        for offset in [0, 3600, 86_400] {
            let report = dispatcher.run(NOW + offset).await.unwrap();
            assert_eq!(report.processed, 0);
        }

        let loaded = db.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, PostStatus::Failed);
        assert_eq!(loaded.error.as_deref(), Some("X API: monthly limit reached"));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let (_temp, db) = setup_db().await;
        let mut post = Post::new("body".to_string(), Platform::Bluesky, "userA".to_string());
        post.status = PostStatus::Failed;
        post.error = Some("connection reset by peer".to_string());
        db.create_post(&post).await.unwrap();

        let report = dispatcher(db.clone(), 500, 10).run(NOW).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.succeeded, 1);

        let loaded = db.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, PostStatus::Published);
    }

    #[tokio::test]
    async fn test_post_already_publishing_is_not_selected() {
        let (_temp, db) = setup_db().await;
        let post = seed_scheduled(&db, Platform::Bluesky, NOW - 60).await;
        db.transition_status(&post.id, PostStatus::Scheduled, PostStatus::Publishing)
            .await
            .unwrap();

        let report = dispatcher(db.clone(), 500, 10).run(NOW).await.unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.skipped, 0);
    }

    #[tokio::test]
    async fn test_run_snapshot_reflects_usage_after_run() {
        let (_temp, db) = setup_db().await;
        seed_scheduled(&db, Platform::X, NOW - 60).await;

        let report = dispatcher(db.clone(), 500, 10).run(NOW).await.unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.x_monthly_usage.used, 1);
    }
}
