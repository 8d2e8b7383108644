//! Publish orchestration
//!
//! Given one post, select the matching delivery adapter, invoke it under a
//! timeout, and normalize whatever happened into a [`PublishOutcome`]. No
//! authorization, no state-machine logic; that belongs to the callers, so
//! both trigger paths share identical delivery semantics.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::delivery::AdapterSet;
use crate::error::CrosspostError;
use crate::types::{ErrorKind, Post, PublishOutcome};

#[derive(Clone)]
pub struct PublishOrchestrator {
    adapters: Arc<AdapterSet>,
    /// Bound on a single adapter call, so one slow platform cannot stall a
    /// whole batch run.
    adapter_timeout: Duration,
}

impl PublishOrchestrator {
    pub fn new(adapters: Arc<AdapterSet>, adapter_timeout: Duration) -> Self {
        Self {
            adapters,
            adapter_timeout,
        }
    }

    /// Deliver one post and report the normalized outcome.
    ///
    /// Never returns an error: every failure mode (missing adapter, network
    /// failure, timeout) becomes a failed outcome with a typed kind.
    pub async fn publish(&self, post: &Post) -> PublishOutcome {
        let platform = post.platform;

        let adapter = match self.adapters.adapter_for(platform) {
            Some(adapter) if adapter.is_configured() => adapter,
            _ => {
                warn!(post_id = %post.id, %platform, "No configured adapter for platform");
                return PublishOutcome::failed(
                    post.id.clone(),
                    platform,
                    format!("{platform}: platform not configured"),
                    ErrorKind::Unconfigured,
                );
            }
        };

        info!(post_id = %post.id, %platform, "Dispatching post to platform");

        match tokio::time::timeout(self.adapter_timeout, adapter.publish(post)).await {
            Ok(Ok(receipt)) => {
                let published_at = chrono::Utc::now().timestamp();
                info!(post_id = %post.id, %platform, url = %receipt.url, "Delivery accepted");
                PublishOutcome::succeeded(post.id.clone(), platform, receipt.url, published_at)
            }
            Ok(Err(e)) => {
                let kind = match &e {
                    CrosspostError::Delivery(delivery) => delivery.kind(),
                    _ => ErrorKind::Transient,
                };
                warn!(post_id = %post.id, %platform, error = %e, "Delivery failed");
                PublishOutcome::failed(post.id.clone(), platform, e.to_string(), kind)
            }
            Err(_) => {
                let secs = self.adapter_timeout.as_secs();
                warn!(post_id = %post.id, %platform, timeout_secs = secs, "Delivery timed out");
                PublishOutcome::failed(
                    post.id.clone(),
                    platform,
                    format!("{platform}: delivery timed out after {secs}s"),
                    ErrorKind::Transient,
                )
            }
        }
    }
}
