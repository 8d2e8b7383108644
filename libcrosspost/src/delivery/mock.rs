//! Mock delivery adapter for testing
//!
//! Configurable success/failure/delay behavior with call-count capture, so
//! dispatcher tests can assert exactly how many adapter invocations a run
//! produced without network access.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::delivery::{DeliveryAdapter, DeliveryReceipt};
use crate::error::{DeliveryError, Result};
use crate::types::{Platform, Post};

#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub platform: Platform,
    /// Error to return instead of succeeding.
    pub fail_with: Option<DeliveryError>,
    /// Delay before completing (simulates network latency).
    pub delay: Duration,
    pub is_configured: bool,
    /// Number of publish calls observed.
    pub publish_calls: Arc<Mutex<usize>>,
    /// IDs of posts handed to this adapter (for verification).
    pub published_ids: Arc<Mutex<Vec<String>>>,
}

impl MockBehavior {
    fn new(platform: Platform) -> Self {
        Self {
            platform,
            fail_with: None,
            delay: Duration::from_millis(0),
            is_configured: true,
            publish_calls: Arc::new(Mutex::new(0)),
            published_ids: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock platform adapter
pub struct MockAdapter {
    behavior: MockBehavior,
}

impl MockAdapter {
    pub fn new(behavior: MockBehavior) -> Self {
        Self { behavior }
    }

    /// An adapter that always accepts the post.
    pub fn success(platform: Platform) -> Self {
        Self::new(MockBehavior::new(platform))
    }

    /// An adapter that always fails with the given error.
    pub fn failure(platform: Platform, error: DeliveryError) -> Self {
        let mut behavior = MockBehavior::new(platform);
        behavior.fail_with = Some(error);
        Self::new(behavior)
    }

    /// An adapter that succeeds after a delay.
    pub fn with_delay(platform: Platform, delay: Duration) -> Self {
        let mut behavior = MockBehavior::new(platform);
        behavior.delay = delay;
        Self::new(behavior)
    }

    pub fn not_configured(platform: Platform) -> Self {
        let mut behavior = MockBehavior::new(platform);
        behavior.is_configured = false;
        Self::new(behavior)
    }

    pub fn publish_calls(&self) -> usize {
        *self.behavior.publish_calls.lock().unwrap()
    }

    pub fn published_ids(&self) -> Vec<String> {
        self.behavior.published_ids.lock().unwrap().clone()
    }

    /// Handles for asserting on calls after the adapter has been boxed into
    /// an [`AdapterSet`](crate::delivery::AdapterSet).
    pub fn probes(&self) -> (Arc<Mutex<usize>>, Arc<Mutex<Vec<String>>>) {
        (
            self.behavior.publish_calls.clone(),
            self.behavior.published_ids.clone(),
        )
    }
}

#[async_trait]
impl DeliveryAdapter for MockAdapter {
    fn platform(&self) -> Platform {
        self.behavior.platform
    }

    fn is_configured(&self) -> bool {
        self.behavior.is_configured
    }

    async fn publish(&self, post: &Post) -> Result<DeliveryReceipt> {
        *self.behavior.publish_calls.lock().unwrap() += 1;

        if !self.behavior.delay.is_zero() {
            sleep(self.behavior.delay).await;
        }

        if let Some(error) = &self.behavior.fail_with {
            return Err(error.clone().into());
        }

        self.behavior
            .published_ids
            .lock()
            .unwrap()
            .push(post.id.clone());

        Ok(DeliveryReceipt {
            url: format!(
                "https://{}.example/posts/{}",
                self.behavior.platform, post.id
            ),
            platform_post_id: Some(format!("mock-{}", uuid::Uuid::new_v4())),
        })
    }
}
