//! Delivery adapter abstraction
//!
//! One adapter per platform behind a common trait. The set of platforms is
//! the closed [`Platform`] enum, so dispatch sites stay exhaustive when a
//! platform is added. Platform API semantics (OAuth, endpoint shapes) live
//! behind the adapters and are not modeled here.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::{DeliveryConfig, DeliveryMode};
use crate::error::Result;
use crate::types::{Platform, Post};

pub mod mock;
pub mod webhook;

pub use mock::MockAdapter;
pub use webhook::WebhookAdapter;

/// What a platform hands back for an accepted post.
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    /// Public URL of the published post.
    pub url: String,
    /// Platform-side identifier, when the platform reports one.
    pub platform_post_id: Option<String>,
}

/// A single opaque delivery operation for one platform.
#[async_trait]
pub trait DeliveryAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Whether the adapter has everything it needs to deliver.
    fn is_configured(&self) -> bool;

    /// Deliver the post. Errors should be [`DeliveryError`](crate::error::DeliveryError)
    /// variants so the outcome carries a typed failure kind.
    async fn publish(&self, post: &Post) -> Result<DeliveryReceipt>;
}

/// Registered adapters, keyed by platform.
#[derive(Default)]
pub struct AdapterSet {
    adapters: HashMap<Platform, Box<dyn DeliveryAdapter>>,
}

impl AdapterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Box<dyn DeliveryAdapter>) {
        self.adapters.insert(adapter.platform(), adapter);
    }

    /// `None` means the platform has no adapter provisioned; the
    /// orchestrator reports that as a permanent `Unconfigured` failure.
    pub fn adapter_for(&self, platform: Platform) -> Option<&dyn DeliveryAdapter> {
        self.adapters.get(&platform).map(|a| a.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Build the adapter set from configuration.
    pub fn from_config(config: &DeliveryConfig) -> Self {
        let mut set = Self::new();
        match config.mode {
            DeliveryMode::Mock => {
                for platform in Platform::ALL {
                    set.register(Box::new(MockAdapter::success(platform)));
                }
            }
            DeliveryMode::Webhook => {
                for endpoint in &config.endpoints {
                    set.register(Box::new(WebhookAdapter::new(
                        endpoint.platform,
                        endpoint.url.clone(),
                        endpoint.token.clone(),
                    )));
                }
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;

    #[test]
    fn test_adapter_set_lookup() {
        let mut set = AdapterSet::new();
        set.register(Box::new(MockAdapter::success(Platform::Bluesky)));

        assert!(set.adapter_for(Platform::Bluesky).is_some());
        assert!(set.adapter_for(Platform::X).is_none());
    }

    #[test]
    fn test_from_config_mock_covers_all_platforms() {
        let config = DeliveryConfig {
            mode: DeliveryMode::Mock,
            endpoints: vec![],
        };
        let set = AdapterSet::from_config(&config);
        for platform in Platform::ALL {
            assert!(set.adapter_for(platform).is_some(), "{platform} missing");
        }
    }

    #[test]
    fn test_from_config_webhook_registers_configured_only() {
        let config = DeliveryConfig {
            mode: DeliveryMode::Webhook,
            endpoints: vec![EndpointConfig {
                platform: Platform::Mastodon,
                url: "https://delivery.internal/mastodon".to_string(),
                token: None,
            }],
        };
        let set = AdapterSet::from_config(&config);
        assert!(set.adapter_for(Platform::Mastodon).is_some());
        assert!(set.adapter_for(Platform::X).is_none());
        assert!(set.adapter_for(Platform::Bluesky).is_none());
    }
}
