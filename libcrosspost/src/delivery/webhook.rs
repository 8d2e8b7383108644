//! Webhook delivery adapter
//!
//! Forwards a post as JSON to a per-platform delivery endpoint that owns
//! the actual platform integration (OAuth, API calls). The endpoint answers
//! with the public URL of the published post.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::delivery::{DeliveryAdapter, DeliveryReceipt};
use crate::error::{DeliveryError, Result};
use crate::types::{Platform, Post};

pub struct WebhookAdapter {
    platform: Platform,
    url: String,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookRequest<'a> {
    post_id: &'a str,
    platform: Platform,
    content: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookResponse {
    url: String,
    #[serde(default)]
    platform_post_id: Option<String>,
}

impl WebhookAdapter {
    pub fn new(platform: Platform, url: String, token: Option<String>) -> Self {
        Self {
            platform,
            url,
            token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DeliveryAdapter for WebhookAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn is_configured(&self) -> bool {
        !self.url.is_empty()
    }

    async fn publish(&self, post: &Post) -> Result<DeliveryReceipt> {
        let body = WebhookRequest {
            post_id: &post.id,
            platform: self.platform,
            content: &post.content,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Network(format!("{}: {}", self.platform, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected(format!(
                "{} delivery endpoint answered {}: {}",
                self.platform, status, detail
            ))
            .into());
        }

        let parsed: WebhookResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::Rejected(format!("{}: malformed response: {}", self.platform, e)))?;

        Ok(DeliveryReceipt {
            url: parsed.url,
            platform_post_id: parsed.platform_post_id,
        })
    }
}
