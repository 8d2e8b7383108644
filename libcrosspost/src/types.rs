//! Core types for Crosspost

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A publishable content item.
///
/// Posts are owned by the store and mutated only through the publish
/// pipeline (or the external editorial UI, which drives the approval
/// states).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub content: String,
    pub platform: Platform,
    pub status: PostStatus,
    /// Unix timestamp; only meaningful when `status == Scheduled`.
    pub scheduled_at: Option<i64>,
    pub created_by: String,
    pub created_at: i64,
    /// Last failure message; only meaningful when `status == Failed`.
    pub error: Option<String>,
    /// Typed classification carried alongside the message.
    pub error_kind: Option<ErrorKind>,
    pub url: Option<String>,
    pub published_at: Option<i64>,
}

impl Post {
    pub fn new(content: String, platform: Platform, created_by: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            platform,
            status: PostStatus::Draft,
            scheduled_at: None,
            created_by,
            created_at: chrono::Utc::now().timestamp(),
            error: None,
            error_kind: None,
            url: None,
            published_at: None,
        }
    }
}

/// Lifecycle status of a post. See `lifecycle` for the allowed edges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    PendingApproval,
    ChangesRequested,
    Scheduled,
    Publishing,
    Published,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::ChangesRequested => "changes_requested",
            Self::Scheduled => "scheduled",
            Self::Publishing => "publishing",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "pending_approval" => Some(Self::PendingApproval),
            "changes_requested" => Some(Self::ChangesRequested),
            "scheduled" => Some(Self::Scheduled),
            "publishing" => Some(Self::Publishing),
            "published" => Some(Self::Published),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delivery targets. A closed set so adapter dispatch is exhaustive.
///
/// X is the only platform subject to a hard monthly send quota.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    X,
    Bluesky,
    Mastodon,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::X, Platform::Bluesky, Platform::Mastodon];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Bluesky => "bluesky",
            Self::Mastodon => "mastodon",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "x" | "twitter" => Some(Self::X),
            "bluesky" => Some(Self::Bluesky),
            "mastodon" => Some(Self::Mastodon),
            _ => None,
        }
    }

    /// Whether this platform is gated by the monthly quota.
    pub fn quota_constrained(&self) -> bool {
        matches!(self, Self::X)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure classification produced by the delivery layer.
///
/// The first three are permanent: a post carrying one of them is never
/// retried by the batch dispatcher.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unconfigured,
    Unsupported,
    QuotaExhausted,
    Transient,
}

impl ErrorKind {
    pub fn is_permanent(&self) -> bool {
        !matches!(self, Self::Transient)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Unsupported => "unsupported",
            Self::QuotaExhausted => "quota_exhausted",
            Self::Transient => "transient",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "unconfigured" => Some(Self::Unconfigured),
            "unsupported" => Some(Self::Unsupported),
            "quota_exhausted" => Some(Self::QuotaExhausted),
            "transient" => Some(Self::Transient),
            _ => None,
        }
    }
}

/// Actor role for the manual publish endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Approver,
    Editor,
}

impl Role {
    /// Admins and approvers may publish posts they do not own and may
    /// force-publish posts still pending approval.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Admin | Self::Approver)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Approver => "approver",
            Self::Editor => "editor",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "approver" => Some(Self::Approver),
            "editor" => Some(Self::Editor),
            _ => None,
        }
    }
}

/// An authenticated caller of the manual trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

/// Monthly send usage for a platform.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct MonthlyUsage {
    pub used: u32,
    pub limit: u32,
}

impl MonthlyUsage {
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }
}

// Serialized with the derived `remaining` included, so API consumers
// never recompute it.
impl Serialize for MonthlyUsage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("MonthlyUsage", 3)?;
        state.serialize_field("used", &self.used)?;
        state.serialize_field("limit", &self.limit)?;
        state.serialize_field("remaining", &self.remaining())?;
        state.end()
    }
}

/// Normalized result of one delivery attempt, shared by both triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub post_id: String,
    pub platform: Platform,
    pub success: bool,
    pub url: Option<String>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub published_at: Option<i64>,
}

impl PublishOutcome {
    pub fn succeeded(post_id: String, platform: Platform, url: String, published_at: i64) -> Self {
        Self {
            post_id,
            platform,
            success: true,
            url: Some(url),
            error: None,
            error_kind: None,
            published_at: Some(published_at),
        }
    }

    pub fn failed(
        post_id: String,
        platform: Platform,
        error: String,
        error_kind: ErrorKind,
    ) -> Self {
        Self {
            post_id,
            platform,
            success: false,
            url: None,
            error: Some(error),
            error_kind: Some(error_kind),
            published_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_new_uuid_generation() {
        let post = Post::new("Test".to_string(), Platform::Bluesky, "userA".to_string());
        assert!(uuid::Uuid::parse_str(&post.id).is_ok());
        assert_eq!(post.status, PostStatus::Draft);
        assert_eq!(post.scheduled_at, None);
        assert_eq!(post.url, None);
    }

    #[test]
    fn test_post_new_unique_ids() {
        let p1 = Post::new("a".to_string(), Platform::X, "u".to_string());
        let p2 = Post::new("b".to_string(), Platform::X, "u".to_string());
        assert_ne!(p1.id, p2.id);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            PostStatus::Draft,
            PostStatus::PendingApproval,
            PostStatus::ChangesRequested,
            PostStatus::Scheduled,
            PostStatus::Publishing,
            PostStatus::Published,
            PostStatus::Failed,
        ] {
            assert_eq!(PostStatus::parse_str(status.as_str()), Some(status));
        }
        assert_eq!(PostStatus::parse_str("bogus"), None);
    }

    #[test]
    fn test_platform_round_trip() {
        for platform in Platform::ALL {
            assert_eq!(Platform::parse_str(platform.as_str()), Some(platform));
        }
        assert_eq!(Platform::parse_str("TWITTER"), Some(Platform::X));
        assert_eq!(Platform::parse_str("myspace"), None);
    }

    #[test]
    fn test_only_x_is_quota_constrained() {
        assert!(Platform::X.quota_constrained());
        assert!(!Platform::Bluesky.quota_constrained());
        assert!(!Platform::Mastodon.quota_constrained());
    }

    #[test]
    fn test_error_kind_permanence() {
        assert!(ErrorKind::Unconfigured.is_permanent());
        assert!(ErrorKind::Unsupported.is_permanent());
        assert!(ErrorKind::QuotaExhausted.is_permanent());
        assert!(!ErrorKind::Transient.is_permanent());
    }

    #[test]
    fn test_role_elevation() {
        assert!(Role::Admin.is_elevated());
        assert!(Role::Approver.is_elevated());
        assert!(!Role::Editor.is_elevated());
    }

    #[test]
    fn test_monthly_usage_remaining() {
        let usage = MonthlyUsage { used: 490, limit: 500 };
        assert_eq!(usage.remaining(), 10);

        let over = MonthlyUsage { used: 510, limit: 500 };
        assert_eq!(over.remaining(), 0);
    }

    #[test]
    fn test_outcome_constructors() {
        let ok = PublishOutcome::succeeded(
            "p1".to_string(),
            Platform::Mastodon,
            "https://chaos.social/@ops/1".to_string(),
            1_700_000_000,
        );
        assert!(ok.success);
        assert!(ok.error.is_none());

        let bad = PublishOutcome::failed(
            "p2".to_string(),
            Platform::X,
            "X API: monthly limit reached".to_string(),
            ErrorKind::QuotaExhausted,
        );
        assert!(!bad.success);
        assert_eq!(bad.error_kind, Some(ErrorKind::QuotaExhausted));
        assert!(bad.published_at.is_none());
    }

    #[test]
    fn test_post_serialization_round_trip() {
        let post = Post {
            id: "test-id".to_string(),
            content: "Launch day".to_string(),
            platform: Platform::Bluesky,
            status: PostStatus::Scheduled,
            scheduled_at: Some(1_700_000_000),
            created_by: "userA".to_string(),
            created_at: 1_699_999_000,
            error: None,
            error_kind: None,
            url: None,
            published_at: None,
        };

        let json = serde_json::to_string(&post).unwrap();
        let back: Post = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, post.id);
        assert_eq!(back.platform, post.platform);
        assert_eq!(back.status, post.status);
        assert_eq!(back.scheduled_at, post.scheduled_at);
    }
}
