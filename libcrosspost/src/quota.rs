//! Monthly quota gating for the constrained platform
//!
//! The gate only ever reads the usage counter; recording happens in the
//! pipeline bookkeeping after a successful delivery. The counter moves
//! under concurrent manual triggers, so callers take a fresh read
//! immediately before each gating decision instead of caching one.

use crate::db::Database;
use crate::error::Result;
use crate::types::{MonthlyUsage, Platform};

#[derive(Debug, Clone, Copy)]
pub struct QuotaGate {
    platform: Platform,
    monthly_limit: u32,
}

impl QuotaGate {
    /// Gate for X, the one platform with a hard monthly send limit.
    pub fn for_x(monthly_limit: u32) -> Self {
        Self {
            platform: Platform::X,
            monthly_limit,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Fresh usage read for the constrained platform.
    pub async fn usage(&self, db: &Database, now: i64) -> Result<MonthlyUsage> {
        db.monthly_usage(self.platform, self.monthly_limit, now).await
    }

    /// Whether a post targeting `platform` is blocked under `usage`.
    ///
    /// Posts for other platforms are never blocked by this gate.
    pub fn blocks(&self, platform: Platform, usage: &MonthlyUsage) -> bool {
        platform == self.platform && usage.remaining() == 0
    }
}
