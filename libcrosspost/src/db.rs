//! Database operations for Crosspost
//!
//! The posts table is the source of truth for the pipeline. Status moves
//! through [`transition_status`](Database::transition_status), a conditional
//! update that only succeeds when the current status still matches the
//! caller's expectation; a `false` return means another actor got there
//! first and the caller should skip, not retry.

use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::path::Path;
use tracing::warn;

use crate::error::{DbError, Result};
use crate::types::{Actor, ErrorKind, MonthlyUsage, Platform, Post, PostStatus, Role};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
        }

        // mode=rwc creates the database file if it doesn't exist.
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(DbError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DbError::MigrationError)?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Liveness probe for health checks.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;
        Ok(())
    }

    /// Create a new post
    pub async fn create_post(&self, post: &Post) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, content, platform, status, scheduled_at, created_by,
                               created_at, error, error_kind, url, published_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.content)
        .bind(post.platform.as_str())
        .bind(post.status.as_str())
        .bind(post.scheduled_at)
        .bind(&post.created_by)
        .bind(post.created_at)
        .bind(&post.error)
        .bind(post.error_kind.map(|k| k.as_str()))
        .bind(&post.url)
        .bind(post.published_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Get a post by ID
    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        let row = sqlx::query(
            r#"
            SELECT id, content, platform, status, scheduled_at, created_by,
                   created_at, error, error_kind, url, published_at
            FROM posts WHERE id = ?
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(row.map(row_to_post).transpose()?)
    }

    /// Fetch a bounded page of posts, oldest first.
    pub async fn list_posts(&self, limit: u32, offset: u32) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content, platform, status, scheduled_at, created_by,
                   created_at, error, error_kind, url, published_at
            FROM posts
            ORDER BY created_at ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        // A single corrupt row must not take down a whole batch sweep.
        let mut posts = Vec::with_capacity(rows.len());
        for row in rows {
            match row_to_post(row) {
                Ok(post) => posts.push(post),
                Err(e) => warn!("skipping unreadable post row: {e}"),
            }
        }
        Ok(posts)
    }

    /// Conditionally move a post from `expected` to `to`.
    ///
    /// Returns `Ok(true)` when the row was updated, `Ok(false)` when the
    /// current status no longer matched `expected` (someone else is
    /// handling the post).
    pub async fn transition_status(
        &self,
        post_id: &str,
        expected: PostStatus,
        to: PostStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE posts SET status = ? WHERE id = ? AND status = ?
            "#,
        )
        .bind(to.as_str())
        .bind(post_id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() == 1)
    }

    /// Terminal bookkeeping for a successful delivery.
    pub async fn mark_published(&self, post_id: &str, url: &str, published_at: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE posts
            SET status = 'published', url = ?, published_at = ?, error = NULL, error_kind = NULL
            WHERE id = ?
            "#,
        )
        .bind(url)
        .bind(published_at)
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Terminal bookkeeping for a failed delivery. Preserves the message for
    /// display and the typed kind for retry classification.
    pub async fn mark_failed(
        &self,
        post_id: &str,
        error: &str,
        error_kind: ErrorKind,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE posts SET status = 'failed', error = ?, error_kind = ? WHERE id = ?
            "#,
        )
        .bind(error)
        .bind(error_kind.as_str())
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Read the current month's usage for a platform.
    ///
    /// Callers must read this immediately before each gating decision; the
    /// counter moves under concurrent manual triggers.
    pub async fn monthly_usage(
        &self,
        platform: Platform,
        limit: u32,
        now: i64,
    ) -> Result<MonthlyUsage> {
        let row = sqlx::query_as::<_, (Option<i64>,)>(
            r#"
            SELECT used FROM platform_usage WHERE platform = ? AND month = ?
            "#,
        )
        .bind(platform.as_str())
        .bind(month_key(now))
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        let used = row.and_then(|r| r.0).unwrap_or(0) as u32;
        Ok(MonthlyUsage { used, limit })
    }

    /// Record one successful send against the platform's monthly counter.
    ///
    /// Called by the delivery layer after the platform accepted the post;
    /// the dispatch paths themselves never write here.
    pub async fn record_usage(&self, platform: Platform, now: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO platform_usage (platform, month, used)
            VALUES (?, ?, 1)
            ON CONFLICT(platform, month)
            DO UPDATE SET used = used + 1
            "#,
        )
        .bind(platform.as_str())
        .bind(month_key(now))
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Look up the actor behind a session token.
    pub async fn get_session(&self, token: &str) -> Result<Option<Actor>> {
        let row = sqlx::query(
            r#"
            SELECT actor_id, role FROM sessions WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(row.and_then(|r| {
            let role = Role::parse_str(&r.get::<String, _>("role"))?;
            Some(Actor {
                id: r.get("actor_id"),
                role,
            })
        }))
    }

    /// Create a session token for an actor.
    pub async fn create_session(&self, token: &str, actor: &Actor) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token, actor_id, role, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(token)
        .bind(&actor.id)
        .bind(actor.role.as_str())
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }
}

/// Calendar-month key ("2026-08") for the usage table.
fn month_key(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .format("%Y-%m")
        .to_string()
}

fn row_to_post(r: sqlx::sqlite::SqliteRow) -> std::result::Result<Post, DbError> {
    let id: String = r.get("id");
    // An unknown platform or status string means the row was written outside
    // the pipeline. Surface it rather than guessing a state.
    let platform_str: String = r.get("platform");
    let platform = Platform::parse_str(&platform_str)
        .ok_or_else(|| DbError::CorruptRow(format!("post {id}: unknown platform '{platform_str}'")))?;
    let status_str: String = r.get("status");
    let status = PostStatus::parse_str(&status_str)
        .ok_or_else(|| DbError::CorruptRow(format!("post {id}: unknown status '{status_str}'")))?;

    Ok(Post {
        id,
        content: r.get("content"),
        platform,
        status,
        scheduled_at: r.get("scheduled_at"),
        created_by: r.get("created_by"),
        created_at: r.get("created_at"),
        error: r.get("error"),
        error_kind: r
            .get::<Option<String>, _>("error_kind")
            .and_then(|k| ErrorKind::parse_str(&k)),
        url: r.get("url"),
        published_at: r.get("published_at"),
    })
}
