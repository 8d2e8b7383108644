//! Crosspost - publishing pipeline for multi-platform social posts
//!
//! This library provides the post lifecycle state machine, the delivery
//! orchestrator, quota gating, and the batch dispatcher shared by the
//! crosspost server binary.

pub mod authz;
pub mod config;
pub mod db;
pub mod delivery;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod quota;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use dispatch::{BatchDispatcher, BatchReport};
pub use error::{CrosspostError, Result};
pub use orchestrator::PublishOrchestrator;
pub use quota::QuotaGate;
pub use types::{Actor, ErrorKind, Platform, Post, PostStatus, PublishOutcome, Role};
