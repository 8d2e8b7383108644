//! Post lifecycle state machine and dispatch eligibility
//!
//! The transition table here is the single source of truth for which status
//! edges exist. Everything that moves a post between states (the pipeline CAS
//! step, the external editorial UI) is expected to check it.

use crate::types::{ErrorKind, Post, PostStatus};

/// Substring markers for permanent failures in rows written before the typed
/// `error_kind` column existed. Checked only when the typed kind is absent.
const PERMANENT_MARKERS: [&str; 3] = [
    "platform not configured",
    "platform not yet supported",
    "monthly limit reached",
];

/// Whether `from -> to` is an edge of the lifecycle state machine.
pub fn can_transition(from: PostStatus, to: PostStatus) -> bool {
    use PostStatus::*;
    matches!(
        (from, to),
        (Draft, PendingApproval)
            | (PendingApproval, ChangesRequested)
            | (PendingApproval, Scheduled)
            | (PendingApproval, Published)
            | (ChangesRequested, PendingApproval)
            | (Scheduled, Publishing)
            | (Draft, Publishing)
            | (Failed, Publishing)
            | (PendingApproval, Publishing)
            | (Publishing, Published)
            | (Publishing, Failed)
    )
}

/// Statuses from which a dispatch may move the post into `Publishing`.
///
/// `PendingApproval` only reaches dispatch through the manual trigger,
/// where the authorization policy restricts it to elevated roles.
/// `ChangesRequested` is a hard gate: it must return to `PendingApproval`
/// first and never dispatches directly.
pub fn is_dispatchable(status: PostStatus) -> bool {
    matches!(
        status,
        PostStatus::Scheduled
            | PostStatus::Draft
            | PostStatus::Failed
            | PostStatus::PendingApproval
    )
}

/// Whether a failed post may be retried by a later batch run.
///
/// A typed kind wins when present; otherwise fall back to substring
/// classification of the stored message.
pub fn retryable(error_kind: Option<ErrorKind>, error: Option<&str>) -> bool {
    if let Some(kind) = error_kind {
        return !kind.is_permanent();
    }
    match error {
        Some(message) => !PERMANENT_MARKERS.iter().any(|m| message.contains(m)),
        // No recorded error at all: nothing marks it permanent.
        None => true,
    }
}

/// Whether a post is a candidate for the batch dispatcher at `now`.
///
/// Scheduled posts qualify once their scheduled time has passed; failed
/// posts qualify while their failure classifies as retryable. Drafts are
/// dispatchable manually but are never swept up by the batch run.
pub fn batch_eligible(post: &Post, now: i64) -> bool {
    match post.status {
        PostStatus::Scheduled => post.scheduled_at.is_some_and(|at| at <= now),
        PostStatus::Failed => retryable(post.error_kind, post.error.as_deref()),
        _ => false,
    }
}
