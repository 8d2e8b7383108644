//! Authorization and approval policy for the manual trigger
//!
//! Ownership and role are checked before any approval-state gating, so a
//! caller with no claim to the post learns nothing about its state.

use crate::error::{CrosspostError, Result};
use crate::types::{Actor, Post, PostStatus};

/// Decide whether `actor` may manually publish `post` in its current state.
pub fn authorize_manual_publish(actor: &Actor, post: &Post) -> Result<()> {
    let is_owner = actor.id == post.created_by;
    let elevated = actor.role.is_elevated();

    if !is_owner && !elevated {
        return Err(CrosspostError::Authorization(
            "only the post owner or an approver may publish this post".to_string(),
        ));
    }

    match post.status {
        // Pending approval cannot be force-published by a non-approver,
        // owner or not.
        PostStatus::PendingApproval if !elevated => Err(CrosspostError::Authorization(
            "post is pending approval and can only be published by an approver".to_string(),
        )),
        // Hard gate: must re-enter the approval flow first, no exceptions.
        PostStatus::ChangesRequested => Err(CrosspostError::Authorization(
            "post has changes requested and must be resubmitted for approval".to_string(),
        )),
        PostStatus::Published => Err(CrosspostError::Conflict(
            "post is already published".to_string(),
        )),
        PostStatus::Publishing => Err(CrosspostError::Conflict(
            "post is currently being published".to_string(),
        )),
        _ => Ok(()),
    }
}
