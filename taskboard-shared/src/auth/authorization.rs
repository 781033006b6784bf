//! Ownership checks for destructive operations
//!
//! Deletion is the only mutation the model allows, and it is restricted to the
//! record's creator: tasks may be deleted by their owner, comments by their
//! author. These checks run server-side in the repositories; hiding a delete
//! button in a client is not a substitute.
//!
//! For tasks the failure mode depends on visibility. A non-owner targeting a
//! private task gets the same answer as for a missing id, so ownership checks
//! never reveal that a private task exists.

use crate::models::{Comment, Task};

use super::session::Identity;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Requester may see the record but does not own it
    #[error("Not authorized to modify this resource")]
    NotAuthorized,

    /// Requester may not even learn the record exists
    #[error("Resource not found")]
    Hidden,
}

/// Requires `identity` to own `task`
pub fn require_task_owner(identity: &Identity, task: &Task) -> Result<(), AuthzError> {
    if task.is_owned_by(identity.email()) {
        Ok(())
    } else if task.public {
        Err(AuthzError::NotAuthorized)
    } else {
        Err(AuthzError::Hidden)
    }
}

/// Requires `identity` to have written `comment`
pub fn require_comment_author(identity: &Identity, comment: &Comment) -> Result<(), AuthzError> {
    if comment.is_authored_by(identity.email()) {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}
