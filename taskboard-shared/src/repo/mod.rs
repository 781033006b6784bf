//! Repositories enforcing the visibility and ownership model
//!
//! Every operation takes the caller's [`Session`](crate::auth::Session)
//! explicitly. The repositories are the only place where the rules live:
//!
//! - only signed-in users write
//! - private tasks are indistinguishable from missing ones to anyone but
//!   their owner
//! - tasks are deleted by their owner, comments by their author
//!
//! Both repositories are cheap to clone and share one `Arc<dyn DocumentStore>`.

pub mod comments;
pub mod tasks;

use crate::auth::authorization::AuthzError;
use crate::models::ValidationError;
use crate::store::StoreError;

pub use comments::CommentRepository;
pub use tasks::TaskRepository;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Input rejected before reaching the store
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Record missing, or hidden from the requester
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Requester can see the record but may not modify it
    #[error("Not allowed to delete this {0}")]
    Forbidden(&'static str),

    /// Operation needs a signed-in session
    #[error("Sign-in required")]
    Unauthenticated,

    /// Backend failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RepoError {
    fn from_authz(err: AuthzError, resource: &'static str) -> Self {
        match err {
            AuthzError::NotAuthorized => Self::Forbidden(resource),
            AuthzError::Hidden => Self::NotFound(resource),
        }
    }
}

/// Repository result type alias
pub type RepoResult<T> = Result<T, RepoError>;
