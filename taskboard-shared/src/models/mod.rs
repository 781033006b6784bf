//! Data models for Taskboard
//!
//! # Models
//!
//! - `task`: user-authored text records with a public/private flag
//! - `comment`: replies attached to a single task
//!
//! Both models derive `sqlx::FromRow` so the PostgreSQL backend can read them
//! directly, and `Serialize` so the API can return them as-is.

pub mod comment;
pub mod task;

pub use comment::{Comment, NewComment};
pub use task::{NewTask, Task};

/// Input validation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Required text field is empty after trimming
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

impl ValidationError {
    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyField(field) => field,
        }
    }
}
