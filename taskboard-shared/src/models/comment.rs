//! Comment model
//!
//! Comments are text replies attached to exactly one task. The author's
//! display name is copied onto the comment when it is written so that the
//! thread can be rendered without consulting the identity provider.
//!
//! Comments reference their task by id only. Deleting a task leaves its
//! comments in place.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE comments (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     task_id UUID NOT NULL,
//!     body TEXT NOT NULL,
//!     author TEXT NOT NULL,
//!     author_name TEXT NOT NULL DEFAULT '',
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
//! );
//! ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Comment record as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    /// Store-assigned identifier
    pub id: Uuid,

    /// Task this comment replies to
    pub task_id: Uuid,

    /// Comment text, stored as given
    pub body: String,

    /// Email of the commenting user
    pub author: String,

    /// Display name of the author at write time (may be empty)
    pub author_name: String,

    /// When the comment was written
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Checks whether `identity` wrote this comment
    pub fn is_authored_by(&self, identity: &str) -> bool {
        self.author == identity
    }
}

/// Input for creating a comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub task_id: Uuid,
    pub body: String,
    pub author: String,
    pub author_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_authored_by() {
        let comment = Comment {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            body: "Nice!".to_string(),
            author: "b@example.com".to_string(),
            author_name: "Bea".to_string(),
            created_at: Utc::now(),
        };

        assert!(comment.is_authored_by("b@example.com"));
        assert!(!comment.is_authored_by("a@example.com"));
    }
}
