//! Task model
//!
//! A task is a short text record owned by the user who created it. Tasks are
//! immutable once written: there is no update path, only create and delete.
//!
//! # Visibility
//!
//! ```text
//! public = false  → readable by the owner only
//! public = true   → readable by anyone holding the id (share link)
//! ```
//!
//! A private task is indistinguishable from a missing one for everybody except
//! its owner. This is visibility-by-obscurity, not an access-control boundary.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE tasks (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     body TEXT NOT NULL CHECK (length(btrim(body)) > 0),
//!     owner TEXT NOT NULL,
//!     is_public BOOLEAN NOT NULL DEFAULT FALSE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
//! );
//! ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;

/// Relative path under which a public task can be shared
pub const SHARE_PATH_PREFIX: &str = "/task";

/// Task record as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Store-assigned identifier
    pub id: Uuid,

    /// Task text (already trimmed)
    pub body: String,

    /// Email of the creating user
    pub owner: String,

    /// Whether non-owners may read the task
    #[sqlx(rename = "is_public")]
    pub public: bool,

    /// When the task was written
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Checks whether `identity` owns this task
    pub fn is_owned_by(&self, identity: &str) -> bool {
        self.owner == identity
    }

    /// Relative share path, only for public tasks
    pub fn share_path(&self) -> Option<String> {
        self.public
            .then(|| format!("{}/{}", SHARE_PATH_PREFIX, self.id))
    }
}

/// Validated input for creating a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    body: String,
    owner: String,
    public: bool,
}

impl NewTask {
    /// Builds a new task, trimming the body
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyField("body")` when the body is empty
    /// after trimming whitespace.
    pub fn new(
        body: &str,
        owner: impl Into<String>,
        public: bool,
    ) -> Result<Self, ValidationError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ValidationError::EmptyField("body"));
        }

        Ok(Self {
            body: body.to_string(),
            owner: owner.into(),
            public,
        })
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn public(&self) -> bool {
        self.public
    }
}
