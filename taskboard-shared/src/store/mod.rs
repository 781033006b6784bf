//! Document store abstraction
//!
//! The repositories never talk to a database directly. They go through the
//! [`DocumentStore`] trait, which models the two collections the application
//! needs and the change feed the live task view listens to.
//!
//! # Collections
//!
//! ```text
//! tasks     insert | get by id | owner = X order by created_at desc | delete by id
//! comments  insert | get by id | task_id = X order by created_at asc | delete by id
//! ```
//!
//! # Change feed
//!
//! Every insert or delete on `tasks` is announced as a [`TaskChange`] on a
//! broadcast channel. Only tasks have a feed; comment threads are fetched on
//! demand.
//!
//! # Backends
//!
//! - [`postgres::PgStore`]: sqlx/PostgreSQL, changes via `LISTEN/NOTIFY`
//! - [`memory::MemoryStore`]: in-process maps, used by tests and local runs
//!
//! The store performs no authorization. Ownership and visibility rules live in
//! the repositories.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{Comment, NewComment, NewTask, Task};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Capacity of the task change broadcast channel
pub const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend cannot serve requests right now
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Kind of change observed on the tasks collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A task was written
    Inserted,

    /// A task was deleted
    Deleted,

    /// The feed may have missed changes; every listener should re-query
    Resync,
}

/// Notification emitted for every write to the tasks collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskChange {
    pub kind: ChangeKind,

    /// Affected task (nil for `Resync`)
    pub task_id: Uuid,

    /// Owner of the affected task (empty for `Resync`)
    pub owner: String,
}

impl TaskChange {
    pub fn inserted(task: &Task) -> Self {
        Self {
            kind: ChangeKind::Inserted,
            task_id: task.id,
            owner: task.owner.clone(),
        }
    }

    pub fn deleted(task: &Task) -> Self {
        Self {
            kind: ChangeKind::Deleted,
            task_id: task.id,
            owner: task.owner.clone(),
        }
    }

    pub fn resync() -> Self {
        Self {
            kind: ChangeKind::Resync,
            task_id: Uuid::nil(),
            owner: String::new(),
        }
    }

    /// Whether a listener watching `owner`'s tasks must refresh
    pub fn concerns(&self, owner: &str) -> bool {
        self.kind == ChangeKind::Resync || self.owner == owner
    }
}

/// Backing store for tasks and comments
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;

    /// Persists a task, assigning its id and timestamp
    async fn insert_task(&self, task: NewTask) -> StoreResult<Task>;

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    /// All tasks of `owner`, newest first
    async fn list_tasks_by_owner(&self, owner: &str) -> StoreResult<Vec<Task>>;

    /// Deletes a task; returns whether a record was removed
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;

    /// Persists a comment, assigning its id and timestamp
    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment>;

    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;

    /// All comments referencing `task_id`, in insertion order
    async fn list_comments_by_task(&self, task_id: Uuid) -> StoreResult<Vec<Comment>>;

    /// Deletes a comment; returns whether a record was removed
    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool>;

    /// Subscribes to the tasks change feed
    fn subscribe_tasks(&self) -> broadcast::Receiver<TaskChange>;

    /// Verifies the backend is reachable
    async fn ping(&self) -> StoreResult<()>;
}
