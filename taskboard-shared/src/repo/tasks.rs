//! Task repository
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use taskboard_shared::auth::{Identity, Session};
//! use taskboard_shared::repo::{RepoError, TaskRepository};
//! use taskboard_shared::store::MemoryStore;
//!
//! # async fn example() -> Result<(), RepoError> {
//! let tasks = TaskRepository::new(Arc::new(MemoryStore::new()));
//! let alice = Session::signed_in(Identity::new("alice@example.com", None));
//!
//! let task = tasks.create_task(&alice, "  Study chapter 4 ", false).await?;
//! assert_eq!(task.body, "Study chapter 4");
//!
//! // Private tasks look missing to everyone
//! assert!(matches!(
//!     tasks.get_public_task(task.id).await,
//!     Err(RepoError::NotFound(_))
//! ));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{RepoError, RepoResult};
use crate::auth::authorization::require_task_owner;
use crate::auth::{Identity, Session};
use crate::models::{NewTask, Task};
use crate::store::DocumentStore;

const RESOURCE: &str = "task";

/// Create/list/read/delete rules for tasks
#[derive(Clone)]
pub struct TaskRepository {
    store: Arc<dyn DocumentStore>,
}

impl TaskRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Creates a task owned by the session's user
    ///
    /// # Errors
    ///
    /// `Unauthenticated` for anonymous sessions, `Validation` when the body is
    /// blank after trimming. Nothing is written in either case.
    pub async fn create_task(&self, session: &Session, body: &str, public: bool) -> RepoResult<Task> {
        let identity = signed_in(session)?;
        let new_task = NewTask::new(body, identity.email(), public)?;

        let task = self.store.insert_task(new_task).await?;
        info!(task_id = %task.id, owner = %task.owner, public = task.public, "Task created");
        Ok(task)
    }

    /// Lists the session user's tasks, newest first
    pub async fn list_own_tasks(&self, session: &Session) -> RepoResult<Vec<Task>> {
        let identity = signed_in(session)?;
        let tasks = self.store.list_tasks_by_owner(identity.email()).await?;
        debug!(owner = identity.email(), count = tasks.len(), "Listed own tasks");
        Ok(tasks)
    }

    /// Reads a task through its share link
    ///
    /// Private tasks are reported as `NotFound`, whoever asks.
    pub async fn get_public_task(&self, id: Uuid) -> RepoResult<Task> {
        match self.store.get_task(id).await? {
            Some(task) if task.public => Ok(task),
            Some(_) => {
                debug!(task_id = %id, "Private task requested through public read");
                Err(RepoError::NotFound(RESOURCE))
            }
            None => Err(RepoError::NotFound(RESOURCE)),
        }
    }

    /// Deletes a task owned by the session user
    ///
    /// Comments on the task are left in place.
    ///
    /// # Errors
    ///
    /// `NotFound` when the task is missing, or private and owned by someone
    /// else. `Forbidden` when it is public and owned by someone else.
    pub async fn delete_task(&self, session: &Session, id: Uuid) -> RepoResult<()> {
        let identity = signed_in(session)?;

        let task = self
            .store
            .get_task(id)
            .await?
            .ok_or(RepoError::NotFound(RESOURCE))?;

        if let Err(e) = require_task_owner(identity, &task) {
            warn!(task_id = %id, requester = identity.email(), "Rejected task delete by non-owner");
            return Err(RepoError::from_authz(e, RESOURCE));
        }

        // A concurrent delete by the same owner already did the job
        if !self.store.delete_task(id).await? {
            return Err(RepoError::NotFound(RESOURCE));
        }

        info!(task_id = %id, owner = %task.owner, "Task deleted");
        Ok(())
    }
}

pub(super) fn signed_in(session: &Session) -> RepoResult<&Identity> {
    session.identity().ok_or(RepoError::Unauthenticated)
}
