//! In-process document store
//!
//! Keeps tasks and comments in memory behind a Tokio `RwLock`. Timestamps are
//! forced to be strictly increasing so "newest first" is a total order even
//! when two writes land within the same clock tick.
//!
//! `set_offline(true)` makes every operation fail with
//! `StoreError::Unavailable`, which lets callers exercise their failure paths.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::{DocumentStore, StoreError, StoreResult, TaskChange, CHANGE_CHANNEL_CAPACITY};
use crate::models::{Comment, NewComment, NewTask, Task};

#[derive(Default)]
struct Collections {
    tasks: HashMap<Uuid, Task>,

    /// Insertion order is the listing order
    comments: Vec<Comment>,

    last_timestamp: Option<DateTime<Utc>>,
}

impl Collections {
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }
}

/// Memory-backed `DocumentStore`
pub struct MemoryStore {
    collections: RwLock<Collections>,
    changes: broadcast::Sender<TaskChange>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Self {
            collections: RwLock::new(Collections::default()),
            changes,
            offline: AtomicBool::new(false),
        }
    }

    /// Toggles simulated unavailability
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn task_count(&self) -> usize {
        self.collections.read().await.tasks.len()
    }

    pub async fn comment_count(&self) -> usize {
        self.collections.read().await.comments.len()
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    fn publish(&self, change: TaskChange) {
        // No receivers is fine: nobody is watching
        let _ = self.changes.send(change);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert_task(&self, task: NewTask) -> StoreResult<Task> {
        self.ensure_online()?;

        let mut collections = self.collections.write().await;
        let task = Task {
            id: Uuid::new_v4(),
            body: task.body().to_string(),
            owner: task.owner().to_string(),
            public: task.public(),
            created_at: collections.next_timestamp(),
        };
        collections.tasks.insert(task.id, task.clone());
        drop(collections);

        debug!(task_id = %task.id, owner = %task.owner, "Task inserted");
        self.publish(TaskChange::inserted(&task));
        Ok(task)
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        self.ensure_online()?;
        Ok(self.collections.read().await.tasks.get(&id).cloned())
    }

    async fn list_tasks_by_owner(&self, owner: &str) -> StoreResult<Vec<Task>> {
        self.ensure_online()?;

        let collections = self.collections.read().await;
        let mut tasks: Vec<Task> = collections
            .tasks
            .values()
            .filter(|task| task.owner == owner)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        Ok(tasks)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        self.ensure_online()?;

        let removed = self.collections.write().await.tasks.remove(&id);
        match removed {
            Some(task) => {
                debug!(task_id = %task.id, owner = %task.owner, "Task deleted");
                self.publish(TaskChange::deleted(&task));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        self.ensure_online()?;

        let mut collections = self.collections.write().await;
        let comment = Comment {
            id: Uuid::new_v4(),
            task_id: comment.task_id,
            body: comment.body,
            author: comment.author,
            author_name: comment.author_name,
            created_at: collections.next_timestamp(),
        };
        collections.comments.push(comment.clone());

        debug!(comment_id = %comment.id, task_id = %comment.task_id, "Comment inserted");
        Ok(comment)
    }

    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        self.ensure_online()?;

        let collections = self.collections.read().await;
        Ok(collections.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn list_comments_by_task(&self, task_id: Uuid) -> StoreResult<Vec<Comment>> {
        self.ensure_online()?;

        let collections = self.collections.read().await;
        Ok(collections
            .comments
            .iter()
            .filter(|c| c.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        self.ensure_online()?;

        let mut collections = self.collections.write().await;
        let before = collections.comments.len();
        collections.comments.retain(|c| c.id != id);
        Ok(collections.comments.len() < before)
    }

    fn subscribe_tasks(&self) -> broadcast::Receiver<TaskChange> {
        self.changes.subscribe()
    }

    async fn ping(&self) -> StoreResult<()> {
        self.ensure_online()
    }
}
