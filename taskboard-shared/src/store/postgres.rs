//! PostgreSQL document store
//!
//! Tasks and comments live in two plain tables (see `migrations/`). Change
//! notifications come from the database itself: an `AFTER INSERT OR DELETE`
//! trigger on `tasks` calls `pg_notify('task_changes', ...)` with a JSON
//! payload, and [`PgStore::spawn_change_listener`] forwards those payloads to
//! the broadcast channel handed out by `subscribe_tasks`. Writes made by other
//! API instances therefore reach every live view.
//!
//! # Example
//!
//! ```no_run
//! use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
//! use taskboard_shared::store::PgStore;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig {
//!     url: std::env::var("DATABASE_URL")?,
//!     ..Default::default()
//! })
//! .await?;
//!
//! let store = PgStore::new(pool);
//! let shutdown = CancellationToken::new();
//! let listener = store.spawn_change_listener(shutdown.clone());
//!
//! shutdown.cancel();
//! listener.await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sqlx::postgres::{PgListener, PgPool};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{DocumentStore, StoreResult, TaskChange, CHANGE_CHANNEL_CAPACITY};
use crate::models::{Comment, NewComment, NewTask, Task};

/// Channel the `tasks` trigger notifies on
pub const TASK_CHANGES_CHANNEL: &str = "task_changes";

/// Delay before re-establishing a failed listener connection
const LISTENER_RETRY_DELAY: Duration = Duration::from_secs(5);

/// PostgreSQL-backed `DocumentStore`
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    changes: broadcast::Sender<TaskChange>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { pool, changes }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Starts forwarding `task_changes` notifications to subscribers
    ///
    /// The listener reconnects on failure until `shutdown` is cancelled. After
    /// a reconnect it emits a `Resync` change because notifications sent while
    /// disconnected are lost.
    pub fn spawn_change_listener(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let pool = self.pool.clone();
        let changes = self.changes.clone();

        tokio::spawn(async move {
            loop {
                match forward_notifications(&pool, &changes, &shutdown).await {
                    Ok(()) => break,
                    Err(e) => {
                        warn!(error = %e, "Task change listener failed, retrying");
                        let _ = changes.send(TaskChange::resync());
                    }
                }

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(LISTENER_RETRY_DELAY) => {}
                }
            }

            info!("Task change listener stopped");
        })
    }
}

async fn forward_notifications(
    pool: &PgPool,
    changes: &broadcast::Sender<TaskChange>,
    shutdown: &CancellationToken,
) -> Result<(), sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(TASK_CHANGES_CHANNEL).await?;
    info!(channel = TASK_CHANGES_CHANNEL, "Listening for task changes");

    loop {
        let notification = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            received = listener.try_recv() => received?,
        };

        let Some(notification) = notification else {
            // Connection dropped and was re-established; anything in between is gone
            warn!("Task change listener reconnected, requesting resync");
            let _ = changes.send(TaskChange::resync());
            continue;
        };

        match serde_json::from_str::<TaskChange>(notification.payload()) {
            Ok(change) => {
                debug!(kind = ?change.kind, task_id = %change.task_id, "Task change received");
                let _ = changes.send(change);
            }
            Err(e) => {
                warn!(error = %e, payload = notification.payload(), "Ignoring malformed task change");
            }
        }
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn insert_task(&self, task: NewTask) -> StoreResult<Task> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (body, owner, is_public)
            VALUES ($1, $2, $3)
            RETURNING id, body, owner, is_public, created_at
            "#,
        )
        .bind(task.body())
        .bind(task.owner())
        .bind(task.public())
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, body, owner, is_public, created_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn list_tasks_by_owner(&self, owner: &str) -> StoreResult<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, body, owner, is_public, created_at
            FROM tasks
            WHERE owner = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (task_id, body, author, author_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, task_id, body, author, author_name, created_at
            "#,
        )
        .bind(comment.task_id)
        .bind(comment.body)
        .bind(comment.author)
        .bind(comment.author_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, task_id, body, author, author_name, created_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn list_comments_by_task(&self, task_id: Uuid) -> StoreResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, task_id, body, author, author_name, created_at
            FROM comments
            WHERE task_id = $1
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    fn subscribe_tasks(&self) -> broadcast::Receiver<TaskChange> {
        self.changes.subscribe()
    }

    async fn ping(&self) -> StoreResult<()> {
        crate::db::pool::health_check(&self.pool).await?;
        Ok(())
    }
}
