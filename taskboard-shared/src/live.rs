//! Live view of a user's own tasks
//!
//! [`LiveTaskView`] keeps a projection of "every task owned by the current
//! user, newest first" in step with the store. It never applies diffs: each
//! relevant change notification triggers a full re-query and the result
//! replaces the projection wholesale.
//!
//! # Subscription lifecycle
//!
//! ```text
//! set_session(signed in as A)   -> subscription #1 for A
//! set_session(signed in as A)   -> no-op
//! set_session(signed in as B)   -> #1 cancelled, subscription #2 for B
//! set_session(anonymous)        -> #2 cancelled, projection cleared
//! drop(view)                    -> active subscription cancelled
//! ```
//!
//! Every subscription carries the generation number it was opened under. A
//! refresh only lands if the projection still has that generation, so results
//! from a replaced subscription are discarded even if its query was already in
//! flight when it was cancelled.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use taskboard_shared::auth::{Identity, Session};
//! use taskboard_shared::live::LiveTaskView;
//! use taskboard_shared::store::MemoryStore;
//!
//! # async fn example() {
//! let mut view = LiveTaskView::new(Arc::new(MemoryStore::new()));
//! view.set_session(&Session::signed_in(Identity::new("alice@example.com", None)));
//!
//! let mut updates = view.watch();
//! let synced = updates.wait_for(|p| p.synced).await.unwrap();
//! assert!(synced.tasks.is_empty());
//! # }
//! ```

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::Session;
use crate::models::Task;
use crate::store::{DocumentStore, TaskChange};

/// Snapshot of the live view
#[derive(Debug, Clone, Default)]
pub struct Projection {
    /// Whose tasks these are (`None` when signed out)
    pub owner: Option<String>,

    /// Bumped every time the subscription is replaced or torn down
    pub generation: u64,

    /// Whether at least one full snapshot has landed for this generation
    pub synced: bool,

    /// Owner's tasks, newest first
    pub tasks: Arc<Vec<Task>>,
}

struct Subscription {
    owner: String,
    cancel: CancellationToken,
}

/// Full-refresh projection of the signed-in user's tasks
///
/// Must be used from within a Tokio runtime: opening a subscription spawns
/// the task that listens for changes.
pub struct LiveTaskView {
    store: Arc<dyn DocumentStore>,
    state: Arc<watch::Sender<Projection>>,
    subscription: Option<Subscription>,
}

impl LiveTaskView {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let (state, _) = watch::channel(Projection::default());

        Self {
            store,
            state: Arc::new(state),
            subscription: None,
        }
    }

    /// Follows the session's identity
    ///
    /// Signing in opens one subscription for that user, replacing any other.
    /// Signing out tears it down and clears the projection.
    pub fn set_session(&mut self, session: &Session) {
        let owner = session.email();

        if let (Some(current), Some(owner)) = (&self.subscription, owner) {
            if current.owner == owner {
                return;
            }
        }

        if let Some(previous) = self.subscription.take() {
            debug!(owner = %previous.owner, "Cancelling live task subscription");
            previous.cancel.cancel();
        }

        let mut generation = 0;
        self.state.send_modify(|projection| {
            projection.generation += 1;
            projection.owner = owner.map(str::to_string);
            projection.synced = false;
            projection.tasks = Arc::new(Vec::new());
            generation = projection.generation;
        });

        let Some(owner) = owner else {
            return;
        };

        // Subscribe before the first query so no change slips between them
        let changes = self.store.subscribe_tasks();
        let cancel = CancellationToken::new();

        info!(owner, generation, "Opening live task subscription");
        tokio::spawn(follow_changes(
            Arc::clone(&self.store),
            Arc::clone(&self.state),
            owner.to_string(),
            generation,
            changes,
            cancel.clone(),
        ));

        self.subscription = Some(Subscription {
            owner: owner.to_string(),
            cancel,
        });
    }

    /// Current projection
    pub fn projection(&self) -> Projection {
        self.state.borrow().clone()
    }

    /// Receiver notified whenever the projection changes
    pub fn watch(&self) -> watch::Receiver<Projection> {
        self.state.subscribe()
    }

    /// Shows a just-created task before the store confirms it
    ///
    /// Ignored when the task belongs to someone else or is already present.
    /// The next snapshot replaces the projection, so an optimistic entry is
    /// either confirmed or dropped there.
    pub fn insert_optimistic(&self, task: Task) {
        self.state.send_if_modified(|projection| {
            if projection.owner.as_deref() != Some(task.owner.as_str())
                || projection.tasks.iter().any(|t| t.id == task.id)
            {
                return false;
            }

            let mut tasks = Vec::with_capacity(projection.tasks.len() + 1);
            tasks.push(task);
            tasks.extend(projection.tasks.iter().cloned());
            projection.tasks = Arc::new(tasks);
            true
        });
    }

    /// Whether a subscription is currently open
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }
}

impl Drop for LiveTaskView {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel.cancel();
        }
    }
}

async fn follow_changes(
    store: Arc<dyn DocumentStore>,
    state: Arc<watch::Sender<Projection>>,
    owner: String,
    generation: u64,
    mut changes: broadcast::Receiver<TaskChange>,
    cancel: CancellationToken,
) {
    refresh(store.as_ref(), &state, &owner, generation).await;

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = changes.recv() => received,
        };

        match received {
            Ok(change) if change.concerns(&owner) => {
                debug!(owner = %owner, kind = ?change.kind, "Task change, refreshing");
            }
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                warn!(owner = %owner, skipped, "Live task subscription lagged, refreshing");
            }
            Err(RecvError::Closed) => {
                warn!(owner = %owner, "Task change feed closed");
                break;
            }
        }

        if cancel.is_cancelled() {
            break;
        }
        refresh(store.as_ref(), &state, &owner, generation).await;
    }

    debug!(owner = %owner, generation, "Live task subscription stopped");
}

/// Re-queries the owner's tasks and swaps them in if the generation still matches
async fn refresh(
    store: &dyn DocumentStore,
    state: &watch::Sender<Projection>,
    owner: &str,
    generation: u64,
) {
    let tasks = match store.list_tasks_by_owner(owner).await {
        Ok(tasks) => tasks,
        Err(e) => {
            // Keep the last good snapshot; the next change retries
            warn!(owner, error = %e, "Failed to refresh live task view");
            return;
        }
    };

    let count = tasks.len();
    let applied = state.send_if_modified(|projection| {
        if projection.generation != generation {
            return false;
        }
        projection.tasks = Arc::new(tasks);
        projection.synced = true;
        true
    });

    if applied {
        debug!(owner, generation, count, "Live task view refreshed");
    } else {
        debug!(owner, generation, "Discarded refresh from replaced subscription");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::models::{Comment, NewComment, NewTask};
    use crate::store::{MemoryStore, StoreResult, CHANGE_CHANNEL_CAPACITY};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;
    use uuid::Uuid;

    /// Memory store with a hand-driven change feed and an optional pause on
    /// one owner's task query
    struct ScriptedStore {
        inner: MemoryStore,
        changes: broadcast::Sender<TaskChange>,
        list_calls: AtomicUsize,
        paused_owner: Option<String>,
        query_started: Notify,
        resume: Notify,
        query_finished: Notify,
    }

    impl ScriptedStore {
        fn new(paused_owner: Option<&str>) -> Self {
            let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
            Self {
                inner: MemoryStore::new(),
                changes,
                list_calls: AtomicUsize::new(0),
                paused_owner: paused_owner.map(str::to_string),
                query_started: Notify::new(),
                resume: Notify::new(),
                query_finished: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl DocumentStore for ScriptedStore {
        fn backend(&self) -> &'static str {
            "scripted"
        }

        async fn insert_task(&self, task: NewTask) -> StoreResult<Task> {
            self.inner.insert_task(task).await
        }

        async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
            self.inner.get_task(id).await
        }

        async fn list_tasks_by_owner(&self, owner: &str) -> StoreResult<Vec<Task>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);

            if self.paused_owner.as_deref() != Some(owner) {
                return self.inner.list_tasks_by_owner(owner).await;
            }

            self.query_started.notify_one();
            self.resume.notified().await;
            let tasks = self.inner.list_tasks_by_owner(owner).await;
            self.query_finished.notify_one();
            tasks
        }

        async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
            self.inner.delete_task(id).await
        }

        async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
            self.inner.insert_comment(comment).await
        }

        async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
            self.inner.get_comment(id).await
        }

        async fn list_comments_by_task(&self, task_id: Uuid) -> StoreResult<Vec<Comment>> {
            self.inner.list_comments_by_task(task_id).await
        }

        async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
            self.inner.delete_comment(id).await
        }

        fn subscribe_tasks(&self) -> broadcast::Receiver<TaskChange> {
            self.changes.subscribe()
        }

        async fn ping(&self) -> StoreResult<()> {
            self.inner.ping().await
        }
    }

    fn session(email: &str) -> Session {
        Session::signed_in(Identity::new(email, None))
    }

    async fn wait_for<F>(view: &LiveTaskView, mut predicate: F) -> Projection
    where
        F: FnMut(&Projection) -> bool,
    {
        let mut rx = view.watch();
        let projection = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|p| predicate(p)))
            .await
            .expect("projection never matched")
            .expect("projection sender dropped");
        projection.clone()
    }

    #[tokio::test]
    async fn test_initial_snapshot() {
        let store = Arc::new(MemoryStore::new());
        store.insert_task(NewTask::new("existing", "a@example.com", false).unwrap()).await.unwrap();

        let mut view = LiveTaskView::new(store);
        view.set_session(&session("a@example.com"));

        let projection = wait_for(&view, |p| p.synced).await;
        assert_eq!(projection.owner.as_deref(), Some("a@example.com"));
        assert_eq!(projection.tasks.len(), 1);
        assert_eq!(projection.tasks[0].body, "existing");
    }

    #[tokio::test]
    async fn test_same_session_keeps_subscription() {
        let mut view = LiveTaskView::new(Arc::new(MemoryStore::new()));
        view.set_session(&session("a@example.com"));
        let generation = view.projection().generation;

        view.set_session(&session("a@example.com"));
        assert_eq!(view.projection().generation, generation);
    }

    #[tokio::test]
    async fn test_sign_out_clears_projection() {
        let store = Arc::new(MemoryStore::new());
        store.insert_task(NewTask::new("task", "a@example.com", false).unwrap()).await.unwrap();

        let mut view = LiveTaskView::new(store);
        view.set_session(&session("a@example.com"));
        wait_for(&view, |p| p.synced).await;

        view.set_session(&Session::anonymous());
        let projection = view.projection();
        assert!(!view.is_subscribed());
        assert!(projection.owner.is_none());
        assert!(projection.tasks.is_empty());
        assert!(!projection.synced);
    }

    #[tokio::test]
    async fn test_optimistic_insert_is_reconciled() {
        let store = Arc::new(MemoryStore::new());
        let mut view = LiveTaskView::new(store.clone());
        view.set_session(&session("a@example.com"));
        wait_for(&view, |p| p.synced).await;

        let task = store
            .insert_task(NewTask::new("fresh", "a@example.com", false).unwrap())
            .await
            .unwrap();
        view.insert_optimistic(task.clone());
        view.insert_optimistic(task.clone());

        let projection = wait_for(&view, |p| p.tasks.iter().any(|t| t.id == task.id)).await;
        assert_eq!(projection.tasks.iter().filter(|t| t.id == task.id).count(), 1);
    }

    #[tokio::test]
    async fn test_optimistic_insert_ignores_other_owner() {
        let mut view = LiveTaskView::new(Arc::new(MemoryStore::new()));
        view.set_session(&session("a@example.com"));
        wait_for(&view, |p| p.synced).await;

        view.insert_optimistic(Task {
            id: Uuid::new_v4(),
            body: "not mine".to_string(),
            owner: "b@example.com".to_string(),
            public: false,
            created_at: Utc::now(),
        });
        assert!(view.projection().tasks.is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_refresh_from_replaced_subscription_is_discarded() {
        let store = Arc::new(ScriptedStore::new(Some("a@example.com")));
        store.insert_task(NewTask::new("alice's", "a@example.com", false).unwrap()).await.unwrap();
        let bobs = store.insert_task(NewTask::new("bob's", "b@example.com", false).unwrap()).await.unwrap();

        let mut view = LiveTaskView::new(store.clone());
        view.set_session(&session("a@example.com"));
        store.query_started.notified().await;

        // Alice's first query is still running when the user switches
        view.set_session(&session("b@example.com"));
        let projection = wait_for(&view, |p| p.synced).await;
        assert_eq!(projection.owner.as_deref(), Some("b@example.com"));

        let mut rx = view.watch();
        rx.borrow_and_update();

        store.resume.notify_one();
        store.query_finished.notified().await;

        assert!(!rx.has_changed().unwrap());
        let projection = view.projection();
        assert_eq!(projection.owner.as_deref(), Some("b@example.com"));
        assert_eq!(projection.generation, 2);
        assert_eq!(projection.tasks.len(), 1);
        assert_eq!(projection.tasks[0].id, bobs.id);
    }

    #[tokio::test]
    async fn test_lagged_subscription_refreshes() {
        let store = Arc::new(ScriptedStore::new(None));
        let mut view = LiveTaskView::new(store.clone());
        view.set_session(&session("a@example.com"));
        wait_for(&view, |p| p.synced).await;

        let burst = CHANGE_CHANNEL_CAPACITY + 44;
        let mut inserted = Vec::with_capacity(burst);
        for i in 0..burst {
            let task = store
                .insert_task(NewTask::new(&format!("task {i}"), "a@example.com", false).unwrap())
                .await
                .unwrap();
            inserted.push(task);
        }

        // Announce everything without yielding, so the subscriber falls behind
        for task in &inserted {
            store.changes.send(TaskChange::inserted(task)).unwrap();
        }

        let projection = wait_for(&view, |p| p.tasks.len() == burst).await;
        assert_eq!(projection.tasks[0].id, inserted[burst - 1].id);

        // Skipped notifications were folded into one refresh
        assert!(store.list_calls.load(Ordering::SeqCst) <= 2 + CHANGE_CHANNEL_CAPACITY);
    }
}
