//! Comment repository
//!
//! Comment bodies are stored as given, empty text included. Only public tasks
//! take comments, so a private task never has a thread that could betray it.
//! Listing does not check the task, so comments on a deleted task stay
//! readable.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::tasks::signed_in;
use super::{RepoError, RepoResult};
use crate::auth::authorization::require_comment_author;
use crate::auth::Session;
use crate::models::{Comment, NewComment};
use crate::store::DocumentStore;

const RESOURCE: &str = "comment";

/// Add/list/delete rules for comments
#[derive(Clone)]
pub struct CommentRepository {
    store: Arc<dyn DocumentStore>,
}

impl CommentRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Attaches a comment to a public task
    ///
    /// # Errors
    ///
    /// `Unauthenticated` for anonymous sessions. `NotFound` when the task is
    /// missing or private, including for its owner.
    pub async fn add_comment(&self, session: &Session, task_id: Uuid, body: &str) -> RepoResult<Comment> {
        let identity = signed_in(session)?;

        let public = self
            .store
            .get_task(task_id)
            .await?
            .is_some_and(|task| task.public);
        if !public {
            return Err(RepoError::NotFound("task"));
        }

        let comment = self
            .store
            .insert_comment(NewComment {
                task_id,
                body: body.to_string(),
                author: identity.email().to_string(),
                author_name: identity.display_name().unwrap_or_default().to_string(),
            })
            .await?;

        info!(comment_id = %comment.id, task_id = %task_id, author = %comment.author, "Comment added");
        Ok(comment)
    }

    /// Lists a task's comments in the order they were written
    ///
    /// A task without comments yields an empty vector.
    pub async fn list_comments(&self, task_id: Uuid) -> RepoResult<Vec<Comment>> {
        Ok(self.store.list_comments_by_task(task_id).await?)
    }

    /// Deletes a comment written by the session user
    pub async fn delete_comment(&self, session: &Session, id: Uuid) -> RepoResult<()> {
        let identity = signed_in(session)?;

        let comment = self
            .store
            .get_comment(id)
            .await?
            .ok_or(RepoError::NotFound(RESOURCE))?;

        if let Err(e) = require_comment_author(identity, &comment) {
            warn!(comment_id = %id, requester = identity.email(), "Rejected comment delete by non-author");
            return Err(RepoError::from_authz(e, RESOURCE));
        }

        if !self.store.delete_comment(id).await? {
            return Err(RepoError::NotFound(RESOURCE));
        }

        info!(comment_id = %id, task_id = %comment.task_id, "Comment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::repo::TaskRepository;
    use crate::store::MemoryStore;

    struct Fixture {
        tasks: TaskRepository,
        comments: CommentRepository,
        store: Arc<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        Fixture {
            tasks: TaskRepository::new(store.clone()),
            comments: CommentRepository::new(store.clone()),
            store,
        }
    }

    fn session(email: &str, name: Option<&str>) -> Session {
        Session::signed_in(Identity::new(email, name.map(str::to_string)))
    }

    #[tokio::test]
    async fn test_add_comment_denormalizes_name() {
        let f = fixture();
        let alice = session("a@example.com", None);
        let bob = session("b@example.com", Some("Bob"));

        let task = f.tasks.create_task(&alice, "shared", true).await.unwrap();
        let from_bob = f.comments.add_comment(&bob, task.id, "Nice!").await.unwrap();
        let from_alice = f.comments.add_comment(&alice, task.id, "").await.unwrap();

        assert_eq!(from_bob.author, "b@example.com");
        assert_eq!(from_bob.author_name, "Bob");
        assert_eq!(from_alice.author_name, "");
        assert_eq!(from_alice.body, "");
    }

    #[tokio::test]
    async fn test_add_comment_requires_public_task() {
        let f = fixture();
        let alice = session("a@example.com", None);
        let bob = session("b@example.com", None);

        let private = f.tasks.create_task(&alice, "mine", false).await.unwrap();

        assert!(matches!(
            f.comments.add_comment(&bob, private.id, "hi").await,
            Err(RepoError::NotFound("task"))
        ));
        assert!(matches!(
            f.comments.add_comment(&bob, Uuid::new_v4(), "hi").await,
            Err(RepoError::NotFound("task"))
        ));
        assert!(matches!(
            f.comments.add_comment(&Session::anonymous(), private.id, "hi").await,
            Err(RepoError::Unauthenticated)
        ));

        assert!(matches!(
            f.comments.add_comment(&alice, private.id, "note").await,
            Err(RepoError::NotFound("task"))
        ));
        assert_eq!(f.store.comment_count().await, 0);
    }

    #[tokio::test]
    async fn test_private_task_thread_matches_missing_task() {
        let f = fixture();
        let alice = session("a@example.com", None);

        let private = f.tasks.create_task(&alice, "mine", false).await.unwrap();
        let _ = f.comments.add_comment(&alice, private.id, "my private note").await;

        let private_thread = f.comments.list_comments(private.id).await.unwrap();
        let missing_thread = f.comments.list_comments(Uuid::new_v4()).await.unwrap();
        assert_eq!(private_thread, missing_thread);
        assert!(private_thread.is_empty());
    }

    #[tokio::test]
    async fn test_list_comments_empty_is_ok() {
        let f = fixture();
        let comments = f.comments.list_comments(Uuid::new_v4()).await.unwrap();
        assert!(comments.is_empty());
    }

    #[tokio::test]
    async fn test_delete_comment_author_only() {
        let f = fixture();
        let alice = session("a@example.com", None);
        let bob = session("b@example.com", None);

        let task = f.tasks.create_task(&alice, "shared", true).await.unwrap();
        let comment = f.comments.add_comment(&bob, task.id, "mine").await.unwrap();

        // Task ownership does not extend to other people's comments
        assert!(matches!(
            f.comments.delete_comment(&alice, comment.id).await,
            Err(RepoError::Forbidden("comment"))
        ));

        f.comments.delete_comment(&bob, comment.id).await.unwrap();
        assert!(matches!(
            f.comments.delete_comment(&bob, comment.id).await,
            Err(RepoError::NotFound("comment"))
        ));
        assert!(f.comments.list_comments(task.id).await.unwrap().is_empty());
    }
}
