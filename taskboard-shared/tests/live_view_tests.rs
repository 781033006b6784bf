/// Integration tests for the live task view
///
/// Drives `LiveTaskView` through the repositories against the in-memory store.
/// Run with: cargo test --test live_view_tests

use std::sync::Arc;
use std::time::Duration;
use taskboard_shared::auth::{Identity, Session};
use taskboard_shared::live::{LiveTaskView, Projection};
use taskboard_shared::repo::TaskRepository;
use taskboard_shared::store::MemoryStore;

const WAIT: Duration = Duration::from_secs(5);

fn session(email: &str) -> Session {
    Session::signed_in(Identity::new(email, None))
}

async fn wait_until<F>(view: &LiveTaskView, mut predicate: F) -> Projection
where
    F: FnMut(&Projection) -> bool,
{
    let mut rx = view.watch();
    let projection = tokio::time::timeout(WAIT, rx.wait_for(|p| predicate(p)))
        .await
        .expect("timed out waiting for projection")
        .expect("live view dropped");
    projection.clone()
}

fn bodies(projection: &Projection) -> Vec<&str> {
    projection.tasks.iter().map(|t| t.body.as_str()).collect()
}

#[tokio::test]
async fn test_projection_follows_inserts_and_deletes() {
    let store = Arc::new(MemoryStore::new());
    let tasks = TaskRepository::new(store.clone());
    let alice = session("alice@example.com");

    let mut view = LiveTaskView::new(store);
    view.set_session(&alice);
    wait_until(&view, |p| p.synced).await;

    let first = tasks.create_task(&alice, "first", false).await.unwrap();
    tasks.create_task(&alice, "second", true).await.unwrap();

    let projection = wait_until(&view, |p| p.tasks.len() == 2).await;
    assert_eq!(bodies(&projection), ["second", "first"]);

    tasks.delete_task(&alice, first.id).await.unwrap();
    let projection = wait_until(&view, |p| p.tasks.len() == 1).await;
    assert_eq!(bodies(&projection), ["second"]);
}

#[tokio::test]
async fn test_other_owners_changes_are_invisible() {
    let store = Arc::new(MemoryStore::new());
    let tasks = TaskRepository::new(store.clone());
    let alice = session("alice@example.com");
    let bob = session("bob@example.com");

    let mut view = LiveTaskView::new(store);
    view.set_session(&alice);
    wait_until(&view, |p| p.synced).await;

    tasks.create_task(&bob, "bob's", true).await.unwrap();
    tasks.create_task(&alice, "alice's", false).await.unwrap();

    let projection = wait_until(&view, |p| !p.tasks.is_empty()).await;
    assert_eq!(bodies(&projection), ["alice's"]);
}

#[tokio::test]
async fn test_switching_user_replaces_subscription() {
    let store = Arc::new(MemoryStore::new());
    let tasks = TaskRepository::new(store.clone());
    let alice = session("alice@example.com");
    let bob = session("bob@example.com");

    tasks.create_task(&alice, "alice task", false).await.unwrap();
    tasks.create_task(&bob, "bob task", false).await.unwrap();

    let mut view = LiveTaskView::new(store);
    view.set_session(&alice);
    let first = wait_until(&view, |p| p.synced).await;
    assert_eq!(bodies(&first), ["alice task"]);

    view.set_session(&bob);
    let second = wait_until(&view, |p| p.synced).await;
    assert!(second.generation > first.generation);
    assert_eq!(second.owner.as_deref(), Some("bob@example.com"));
    assert_eq!(bodies(&second), ["bob task"]);

    // Alice's writes no longer reach the projection
    tasks.create_task(&alice, "late", false).await.unwrap();
    tasks.create_task(&bob, "bob again", false).await.unwrap();
    let latest = wait_until(&view, |p| p.tasks.len() == 2).await;
    assert_eq!(bodies(&latest), ["bob again", "bob task"]);
}

#[tokio::test]
async fn test_dropping_view_ends_subscription() {
    let store = Arc::new(MemoryStore::new());
    let tasks = TaskRepository::new(store.clone());
    let alice = session("alice@example.com");

    let mut view = LiveTaskView::new(store);
    view.set_session(&alice);
    let mut rx = view.watch();
    wait_until(&view, |p| p.synced).await;
    drop(view);

    // The sender lives on only inside the cancelled subscription task
    tasks.create_task(&alice, "after drop", false).await.unwrap();
    let closed = tokio::time::timeout(WAIT, async {
        while rx.changed().await.is_ok() {}
    })
    .await;
    assert!(closed.is_ok(), "subscription task kept running after drop");
}
