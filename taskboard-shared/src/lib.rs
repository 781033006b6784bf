//! # Taskboard Shared Library
//!
//! Domain logic behind the Taskboard API: the task/comment visibility and
//! ownership model, the store it runs on, and the live task view.
//!
//! ## Module Organization
//!
//! - `models`: tasks and comments
//! - `auth`: session tokens, the explicit `Session` context, ownership checks
//! - `store`: `DocumentStore` trait with PostgreSQL and in-memory backends
//! - `repo`: task and comment repositories enforcing the access rules
//! - `live`: full-refresh projection of a user's own tasks
//! - `db`: PostgreSQL pool and migrations

pub mod auth;
pub mod db;
pub mod live;
pub mod models;
pub mod repo;
pub mod store;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
