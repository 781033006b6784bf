//! API route handlers
//!
//! - `health`: Health check endpoint
//! - `auth`: Session, sign-in redirect, sign-out
//! - `tasks`: Task CRUD and the live task feed
//! - `comments`: Comment threads

pub mod auth;
pub mod comments;
pub mod health;
pub mod tasks;
