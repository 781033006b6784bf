//! Middleware for the API server
//!
//! - `security`: response security headers
//! - `session`: resolves the request's `Session` from its bearer token

pub mod security;
pub mod session;
