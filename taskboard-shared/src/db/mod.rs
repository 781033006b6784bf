//! Database layer for the PostgreSQL backend
//!
//! - `pool`: connection pool creation and health checks
//! - `migrations`: embedded schema migrations
//!
//! Queries themselves live in `store::postgres`.

pub mod migrations;
pub mod pool;
