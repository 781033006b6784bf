//! # Taskboard API Server Library
//!
//! HTTP surface of Taskboard, built on the repositories in
//! `taskboard-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Layered configuration
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers and session resolution
//! - `routes`: API route handlers
//! - `telemetry`: Tracing subscriber setup

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod telemetry;
