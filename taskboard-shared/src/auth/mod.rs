//! Authentication and authorization utilities
//!
//! Sign-in itself is delegated to an external identity provider. This module
//! covers what happens after it:
//!
//! - [`jwt`]: validation of the session tokens the provider's gateway mints
//! - [`session`]: the explicit `Session`/`Identity` context handed to every
//!   repository call
//! - [`middleware`]: resolving a `Session` from request headers
//! - [`authorization`]: owner/author checks for deletes

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod session;

pub use session::{Identity, Session, SessionInfo};
