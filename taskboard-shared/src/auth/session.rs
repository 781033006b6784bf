//! Session context passed explicitly to every repository call
//!
//! A `Session` is either anonymous or carries the `Identity` the identity
//! provider vouched for. Anonymous sessions are a normal state: they may read
//! public tasks and comment threads but cannot write anything.

use serde::{Deserialize, Serialize};

/// Authenticated user as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    email: String,
    display_name: Option<String>,
}

impl Identity {
    pub fn new(email: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            email: email.into(),
            display_name: display_name.filter(|name| !name.trim().is_empty()),
        }
    }

    /// Stable identity string used for ownership
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}

/// Request-scoped session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    identity: Option<Identity>,
}

/// Public view of a session, `{email, name}` with nulls when anonymous
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn signed_in(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Email of the signed-in user, if any
    pub fn email(&self) -> Option<&str> {
        self.identity.as_ref().map(Identity::email)
    }

    pub fn is_anonymous(&self) -> bool {
        self.identity.is_none()
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            email: self.email().map(str::to_string),
            name: self
                .identity
                .as_ref()
                .and_then(Identity::display_name)
                .map(str::to_string),
        }
    }
}
