//! Session resolution for Axum requests
//!
//! Every request gets a `Session`. A request without an `Authorization`
//! header is anonymous; a request with a bearer token must carry a valid
//! session token, otherwise it is rejected rather than silently downgraded.
//!
//! The resolved session is inserted into request extensions and handlers pick
//! it up with `Extension<Session>`.
//!
//! # Example
//!
//! ```
//! use axum::http::HeaderMap;
//! use taskboard_shared::auth::middleware::SessionVerifier;
//!
//! let verifier = SessionVerifier::new("secret-key-that-is-at-least-32-bytes", "taskboard");
//! let session = verifier.resolve(&HeaderMap::new()).unwrap();
//! assert!(session.is_anonymous());
//! ```

use axum::http::{header, HeaderMap};
use std::sync::Arc;

use super::jwt::{validate_token, JwtError};
use super::session::Session;

/// Error type for session resolution
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Authorization header is not a bearer token
    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    /// Token validation failed
    #[error("Invalid session token: {0}")]
    InvalidToken(String),
}

/// Validates session tokens against the shared secret and issuer
#[derive(Clone)]
pub struct SessionVerifier {
    secret: Arc<str>,
    issuer: Arc<str>,
}

impl SessionVerifier {
    pub fn new(secret: impl AsRef<str>, issuer: impl AsRef<str>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
            issuer: Arc::from(issuer.as_ref()),
        }
    }

    /// Resolves the session for a set of request headers
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidFormat` if the header is not `Bearer <token>`
    /// - `AuthError::InvalidToken` if the token fails validation
    pub fn resolve(&self, headers: &HeaderMap) -> Result<Session, AuthError> {
        let Some(value) = headers.get(header::AUTHORIZATION) else {
            return Ok(Session::anonymous());
        };

        let value = value
            .to_str()
            .map_err(|_| AuthError::InvalidFormat("Header is not valid ASCII".to_string()))?;

        let token = value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

        let claims = validate_token(token.trim(), &self.secret, &self.issuer).map_err(|e| match e {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
            other => AuthError::InvalidToken(other.to_string()),
        })?;

        Ok(Session::signed_in(claims.into_identity()))
    }
}

impl std::fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionVerifier")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}
