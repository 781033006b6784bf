//! Session token validation
//!
//! Sign-in is handled by an external identity provider. Once the provider has
//! authenticated a user, its gateway mints a session token that this service
//! trusts. Tokens are JWTs signed with HS256 using a secret shared between the
//! gateway and the API.
//!
//! # Claims
//!
//! - `sub`: the user's email, used as the stable identity for ownership
//! - `name`: display name (optional)
//! - `iss`: issuer, must match the configured issuer
//! - `iat` / `nbf` / `exp`: standard timestamps
//!
//! # Example
//!
//! ```
//! use taskboard_shared::auth::jwt::{create_token, validate_token, SessionClaims};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let claims = SessionClaims::new("a@example.com", Some("Ada".to_string()), "taskboard");
//! let token = create_token(&claims, "your-secret-key-at-least-32-bytes")?;
//!
//! let validated = validate_token(&token, "your-secret-key-at-least-32-bytes", "taskboard")?;
//! assert_eq!(validated.sub, "a@example.com");
//! # Ok(())
//! # }
//! ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::session::Identity;

/// Default lifetime of a session token
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Error type for session token operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token was issued by someone else
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },

    /// Token carries no usable identity
    #[error("Token has an empty subject")]
    EmptySubject,
}

/// Session token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user's email
    pub sub: String,

    /// Display name, when the provider shares one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl SessionClaims {
    /// Creates claims with the default lifetime
    pub fn new(email: impl Into<String>, name: Option<String>, issuer: impl Into<String>) -> Self {
        Self::with_expiration(email, name, issuer, Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }

    /// Creates claims expiring after `expires_in`
    pub fn with_expiration(
        email: impl Into<String>,
        name: Option<String>,
        issuer: impl Into<String>,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: email.into(),
            name,
            iss: issuer.into(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
        }
    }

    /// Checks if the token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Converts the claims into the identity they assert
    pub fn into_identity(self) -> Identity {
        Identity::new(self.sub, self.name)
    }
}

/// Signs claims into a token
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails.
pub fn create_token(claims: &SessionClaims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a token and extracts its claims
///
/// Verifies the signature, expiry, not-before time and issuer, and rejects
/// tokens whose subject is blank.
pub fn validate_token(token: &str, secret: &str, issuer: &str) -> Result<SessionClaims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
                expected: issuer.to_string(),
            },
            _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
        }
    })?;

    if token_data.claims.sub.trim().is_empty() {
        return Err(JwtError::EmptySubject);
    }

    Ok(token_data.claims)
}
