//! Session endpoints
//!
//! Authentication itself happens at the external identity provider. Its
//! gateway mints the HS256 session token the client then sends as
//! `Authorization: Bearer <token>`. These endpoints only expose that
//! boundary:
//!
//! - `GET  /v1/auth/session` - current `{email, name}`, nulls when anonymous
//! - `GET  /v1/auth/signin?provider=google&callback_url=/` - 303 to the provider
//! - `POST /v1/auth/signout` - 204; sessions are stateless, the client drops its token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::auth::{Session, SessionInfo};
use tracing::info;
use url::Url;
use validator::Validate;

fn default_provider() -> String {
    "google".to_string()
}

fn default_callback() -> String {
    "/".to_string()
}

/// Sign-in query parameters
#[derive(Debug, Deserialize, Validate)]
pub struct SignInQuery {
    /// Identity provider to use
    #[serde(default = "default_provider")]
    #[validate(length(min = 1, max = 64, message = "Provider must be 1-64 characters"))]
    pub provider: String,

    /// Where the provider sends the user after signing in
    #[serde(default = "default_callback")]
    #[validate(length(min = 1, max = 2048, message = "Callback URL must be 1-2048 characters"))]
    pub callback_url: String,
}

/// Returns the current session
///
/// # Response
///
/// ```json
/// { "email": "alice@example.com", "name": "Alice" }
/// ```
pub async fn current_session(Extension(session): Extension<Session>) -> Json<SessionInfo> {
    Json(session.info())
}

/// Starts sign-in by redirecting to the identity provider
///
/// # Errors
///
/// - `422 Unprocessable Entity`: empty or oversized parameters
/// - `500 Internal Server Error`: provider URL misconfigured
pub async fn sign_in(
    State(state): State<AppState>,
    Query(query): Query<SignInQuery>,
) -> ApiResult<Redirect> {
    query.validate()?;

    let mut target = Url::parse(&state.config.auth.provider_url)
        .map_err(|e| ApiError::InternalError(format!("Invalid provider URL: {}", e)))?;
    target
        .query_pairs_mut()
        .append_pair("provider", &query.provider)
        .append_pair("callback_url", &query.callback_url);

    info!(provider = %query.provider, "Redirecting to identity provider");
    Ok(Redirect::to(target.as_str()))
}

/// Ends the session
///
/// Tokens are not tracked server-side, so this only records the event.
pub async fn sign_out(Extension(session): Extension<Session>) -> StatusCode {
    if let Some(email) = session.email() {
        info!(user = email, "Signed out");
    }
    StatusCode::NO_CONTENT
}
