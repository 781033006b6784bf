//! Session resolution middleware
//!
//! Runs on every `/v1` route. A request without an `Authorization` header is
//! anonymous and continues; a request whose bearer token fails validation is
//! rejected with 401 before reaching a handler. Handlers read the result with
//! `Extension<Session>`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use taskboard_shared::auth::Session;
use tracing::debug;

use crate::{app::AppState, error::ApiError};

pub async fn resolve_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session: Session = state.verifier.resolve(req.headers()).map_err(|e| {
        debug!(error = %e, "Rejected session token");
        ApiError::from(e)
    })?;

    debug!(user = session.email().unwrap_or("anonymous"), "Session resolved");

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
