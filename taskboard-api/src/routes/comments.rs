//! Comment endpoints
//!
//! - `GET    /v1/tasks/:id/comments` - thread in insertion order (may be empty)
//! - `POST   /v1/tasks/:id/comments` - reply to a task the caller can see
//! - `DELETE /v1/comments/:id` - author only

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{auth::Session, models::Comment};
use uuid::Uuid;
use validator::Validate;

/// Add comment request
///
/// An empty body is accepted.
#[derive(Debug, Deserialize, Validate)]
pub struct AddCommentRequest {
    #[validate(length(max = 5000, message = "Comment must be at most 5000 characters"))]
    #[serde(default)]
    pub body: String,
}

/// Lists a task's comments
///
/// The task itself is not checked, so comments on a deleted task remain
/// readable.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Comment>>> {
    Ok(Json(state.comments.list_comments(task_id).await?))
}

/// Adds a comment
///
/// # Request
///
/// ```json
/// { "body": "Nice!" }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: no session
/// - `404 Not Found`: task missing, or private and owned by someone else
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<AddCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    req.validate()?;

    let comment = state.comments.add_comment(&session, task_id, &req.body).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Deletes one of the caller's comments
///
/// # Errors
///
/// - `401 Unauthorized`: no session
/// - `403 Forbidden`: written by someone else
/// - `404 Not Found`: no such comment
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.comments.delete_comment(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
