//! Task endpoints
//!
//! - `POST   /v1/tasks` - create a task owned by the caller
//! - `GET    /v1/tasks` - caller's tasks, newest first
//! - `GET    /v1/tasks/live` - same list as a Server-Sent Events feed
//! - `GET    /v1/tasks/:id` - a public task, for anyone holding the link
//! - `DELETE /v1/tasks/:id` - owner only; comments are kept
//!
//! Tasks are rendered with an absolute `share_url` when public.

use crate::{
    app::AppState,
    config::Config,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use taskboard_shared::{auth::Session, live::LiveTaskView, models::Task};
use tokio_stream::{wrappers::WatchStream, StreamExt as _};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

/// Interval between SSE keep-alive comments
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(25);

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Task text (trimmed; must not be blank)
    #[validate(length(max = 10000, message = "Body must be at most 10000 characters"))]
    pub body: String,

    /// Whether the task can be read through its share link
    #[serde(default)]
    pub public: bool,
}

/// Task as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub body: String,
    pub owner: String,
    pub public: bool,
    pub created_at: DateTime<Utc>,

    /// Absolute share link, public tasks only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,
}

impl TaskResponse {
    pub fn from_task(task: Task, config: &Config) -> Self {
        let share_url = task.share_path().map(|path| config.share_url(&path));

        Self {
            id: task.id,
            body: task.body,
            owner: task.owner,
            public: task.public,
            created_at: task.created_at,
            share_url,
        }
    }
}

/// Payload of one `snapshot` event on the live feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotData {
    /// Subscription generation the snapshot belongs to
    pub generation: u64,

    /// Owner's tasks, newest first
    pub tasks: Vec<TaskResponse>,
}

/// Creates a task
///
/// # Request
///
/// ```json
/// { "body": "Study chapter 4", "public": false }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: no session
/// - `422 Unprocessable Entity`: blank or oversized body
pub async fn create_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    req.validate()?;

    let task = state.tasks.create_task(&session, &req.body, req.public).await?;
    Ok((
        StatusCode::CREATED,
        Json(TaskResponse::from_task(task, &state.config)),
    ))
}

/// Lists the caller's tasks, newest first
pub async fn list_own_tasks(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let tasks = state.tasks.list_own_tasks(&session).await?;

    Ok(Json(
        tasks
            .into_iter()
            .map(|task| TaskResponse::from_task(task, &state.config))
            .collect(),
    ))
}

/// Reads a public task
///
/// Private and missing tasks both answer 404, whoever asks.
pub async fn get_public_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state.tasks.get_public_task(id).await?;
    Ok(Json(TaskResponse::from_task(task, &state.config)))
}

/// Deletes one of the caller's tasks
///
/// # Errors
///
/// - `401 Unauthorized`: no session
/// - `403 Forbidden`: public task owned by someone else
/// - `404 Not Found`: missing, or private and owned by someone else
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.tasks.delete_task(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Streams the caller's task list as it changes
///
/// # SSE Event Format
///
/// ```text
/// event: snapshot
/// data: {"generation":1,"tasks":[{"id":"...","body":"...","owner":"...","public":false,"created_at":"..."}]}
/// ```
///
/// Every event carries the complete list. The first one arrives once the
/// initial query completes; later ones follow each insert or delete of the
/// caller's tasks. The subscription ends when the client disconnects or the
/// server begins shutting down.
///
/// # Example
///
/// ```bash
/// curl -N -H "Authorization: Bearer <token>" http://localhost:8080/v1/tasks/live
/// ```
pub async fn live_tasks(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let owner = session
        .email()
        .ok_or_else(|| ApiError::Unauthorized("Sign-in required".to_string()))?
        .to_string();

    let mut view = LiveTaskView::new(Arc::clone(&state.store));
    view.set_session(&session);
    let updates = WatchStream::new(view.watch());
    info!(owner = %owner, "Live task feed opened");

    let config = Arc::clone(&state.config);
    let snapshots = updates
        .filter(|projection| projection.synced)
        .map(move |projection| {
            // The stream owns the view, so disconnecting cancels the subscription
            let _view = &view;

            let data = SnapshotData {
                generation: projection.generation,
                tasks: projection
                    .tasks
                    .iter()
                    .cloned()
                    .map(|task| TaskResponse::from_task(task, &config))
                    .collect(),
            };
            debug!(owner = %owner, count = data.tasks.len(), "Sending task snapshot");

            Ok(Event::default()
                .event("snapshot")
                .json_data(&data)
                .unwrap_or_else(|_| Event::default().event("error").data("serialization failed")))
        });
    let stream = futures::StreamExt::take_until(snapshots, state.shutdown.clone().cancelled_owned());

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}
