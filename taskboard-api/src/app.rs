//! Application state and router builder
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskboard_api::{app::{build_router, AppState}, config::Config};
//! use taskboard_shared::store::MemoryStore;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let shutdown = CancellationToken::new();
//! let state = AppState::new(Arc::new(MemoryStore::new()), config)
//!     .with_shutdown(shutdown.child_token());
//! let app = build_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app)
//!     .with_graceful_shutdown(async move { shutdown.cancelled().await })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::{
    config::Config,
    middleware::{security::SecurityHeadersLayer, session::resolve_session},
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use taskboard_shared::{
    auth::middleware::SessionVerifier,
    repo::{CommentRepository, TaskRepository},
    store::DocumentStore,
};
use tokio_util::sync::CancellationToken;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor. Every field
/// is reference-counted, so clones are cheap.
#[derive(Clone)]
pub struct AppState {
    /// Backing document store
    pub store: Arc<dyn DocumentStore>,

    pub tasks: TaskRepository,

    pub comments: CommentRepository,

    /// Validates bearer tokens into sessions
    pub verifier: SessionVerifier,

    /// Application configuration
    pub config: Arc<Config>,

    /// Cancelled when the server starts shutting down; ends live feeds
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: Config) -> Self {
        Self {
            tasks: TaskRepository::new(Arc::clone(&store)),
            comments: CommentRepository::new(Arc::clone(&store)),
            verifier: SessionVerifier::new(&config.auth.session_secret, &config.auth.issuer),
            store,
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }

    /// Ties long-lived responses to the server's shutdown token
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health                      # Store connectivity (no session)
/// └── /v1/                             # Session resolved from bearer token
///     ├── /auth/
///     │   ├── GET  /session            # Current {email, name}
///     │   ├── GET  /signin             # Redirect to identity provider
///     │   └── POST /signout
///     ├── /tasks/
///     │   ├── POST   /                 # Create (signed in)
///     │   ├── GET    /                 # Own tasks, newest first
///     │   ├── GET    /live             # SSE snapshots of own tasks
///     │   ├── GET    /:id              # Public task
///     │   ├── DELETE /:id              # Owner only
///     │   ├── GET    /:id/comments
///     │   └── POST   /:id/comments     # Signed in, task public
///     └── DELETE /comments/:id         # Author only
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, compression, tracing, then the
/// session layer on `/v1`.
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/session", get(routes::auth::current_session))
        .route("/signin", get(routes::auth::sign_in))
        .route("/signout", post(routes::auth::sign_out));

    let task_routes = Router::new()
        .route(
            "/",
            post(routes::tasks::create_task).get(routes::tasks::list_own_tasks),
        )
        .route("/live", get(routes::tasks::live_tasks))
        .route(
            "/:id",
            get(routes::tasks::get_public_task).delete(routes::tasks::delete_task),
        )
        .route(
            "/:id/comments",
            get(routes::comments::list_comments).post(routes::comments::add_comment),
        );

    let comment_routes = Router::new().route("/:id", delete(routes::comments::delete_comment));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .nest("/comments", comment_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            resolve_session,
        ));

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
