//! # Taskboard API Server
//!
//! Serves the task/comment API over HTTP.
//!
//! ## Startup
//!
//! 1. Load configuration (defaults, `taskboard.toml`, `TASKBOARD__*` env)
//! 2. Initialize tracing
//! 3. Open the configured store; for PostgreSQL, run migrations and start
//!    the change listener
//! 4. Serve until Ctrl-C or SIGTERM, then drain and close the store
//!
//! ## Usage
//!
//! ```bash
//! TASKBOARD__AUTH__SESSION_SECRET=$(openssl rand -hex 32) \
//! TASKBOARD__STORAGE__BACKEND=memory \
//!     cargo run -p taskboard-api
//! ```

use anyhow::Context;
use std::sync::Arc;
use taskboard_api::{
    app::{build_router, AppState},
    config::{Config, StorageBackend},
    telemetry,
};
use taskboard_shared::{
    db::{
        migrations::{ensure_database_exists, run_migrations},
        pool::{close_pool, create_pool},
    },
    store::{DocumentStore, MemoryStore, PgStore},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Resources that need an orderly shutdown
struct Backend {
    store: Arc<dyn DocumentStore>,
    listener: Option<(PgStore, JoinHandle<()>)>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    telemetry::init(config.log.format)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?config.storage.backend,
        "Taskboard API server starting"
    );

    let shutdown = CancellationToken::new();
    let backend = open_store(&config, shutdown.clone()).await?;

    let bind_address = config.bind_address();
    let state = AppState::new(Arc::clone(&backend.store), config)
        .with_shutdown(shutdown.child_token());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!(address = %bind_address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    info!("Server stopped, releasing store");
    shutdown.cancel();
    if let Some((store, handle)) = backend.listener {
        handle.await.ok();
        close_pool(store.pool().clone()).await;
    }

    Ok(())
}

async fn open_store(config: &Config, shutdown: CancellationToken) -> anyhow::Result<Backend> {
    match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory store; data is lost on restart");
            Ok(Backend {
                store: Arc::new(MemoryStore::new()),
                listener: None,
            })
        }
        StorageBackend::Postgres => {
            if config.database.create_if_missing {
                ensure_database_exists(&config.database.url)
                    .await
                    .context("Failed to create database")?;
            }

            let pool = create_pool(config.database.pool_config())
                .await
                .context("Failed to connect to database")?;
            run_migrations(&pool).await.context("Failed to run migrations")?;

            let store = PgStore::new(pool);
            let handle = store.spawn_change_listener(shutdown);

            Ok(Backend {
                store: Arc::new(store.clone()),
                listener: Some((store, handle)),
            })
        }
    }
}

/// Resolves on Ctrl-C, SIGTERM, or when `shutdown` is cancelled elsewhere
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => {},
    }

    info!("Shutdown signal received");
}
