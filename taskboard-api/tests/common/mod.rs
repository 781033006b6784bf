/// Common test utilities for integration tests
///
/// Builds the full router over an in-memory store, so no external services
/// are needed:
/// - Test configuration with a fixed session secret
/// - Session token minting
/// - Request helpers returning status and JSON body

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::{Config, StorageBackend};
use taskboard_shared::auth::jwt::{create_token, SessionClaims};
use taskboard_shared::store::MemoryStore;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: Router,
    pub config: Config,
    pub shutdown: CancellationToken,
}

impl TestContext {
    pub fn new() -> Self {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Memory;
        config.auth.session_secret = TEST_SECRET.to_string();
        config.api.public_base_url = "https://tasks.example.com".to_string();
        config.validate().expect("test config must be valid");

        let store = Arc::new(MemoryStore::new());
        let shutdown = CancellationToken::new();
        let state = AppState::new(store.clone(), config.clone()).with_shutdown(shutdown.clone());
        let app = build_router(state);

        Self {
            store,
            app,
            config,
            shutdown,
        }
    }

    /// Mints a session token the way the identity gateway would
    pub fn token_for(&self, email: &str, name: Option<&str>) -> String {
        let claims = SessionClaims::new(email, name.map(str::to_string), &self.config.auth.issuer);
        create_token(&claims, TEST_SECRET).expect("failed to mint token")
    }

    /// Sends a request through the router
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    /// Sends a request and decodes the JSON response (Null for empty bodies)
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.send(method, uri, token, body).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body for {}: {}", uri, String::from_utf8_lossy(&bytes))
            })
        };

        (status, json)
    }
}
