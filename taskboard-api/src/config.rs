//! Configuration management for the API server
//!
//! Settings are layered with the `config` crate, later sources overriding
//! earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. `taskboard.toml` in the working directory, if present
//! 3. `TASKBOARD__<SECTION>__<KEY>` environment variables
//!
//! A `.env` file is loaded into the environment first (development only).
//!
//! # Environment Variables
//!
//! - `TASKBOARD__API__PORT`: Port to bind to (default: 8080)
//! - `TASKBOARD__API__CORS_ORIGINS`: Comma-separated origins (default: `*`)
//! - `TASKBOARD__API__PUBLIC_BASE_URL`: Base for share links
//! - `TASKBOARD__STORAGE__BACKEND`: `postgres` or `memory`
//! - `TASKBOARD__DATABASE__URL`: PostgreSQL connection string
//! - `TASKBOARD__AUTH__SESSION_SECRET`: HS256 secret shared with the identity gateway (required)
//! - `TASKBOARD__LOG__FORMAT`: `plain` or `json`
//! - `RUST_LOG`: Log filter
//!
//! # Example
//!
//! ```no_run
//! use taskboard_api::config::Config;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! println!("Server will listen on {}", config.bind_address());
//! # Ok(())
//! # }
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use taskboard_shared::db::pool::DatabaseConfig as PoolConfig;
use url::Url;

/// Config file looked up in the working directory (extension optional)
const CONFIG_FILE: &str = "taskboard";

/// Prefix of environment overrides
const ENV_PREFIX: &str = "TASKBOARD";

/// Minimum accepted session secret length
const MIN_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Which document store backs the service
    pub storage: StorageConfig,

    /// Database configuration (postgres backend only)
    pub database: DatabaseConfig,

    /// Session token configuration
    pub auth: AuthConfig,

    /// Log output configuration
    pub log: LogConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins (`*` for permissive)
    pub cors_origins: Vec<String>,

    /// Enables HSTS and other production-only behavior
    pub production: bool,

    /// Public URL of the web app, used to build share links
    pub public_base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            production: false,
            public_base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// Create the database on startup if missing
    pub create_if_missing: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            create_if_missing: false,
        }
    }
}

impl DatabaseConfig {
    /// Pool settings for `taskboard_shared::db::pool::create_pool`
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            ..Default::default()
        }
    }
}

/// Session token configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity gateway
    ///
    /// Must be at least 32 characters. Generate with: `openssl rand -hex 32`
    pub session_secret: String,

    /// Expected `iss` claim
    pub issuer: String,

    /// Sign-in page of the identity provider
    pub provider_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: String::new(),
            issuer: "taskboard".to_string(),
            provider_url: "http://localhost:3000/api/auth/signin".to_string(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("provider_url", &self.provider_url)
            .finish()
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    pub format: LogFormat,
}

impl Config {
    /// Loads configuration from defaults, `taskboard.toml` and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result fails
    /// [`Config::validate`].
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("api.cors_origins"),
            )
            .build()
            .context("Failed to read configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;

        Ok(config)
    }

    /// Checks cross-field constraints the types can't express
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth.session_secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("auth.session_secret must be at least {MIN_SECRET_LEN} characters long");
        }

        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_empty() {
            anyhow::bail!("database.url is required when storage.backend is postgres");
        }

        Url::parse(&self.auth.provider_url).context("auth.provider_url is not a valid URL")?;
        Url::parse(&self.api.public_base_url).context("api.public_base_url is not a valid URL")?;

        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Absolute share link for a path like `/task/{id}`
    pub fn share_url(&self, path: &str) -> String {
        format!("{}{}", self.api.public_base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        let mut config = Config::default();
        config.auth.session_secret = "test-secret-key-at-least-32-bytes-long".to_string();
        config.storage.backend = StorageBackend::Memory;
        config
    }

    #[test]
    fn test_bind_address() {
        let mut config = valid();
        config.api.host = "127.0.0.1".to_string();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_validate_accepts_memory_backend() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = valid();
        config.auth.session_secret = "too-short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_database_url_for_postgres() {
        let mut config = valid();
        config.storage.backend = StorageBackend::Postgres;
        assert!(config.validate().is_err());

        config.database.url = "postgresql://localhost/taskboard".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_share_url_joins_cleanly() {
        let mut config = valid();
        config.api.public_base_url = "https://tasks.example.com/".to_string();
        assert_eq!(config.share_url("/task/abc"), "https://tasks.example.com/task/abc");
    }

    #[test]
    fn test_defaults_round_trip_through_config_crate() {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default()).unwrap())
            .set_override("storage.backend", "memory")
            .unwrap()
            .build()
            .unwrap();

        let config: Config = settings.try_deserialize().unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.cors_origins, vec!["*"]);
        assert_eq!(config.log.format, LogFormat::Plain);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", valid().auth);
        assert!(!rendered.contains("test-secret"));
    }
}
