use std::env;

/// AppConfig
///
/// Holds the application's configuration. Immutable once loaded and pulled into
/// handlers and extractors through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. Without one (local only) the in-memory store is used.
    pub db_url: Option<String>,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Runtime environment marker. Controls log format and cookie security.
    pub env: Env,
}

/// Env
///
/// Runtime context: local development or production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

impl Default for AppConfig {
    /// default
    ///
    /// A non-panicking configuration for tests: local mode, in-memory store.
    fn default() -> Self {
        Self {
            db_url: None,
            bind_addr: "127.0.0.1:0".to_string(),
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables at startup.
    ///
    /// # Panics
    /// Panics in production when `DATABASE_URL` is missing, so the service never comes
    /// up serving from a process-local store.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let db_url = match env {
            Env::Production => Some(
                env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in production"),
            ),
            Env::Local => env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        Self {
            db_url,
            bind_addr,
            env,
        }
    }

    /// Session cookies are only marked `Secure` in production.
    pub fn secure_cookies(&self) -> bool {
        self.env == Env::Production
    }
}
