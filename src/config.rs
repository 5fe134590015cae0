use std::env;

/// Fallback signing secret for local development only. Never used when `APP_ENV=production`.
const LOCAL_JWT_SECRET: &str = "eventsx-local-development-secret";

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// shared read-only through `AppState` (pulled into handlers and extractors via `FromRef`).
/// Nothing in the service reads the environment after `load` returns.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and which settings are mandatory.
    pub env: Env,
    // Postgres connection string. `None` is only accepted locally and selects the in-memory store.
    pub db_url: Option<String>,
    // Secret used to sign and verify session tokens (HS256).
    pub jwt_secret: String,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

/// Env
///
/// Defines the runtime context: relaxed defaults for local development,
/// explicit secrets for production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking values for test setup. Runs against the in-memory store.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables and fails fast.
    ///
    /// # Panics
    /// Panics in production when `JWT_SECRET` or `DATABASE_URL` is not set, so the
    /// service never starts with an embedded secret or an implicit connection string.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let bind_addr = format!("0.0.0.0:{}", port);

        match env {
            Env::Local => Self {
                env: Env::Local,
                db_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
                jwt_secret: env::var("JWT_SECRET")
                    .unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                bind_addr,
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: Some(
                    env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in production"),
                ),
                jwt_secret: env::var("JWT_SECRET")
                    .expect("FATAL: JWT_SECRET must be set in production."),
                bind_addr,
            },
        }
    }
}
