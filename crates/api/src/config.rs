use std::path::{Path, PathBuf};

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for a local install. Service
/// behaviour (paths, Condor, intervals) lives in
/// [`corral_service::ServiceConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8443`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long background tasks get to stop after the server does.
    pub shutdown_timeout_secs: u64,
    pub database_url: String,
    /// Directory holding the static web pages.
    pub web_dir: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                            |
    /// |-------------------------|------------------------------------|
    /// | `HOST`                  | `0.0.0.0`                          |
    /// | `PORT`                  | `8443`                             |
    /// | `CORS_ORIGINS`          | `http://localhost:8443`            |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                               |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                               |
    /// | `DATABASE_URL`          | `sqlite://$CORRAL_HOME/var/corral.db` |
    /// | `WEB_DIR`               | `$CORRAL_HOME/share/web`           |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8443".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:8443".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let home = std::env::var("CORRAL_HOME").unwrap_or_else(|_| ".".into());

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{home}/var/corral.db"));

        let web_dir = std::env::var("WEB_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_web_dir(Path::new(&home)));

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            database_url,
            web_dir,
        }
    }
}

/// Where an install keeps the static pages, under the service home.
pub fn default_web_dir(home: &Path) -> PathBuf {
    home.join("share").join("web")
}
