//! Application configuration loaded from environment variables.

use std::path::PathBuf;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `"json"` for structured output, anything else for text
/// - `DATABASE_URL`: selects the Postgres backend when set
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `DATA_DIR`: file-backed in-memory store when no database is configured
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_json: bool,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub data_dir: Option<PathBuf>,
}

/// Which storage backend the server runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Postgres { url: String, max_connections: u32 },
    File(PathBuf),
    Memory,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_json: lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.database_max_connections),
            data_dir: non_empty("DATA_DIR").map(PathBuf::from),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// A database URL wins over a data directory.
    pub fn backend(&self) -> Backend {
        match (&self.database_url, &self.data_dir) {
            (Some(url), _) => Backend::Postgres {
                url: url.clone(),
                max_connections: self.database_max_connections,
            },
            (None, Some(dir)) => Backend::File(dir.clone()),
            (None, None) => Backend::Memory,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_json: false,
            database_url: None,
            database_max_connections: 10,
            data_dir: None,
        }
    }
}
