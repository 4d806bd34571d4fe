use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const ROUTE_TO_BACKEND: &str = "ROUTE_TO_BACKEND";
pub const DATABASE_URL: &str = "DATABASE_URL";
pub const BACKEND_URL: &str = "BACKEND_URL";
pub const API_KEY: &str = "API_KEY";
pub const ARCHIVE_PATH: &str = "ARCHIVE_PATH";

const DEFAULT_ARCHIVE_PATH: &str = "archive";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set when ROUTE_TO_BACKEND is enabled")]
    MissingRoutingVar(&'static str),
    #[error("DATABASE_URL must be set for direct database access")]
    MissingDatabaseUrl,
}

/// Environment-derived settings governing where data-loading calls execute.
///
/// Exactly one of `DATABASE_URL` / `BACKEND_URL` is authoritative per call:
/// `ROUTE_TO_BACKEND` picks the path and the matching check below fails fast
/// when the required settings are absent.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub route_to_backend: bool,
    pub database_url: Option<String>,
    pub backend_url: Option<String>,
    pub api_key: Option<String>,
    pub archive_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            route_to_backend: env::var(ROUTE_TO_BACKEND)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            database_url: read(DATABASE_URL),
            backend_url: read(BACKEND_URL),
            api_key: read(API_KEY),
            archive_path: read(ARCHIVE_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE_PATH)),
        }
    }

    /// Returns `(backend_url, api_key)`, failing when either setting the
    /// remote path depends on is absent.
    pub fn check_routing_dependencies(&self) -> Result<(&str, &str), ConfigError> {
        let backend_url = self
            .backend_url
            .as_deref()
            .ok_or(ConfigError::MissingRoutingVar(BACKEND_URL))?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingRoutingVar(API_KEY))?;
        Ok((backend_url, api_key))
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl)
    }

    /// Name, current value, and description of every variable, for
    /// `config show`.
    pub fn describe(&self) -> Vec<(&'static str, Option<String>, &'static str)> {
        vec![
            (
                ROUTE_TO_BACKEND,
                Some(self.route_to_backend.to_string()),
                "Route all database operations through BACKEND_URL rather than applying directly using DATABASE_URL",
            ),
            (
                DATABASE_URL,
                self.database_url.clone(),
                "URL for direct database connections",
            ),
            (
                BACKEND_URL,
                self.backend_url.clone(),
                "URL of the backend service when routing is enabled",
            ),
            (
                API_KEY,
                self.api_key.clone(),
                "Access key for interacting with the backend",
            ),
            (
                ARCHIVE_PATH,
                Some(self.archive_path.display().to_string()),
                "Default path that files are moved to after they have been processed",
            ),
        ]
    }
}

fn read(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}
