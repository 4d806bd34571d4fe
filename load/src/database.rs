use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, DatabaseConnection, DbErr};
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

pub enum StateBackend {
    Memory,
    Postgres {
        endpoint: String,
        opts: ConnectOptions,
    },
}

impl StateBackend {
    pub fn postgres(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let opts = ConnectOptions::new(&endpoint)
            .max_connections(8)
            .connect_timeout(Duration::from_secs(10))
            .to_owned();
        Self::Postgres { endpoint, opts }
    }
}

#[derive(Clone, Debug)]
pub struct State {
    pub conn: DatabaseConnection,
    pub endpoint: String,
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl State {
    pub async fn with(backend: StateBackend) -> Result<Self, StateError> {
        const MAX_DURATION: Duration = Duration::new(u64::MAX / 4, 0);

        match backend {
            StateBackend::Memory => {
                const IN_MEMORY_DB: &str = "sqlite::memory:";

                let conn = sea_orm::Database::connect(
                    ConnectOptions::new(IN_MEMORY_DB)
                        .min_connections(1)
                        .max_connections(1)
                        .acquire_timeout(MAX_DURATION)
                        .connect_timeout(MAX_DURATION)
                        .to_owned(),
                )
                .await?;
                Ok(Self {
                    conn,
                    endpoint: IN_MEMORY_DB.to_owned(),
                })
            }
            StateBackend::Postgres { endpoint, opts } => {
                let conn = RetryIf::spawn(
                    Self::retry_strategy(),
                    || sea_orm::Database::connect(opts.clone()),
                    Self::should_retry,
                )
                .await?;
                Ok(Self { conn, endpoint })
            }
        }
    }

    /// Connects to the Postgres instance named by `endpoint`, retrying
    /// transient connection failures with backoff.
    pub async fn from_url(endpoint: &str) -> Result<Self, StateError> {
        Self::with(StateBackend::postgres(endpoint)).await
    }

    #[cfg(test)]
    pub async fn for_test() -> Self {
        let this = Self::with(StateBackend::Memory).await.unwrap();
        Migrator::up(&this.conn, None).await.unwrap();
        this
    }

    pub async fn migrate(&self) -> Result<(), StateError> {
        Migrator::up(&self.conn, None).await?;
        Ok(())
    }

    fn should_retry(err: &DbErr) -> bool {
        matches!(err, DbErr::Conn(_))
    }

    fn retry_strategy() -> impl Iterator<Item = Duration> {
        const DB_BASE_RETRY_DURATION: u64 = 50;
        const DB_MAX_RETRIES: usize = 5;

        ExponentialBackoff::from_millis(DB_BASE_RETRY_DURATION)
            .map(jitter)
            .take(DB_MAX_RETRIES)
    }
}
