//! Database connection pool management.
//!
//! Two pools are opened against the same SQLite file: a concurrent pool
//! for reads and a single-connection pool that serializes writes and
//! transactions.

use crate::DbHandle;
use keel_config::DatabaseConfig;
use keel_core::{KeelError, KeelResult};
use keel_resilience::RetryPolicy;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{info, warn};

/// The concurrent and nonconcurrent connection pools.
#[derive(Clone)]
pub struct DatabasePool {
    concurrent: SqlitePool,
    nonconcurrent: SqlitePool,
}

impl DatabasePool {
    /// Opens both pools, creating the database file if it is missing.
    pub async fn connect(config: &DatabaseConfig) -> KeelResult<Self> {
        info!("Connecting to SQLite database at {}", config.url);

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| KeelError::Configuration(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout())
            .foreign_keys(true);

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    KeelError::Configuration(format!(
                        "Failed to create the database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let concurrent = SqlitePoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(Some(config.idle_timeout()))
            .connect_with(options.clone())
            .await
            .map_err(|e| {
                warn!("Failed to connect to database: {}", e);
                KeelError::Database(format!("Failed to connect: {}", e))
            })?;

        let nonconcurrent = SqlitePoolOptions::new()
            .min_connections(0)
            .max_connections(1)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(Some(config.idle_timeout()))
            .connect_with(options)
            .await
            .map_err(|e| {
                warn!("Failed to connect to database: {}", e);
                KeelError::Database(format!("Failed to connect: {}", e))
            })?;

        info!("SQLite connection pools established");
        Ok(Self {
            concurrent,
            nonconcurrent,
        })
    }

    #[must_use]
    pub fn concurrent(&self) -> &SqlitePool {
        &self.concurrent
    }

    #[must_use]
    pub fn nonconcurrent(&self) -> &SqlitePool {
        &self.nonconcurrent
    }

    /// Returns the concurrent pool as a storage handle.
    #[must_use]
    pub fn concurrent_handle(&self) -> DbHandle {
        DbHandle::Pool(self.concurrent.clone())
    }

    /// Returns the nonconcurrent pool as a storage handle.
    #[must_use]
    pub fn nonconcurrent_handle(&self) -> DbHandle {
        DbHandle::Pool(self.nonconcurrent.clone())
    }

    /// Checks that both pools can run a query.
    pub async fn health_check(&self) -> KeelResult<()> {
        for pool in [&self.concurrent, &self.nonconcurrent] {
            sqlx::query("SELECT 1")
                .execute(pool)
                .await
                .map_err(|e| KeelError::Database(format!("Health check failed: {}", e)))?;
        }
        Ok(())
    }

    /// Runs the embedded migrations, retrying while the database is locked.
    pub async fn run_migrations(&self, policy: &RetryPolicy) -> KeelResult<()> {
        info!("Running database migrations...");
        policy
            .execute_if(
                |_| async {
                    sqlx::migrate!("../../migrations")
                        .run(&self.nonconcurrent)
                        .await
                        .map_err(|e| KeelError::Database(format!("Migration failed: {}", e)))
                },
                KeelError::is_lock_contention,
            )
            .await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Closes both pools.
    pub async fn close(&self) {
        info!("Closing database connection pools...");
        self.concurrent.close().await;
        self.nonconcurrent.close().await;
        info!("Database connection pools closed");
    }
}

impl std::fmt::Debug for DatabasePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabasePool")
            .field("size", &self.concurrent.size())
            .field("num_idle", &self.concurrent.num_idle())
            .finish_non_exhaustive()
    }
}
