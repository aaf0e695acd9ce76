//! Common test infrastructure for database integration tests.

#![allow(dead_code)]

use keel_config::DatabaseConfig;
use keel_core::{columns, BaseModel, ColumnMap, Model};
use keel_repository::{DatabasePool, Dao};
use keel_resilience::RetryPolicy;
use std::time::Duration;
use tempfile::TempDir;

/// A migrated SQLite database in a temporary directory.
///
/// Besides the built-in tables it has a `notes` table for the [`Note`]
/// test record.
pub struct TestDatabase {
    _dir: TempDir,
    pool: DatabasePool,
}

impl TestDatabase {
    /// Creates a database with the default busy timeout.
    pub async fn new() -> Self {
        Self::with_busy_timeout(5000).await
    }

    /// Creates a database whose connections report a locked database
    /// after `busy_timeout_ms`.
    pub async fn with_busy_timeout(busy_timeout_ms: u64) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("test.db").display()),
            min_connections: 0,
            max_connections: 5,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 60,
            busy_timeout_ms,
            run_migrations: true,
        };

        let pool = DatabasePool::connect(&config)
            .await
            .expect("Failed to open the test database");

        pool.run_migrations(&RetryPolicy::lock_contention())
            .await
            .expect("Failed to run migrations");

        Dao::from_pool(&pool)
            .nonconcurrent_db()
            .execute(
                "CREATE TABLE notes (
                    id TEXT PRIMARY KEY NOT NULL,
                    title TEXT NOT NULL,
                    created TEXT NOT NULL,
                    updated TEXT NOT NULL
                )",
            )
            .await
            .expect("Failed to create the notes table");

        Self { _dir: dir, pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// A Dao without callbacks and with short retry delays.
    pub fn dao(&self) -> Dao {
        Dao::from_pool(&self.pool).with_retry_policy(fast_retry())
    }

    pub async fn count_notes(&self) -> i64 {
        self.dao()
            .db()
            .fetch_i64("SELECT COUNT(*) FROM notes", Default::default())
            .await
            .expect("Failed to count notes")
    }

    pub async fn note_title(&self, id: &str) -> Option<String> {
        let row: Option<(String,)> = self
            .dao()
            .db()
            .fetch_optional("SELECT title FROM notes WHERE id = ?", args_with(id))
            .await
            .expect("Failed to load note");
        row.map(|(title,)| title)
    }
}

/// Five attempts with 10ms linear steps.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::linear(5, Duration::from_millis(10))
}

pub fn args_with(value: &str) -> sqlx::sqlite::SqliteArguments<'static> {
    use sqlx::Arguments;
    let mut args = sqlx::sqlite::SqliteArguments::default();
    args.add(value.to_string()).expect("Failed to bind argument");
    args
}

/// Minimal record stored in the `notes` table.
#[derive(Debug, Clone, Default)]
pub struct Note {
    pub base: BaseModel,
    pub title: String,
}

impl Note {
    pub fn new(title: &str) -> Self {
        Self {
            base: BaseModel::default(),
            title: title.to_string(),
        }
    }
}

impl Model for Note {
    fn table_name(&self) -> &'static str {
        "notes"
    }

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }

    fn columns(&self) -> ColumnMap {
        columns! { "title" => self.title.as_str() }
    }
}

/// Returns the title of a boxed [`Note`].
pub fn title_of(model: &dyn Model) -> String {
    model
        .downcast_ref::<Note>()
        .map(|n| n.title.clone())
        .unwrap_or_default()
}
