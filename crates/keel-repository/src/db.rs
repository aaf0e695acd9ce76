//! Storage handles and the small query builder the Dao writes through.
//!
//! A [`DbHandle`] is either a plain connection pool or an open
//! transaction. Every query method works the same way on both, so code
//! running inside a transaction does not need to know about it.

use keel_core::{ColumnMap, ColumnValue, KeelError, KeelResult};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Arguments, FromRow, Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A shared, single-use transaction.
///
/// Clones refer to the same transaction. Once committed or rolled back,
/// every further use fails.
#[derive(Clone)]
pub struct TxHandle(Arc<Mutex<Option<Transaction<'static, Sqlite>>>>);

impl TxHandle {
    /// Opens a new transaction on `pool`.
    pub async fn begin(pool: &SqlitePool) -> KeelResult<Self> {
        let tx = pool.begin().await?;
        Ok(Self(Arc::new(Mutex::new(Some(tx)))))
    }

    pub async fn commit(&self) -> KeelResult<()> {
        let tx = self.0.lock().await.take().ok_or_else(transaction_finished)?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(&self) -> KeelResult<()> {
        let tx = self.0.lock().await.take().ok_or_else(transaction_finished)?;
        tx.rollback().await?;
        Ok(())
    }

    /// Returns `true` if both handles refer to the same transaction.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for TxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TxHandle").finish_non_exhaustive()
    }
}

fn transaction_finished() -> KeelError {
    KeelError::Database("transaction already finished".to_string())
}

/// A storage handle: a connection pool or an open transaction.
#[derive(Debug, Clone)]
pub enum DbHandle {
    Pool(SqlitePool),
    Tx(TxHandle),
}

/// Runs a consumable query against whichever executor the handle wraps.
macro_rules! run_on {
    ($handle:expr, |$executor:ident| $body:expr) => {
        match $handle {
            DbHandle::Pool(pool) => {
                let $executor = pool;
                $body
            }
            DbHandle::Tx(tx) => {
                let mut guard = tx.0.lock().await;
                let conn = guard.as_mut().ok_or_else(transaction_finished)?;
                let $executor = &mut **conn;
                $body
            }
        }
    };
}

impl DbHandle {
    /// Returns `true` for a transaction handle.
    #[must_use]
    pub const fn is_transaction(&self) -> bool {
        matches!(self, Self::Tx(_))
    }

    /// Returns `true` if both handles wrap the same transaction.
    #[must_use]
    pub fn is_same_transaction(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Tx(a), Self::Tx(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Executes a statement without bound parameters.
    pub async fn execute(&self, sql: &str) -> KeelResult<u64> {
        self.execute_with(sql, SqliteArguments::default()).await
    }

    /// Executes a statement and returns the number of affected rows.
    pub async fn execute_with<'q>(&self, sql: &'q str, args: SqliteArguments<'q>) -> KeelResult<u64> {
        let query = sqlx::query_with(sql, args);
        let result = run_on!(self, |executor| query.execute(executor).await?);
        Ok(result.rows_affected())
    }

    /// Fetches at most one row decoded as `R`.
    pub async fn fetch_optional<'q, R>(&self, sql: &'q str, args: SqliteArguments<'q>) -> KeelResult<Option<R>>
    where
        R: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let query = sqlx::query_as_with::<Sqlite, R, _>(sql, args);
        Ok(run_on!(self, |executor| query.fetch_optional(executor).await?))
    }

    /// Fetches every row decoded as `R`.
    pub async fn fetch_all<'q, R>(&self, sql: &'q str, args: SqliteArguments<'q>) -> KeelResult<Vec<R>>
    where
        R: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let query = sqlx::query_as_with::<Sqlite, R, _>(sql, args);
        Ok(run_on!(self, |executor| query.fetch_all(executor).await?))
    }

    /// Fetches a single integer, e.g. the result of `COUNT(*)`.
    pub async fn fetch_i64<'q>(&self, sql: &'q str, args: SqliteArguments<'q>) -> KeelResult<i64> {
        let query = sqlx::query_scalar_with::<Sqlite, i64, _>(sql, args);
        Ok(run_on!(self, |executor| query.fetch_one(executor).await?))
    }

    /// Selects the first row of `table` matching `filter`.
    pub async fn select_one<R>(&self, table: &str, filter: &Filter) -> KeelResult<Option<R>>
    where
        R: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let mut args = SqliteArguments::default();
        let condition = filter.build(&mut args)?;
        let sql = format!("SELECT * FROM {} WHERE {} LIMIT 1", quote(table), condition);
        self.fetch_optional(&sql, args).await
    }

    /// Counts the rows of `table` matching `filter`.
    pub async fn count(&self, table: &str, filter: &Filter) -> KeelResult<i64> {
        let mut args = SqliteArguments::default();
        let condition = filter.build(&mut args)?;
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", quote(table), condition);
        self.fetch_i64(&sql, args).await
    }

    /// Inserts a single row.
    pub async fn insert(&self, table: &str, columns: &ColumnMap) -> KeelResult<u64> {
        let mut args = SqliteArguments::default();
        for value in columns.values() {
            bind(&mut args, value)?;
        }

        let names: Vec<String> = columns.keys().map(|name| quote(name)).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(table),
            names.join(", "),
            placeholders
        );
        self.execute_with(&sql, args).await
    }

    /// Updates the rows matching `filter`. An empty column set is a no-op.
    pub async fn update(&self, table: &str, columns: &ColumnMap, filter: &Filter) -> KeelResult<u64> {
        if columns.is_empty() {
            return Ok(0);
        }

        let mut args = SqliteArguments::default();
        let mut assignments = Vec::with_capacity(columns.len());
        for (name, value) in columns {
            bind(&mut args, value)?;
            assignments.push(format!("{} = ?", quote(name)));
        }
        let condition = filter.build(&mut args)?;

        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            quote(table),
            assignments.join(", "),
            condition
        );
        self.execute_with(&sql, args).await
    }

    /// Deletes the rows matching `filter`.
    pub async fn delete(&self, table: &str, filter: &Filter) -> KeelResult<u64> {
        let mut args = SqliteArguments::default();
        let condition = filter.build(&mut args)?;
        let sql = format!("DELETE FROM {} WHERE {}", quote(table), condition);
        self.execute_with(&sql, args).await
    }

    /// Drops `table` if it exists.
    pub async fn drop_table(&self, table: &str) -> KeelResult<()> {
        self.execute(&format!("DROP TABLE IF EXISTS {}", quote(table))).await?;
        Ok(())
    }
}

impl From<SqlitePool> for DbHandle {
    fn from(pool: SqlitePool) -> Self {
        Self::Pool(pool)
    }
}

impl From<TxHandle> for DbHandle {
    fn from(tx: TxHandle) -> Self {
        Self::Tx(tx)
    }
}

#[derive(Debug, Clone)]
enum Condition {
    Eq(String, ColumnValue),
    NotIn(String, Vec<ColumnValue>),
}

/// A conjunction of column conditions.
///
/// An empty filter matches every row.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `Filter::new().eq("id", id)`.
    #[must_use]
    pub fn by_id(id: &str) -> Self {
        Self::new().eq("id", id)
    }

    /// Requires `column` to equal `value`. A null value matches `IS NULL`.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl Into<ColumnValue>) -> Self {
        self.conditions.push(Condition::Eq(column.to_string(), value.into()));
        self
    }

    /// Requires `column` to be none of `values`. Empty `values` are ignored.
    #[must_use]
    pub fn not_in<V: Into<ColumnValue>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<ColumnValue> = values.into_iter().map(Into::into).collect();
        if !values.is_empty() {
            self.conditions.push(Condition::NotIn(column.to_string(), values));
        }
        self
    }

    fn build(&self, args: &mut SqliteArguments<'_>) -> KeelResult<String> {
        if self.conditions.is_empty() {
            return Ok("1 = 1".to_string());
        }

        let mut clauses = Vec::with_capacity(self.conditions.len());
        for condition in &self.conditions {
            match condition {
                Condition::Eq(column, ColumnValue::Null) => {
                    clauses.push(format!("{} IS NULL", quote(column)));
                }
                Condition::Eq(column, value) => {
                    bind(args, value)?;
                    clauses.push(format!("{} = ?", quote(column)));
                }
                Condition::NotIn(column, values) => {
                    for value in values {
                        bind(args, value)?;
                    }
                    let placeholders = vec!["?"; values.len()].join(", ");
                    clauses.push(format!("{} NOT IN ({})", quote(column), placeholders));
                }
            }
        }
        Ok(clauses.join(" AND "))
    }
}

/// Quotes an identifier.
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn bind(args: &mut SqliteArguments<'_>, value: &ColumnValue) -> KeelResult<()> {
    let result = match value.clone() {
        ColumnValue::Null => args.add(Option::<String>::None),
        ColumnValue::Bool(v) => args.add(v),
        ColumnValue::Int(v) => args.add(v),
        ColumnValue::Real(v) => args.add(v),
        ColumnValue::Text(v) => args.add(v),
        ColumnValue::Json(v) => args.add(v.to_string()),
        ColumnValue::Timestamp(v) => args.add(v),
    };
    result.map_err(|e| KeelError::Internal(format!("Failed to bind column value: {}", e)))
}
