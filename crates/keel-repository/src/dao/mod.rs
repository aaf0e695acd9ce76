//! The transactional data access object.
//!
//! A [`Dao`] writes [`Model`] records through two storage handles and
//! dispatches the six record lifecycle callbacks. Inside
//! [`Dao::run_in_transaction`] the after callbacks are deferred until the
//! transaction commits.

mod param;
mod settings;
mod user;

use crate::{DatabasePool, DbHandle, Filter, TxHandle};
use keel_core::{insert_columns, update_columns, BoxFuture, KeelError, KeelResult, Model};
use keel_resilience::RetryPolicy;
use parking_lot::Mutex;
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Callback run before a write. It receives the Dao to use for further
/// queries and a copy of the record, and returns the record to write.
/// An error aborts the write.
pub type BeforeFunc =
    Arc<dyn Fn(Dao, Box<dyn Model>) -> BoxFuture<'static, Box<dyn Model>> + Send + Sync>;

/// Callback run after a successful write. Errors are logged only.
pub type AfterFunc = Arc<dyn Fn(Dao, Box<dyn Model>) -> BoxFuture<'static, ()> + Send + Sync>;

/// The kind of write an after callback reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelAction {
    Create,
    Update,
    Delete,
}

/// An after callback recorded inside a transaction.
struct AfterCall {
    action: ModelAction,
    model: Box<dyn Model>,
}

/// Data access object over a concurrent and a nonconcurrent handle.
///
/// Reads go through the concurrent handle, writes through the
/// nonconcurrent one. Inside a transaction both refer to the same
/// transaction.
#[derive(Clone)]
pub struct Dao {
    concurrent_db: DbHandle,
    nonconcurrent_db: DbHandle,
    retry_policy: RetryPolicy,

    before_create: Option<BeforeFunc>,
    after_create: Option<AfterFunc>,
    before_update: Option<BeforeFunc>,
    after_update: Option<AfterFunc>,
    before_delete: Option<BeforeFunc>,
    after_delete: Option<AfterFunc>,
}

impl Dao {
    /// Creates a Dao that uses `db` for both reads and writes.
    #[must_use]
    pub fn new(db: impl Into<DbHandle>) -> Self {
        let db = db.into();
        Self::new_multi(db.clone(), db)
    }

    /// Creates a Dao with separate read and write handles.
    #[must_use]
    pub fn new_multi(concurrent_db: impl Into<DbHandle>, nonconcurrent_db: impl Into<DbHandle>) -> Self {
        Self {
            concurrent_db: concurrent_db.into(),
            nonconcurrent_db: nonconcurrent_db.into(),
            retry_policy: RetryPolicy::lock_contention(),
            before_create: None,
            after_create: None,
            before_update: None,
            after_update: None,
            before_delete: None,
            after_delete: None,
        }
    }

    /// Creates a Dao over both pools of `pool`.
    #[must_use]
    pub fn from_pool(pool: &DatabasePool) -> Self {
        Self::new_multi(pool.concurrent_handle(), pool.nonconcurrent_handle())
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    #[must_use]
    pub fn with_before_create<F>(mut self, f: F) -> Self
    where
        F: Fn(Dao, Box<dyn Model>) -> BoxFuture<'static, Box<dyn Model>> + Send + Sync + 'static,
    {
        self.before_create = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_after_create<F>(mut self, f: F) -> Self
    where
        F: Fn(Dao, Box<dyn Model>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.after_create = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_before_update<F>(mut self, f: F) -> Self
    where
        F: Fn(Dao, Box<dyn Model>) -> BoxFuture<'static, Box<dyn Model>> + Send + Sync + 'static,
    {
        self.before_update = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_after_update<F>(mut self, f: F) -> Self
    where
        F: Fn(Dao, Box<dyn Model>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.after_update = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_before_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(Dao, Box<dyn Model>) -> BoxFuture<'static, Box<dyn Model>> + Send + Sync + 'static,
    {
        self.before_delete = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_after_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(Dao, Box<dyn Model>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.after_delete = Some(Arc::new(f));
        self
    }

    /// Returns a copy of this Dao with every before callback removed.
    #[must_use]
    pub fn without_before_hooks(&self) -> Self {
        Self {
            before_create: None,
            before_update: None,
            before_delete: None,
            ..self.clone()
        }
    }

    /// The handle used for reads. Alias of [`Dao::concurrent_db`].
    #[must_use]
    pub fn db(&self) -> &DbHandle {
        &self.concurrent_db
    }

    #[must_use]
    pub fn concurrent_db(&self) -> &DbHandle {
        &self.concurrent_db
    }

    #[must_use]
    pub fn nonconcurrent_db(&self) -> &DbHandle {
        &self.nonconcurrent_db
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Persists `model`: inserts it when it is new, updates it otherwise.
    ///
    /// Writes failing on a locked database are retried; from the second
    /// attempt on, the before callbacks are skipped.
    pub async fn save<M: Model + Clone>(&self, model: &mut M) -> KeelResult<()> {
        let mut attempt = 1;
        loop {
            let dao = self.dao_for_attempt(attempt);
            let result = if model.is_new() {
                dao.create(model).await
            } else {
                dao.update(model).await
            };

            match result {
                Ok(()) => return Ok(()),
                Err(err) => self.wait_for_retry(attempt, err).await?,
            }
            attempt += 1;
        }
    }

    /// Deletes `model`, with the same retry rules as [`Dao::save`].
    pub async fn delete<M: Model + Clone>(&self, model: &mut M) -> KeelResult<()> {
        let mut attempt = 1;
        loop {
            let dao = self.dao_for_attempt(attempt);
            match dao.delete_once(model).await {
                Ok(()) => return Ok(()),
                Err(err) => self.wait_for_retry(attempt, err).await?,
            }
            attempt += 1;
        }
    }

    /// Runs `f` inside a transaction.
    ///
    /// When this Dao already runs inside a transaction, `f` gets a copy of
    /// it and no new transaction is opened. Otherwise `f` gets a Dao bound
    /// to a new transaction; its after callbacks are recorded and replayed
    /// in order with this Dao once the transaction commits. Nothing is
    /// replayed when `f` fails.
    pub async fn run_in_transaction<F, Fut, T>(&self, f: F) -> KeelResult<T>
    where
        F: FnOnce(Dao) -> Fut + Send,
        Fut: Future<Output = KeelResult<T>> + Send,
        T: Send,
    {
        let DbHandle::Pool(pool) = &self.nonconcurrent_db else {
            return f(self.clone()).await;
        };

        let tx = TxHandle::begin(pool).await?;
        let pending: Arc<Mutex<Vec<AfterCall>>> = Arc::default();

        let tx_dao = Self {
            concurrent_db: DbHandle::Tx(tx.clone()),
            nonconcurrent_db: DbHandle::Tx(tx.clone()),
            retry_policy: self.retry_policy.clone(),
            before_create: self.before_create.clone(),
            after_create: self
                .after_create
                .as_ref()
                .map(|_| collector(&pending, ModelAction::Create)),
            before_update: self.before_update.clone(),
            after_update: self
                .after_update
                .as_ref()
                .map(|_| collector(&pending, ModelAction::Update)),
            before_delete: self.before_delete.clone(),
            after_delete: self
                .after_delete
                .as_ref()
                .map(|_| collector(&pending, ModelAction::Delete)),
        };

        let value = match f(tx_dao).await {
            Ok(value) => value,
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Failed to roll back transaction: {}", rollback_err);
                }
                return Err(err);
            }
        };

        tx.commit().await?;

        let calls = std::mem::take(&mut *pending.lock());
        debug!("Transaction committed, replaying {} after callbacks", calls.len());
        for call in calls {
            let hook = match call.action {
                ModelAction::Create => &self.after_create,
                ModelAction::Update => &self.after_update,
                ModelAction::Delete => &self.after_delete,
            };
            if let Some(hook) = hook {
                if let Err(err) = hook(self.clone(), call.model).await {
                    warn!("After {:?} callback failed: {}", call.action, err);
                }
            }
        }

        Ok(value)
    }

    async fn create<M: Model + Clone>(&self, model: &mut M) -> KeelResult<()> {
        if !model.has_id() {
            model.refresh_id();
        }
        model.mark_as_new();

        if model.created().is_none() {
            model.refresh_created();
        }
        if model.updated().is_none() {
            model.refresh_updated();
        }

        if let Some(before) = &self.before_create {
            *model = self.run_before(before, model).await?;
        }

        self.nonconcurrent_db
            .insert(model.table_name(), &insert_columns(&*model))
            .await?;
        model.mark_as_not_new();

        self.run_after(self.after_create.as_ref(), ModelAction::Create, model).await;
        Ok(())
    }

    async fn update<M: Model + Clone>(&self, model: &mut M) -> KeelResult<()> {
        if !model.has_id() {
            return Err(KeelError::validation("ID is not set"));
        }

        if model.created().is_none() {
            model.refresh_created();
        }
        model.refresh_updated();

        if let Some(before) = &self.before_update {
            *model = self.run_before(before, model).await?;
        }

        let columns = update_columns(&*model);
        if columns.is_empty() {
            debug!(
                "Explicit column map of {} {} is empty; skipping the write",
                model.table_name(),
                model.id()
            );
        } else {
            self.nonconcurrent_db
                .update(model.table_name(), &columns, &Filter::by_id(model.id()))
                .await?;
        }

        self.run_after(self.after_update.as_ref(), ModelAction::Update, model).await;
        Ok(())
    }

    async fn delete_once<M: Model + Clone>(&self, model: &mut M) -> KeelResult<()> {
        if !model.has_id() {
            return Err(KeelError::validation("ID is not set"));
        }

        if let Some(before) = &self.before_delete {
            *model = self.run_before(before, model).await?;
        }

        self.nonconcurrent_db
            .delete(model.table_name(), &Filter::by_id(model.id()))
            .await?;

        self.run_after(self.after_delete.as_ref(), ModelAction::Delete, model).await;
        Ok(())
    }

    async fn run_before<M: Model + Clone>(&self, before: &BeforeFunc, model: &M) -> KeelResult<M> {
        let out = before(self.clone(), Box::new(model.clone())).await?;
        out.into_any().downcast::<M>().map(|m| *m).map_err(|_| {
            KeelError::internal(format!(
                "before callback replaced the {} record with another type",
                model.table_name()
            ))
        })
    }

    async fn run_after<M: Model + Clone>(&self, after: Option<&AfterFunc>, action: ModelAction, model: &M) {
        let Some(after) = after else {
            return;
        };
        if let Err(err) = after(self.clone(), Box::new(model.clone())).await {
            warn!("After {:?} callback for {} {} failed: {}", action, model.table_name(), model.id(), err);
        }
    }

    fn dao_for_attempt(&self, attempt: u32) -> Cow<'_, Self> {
        if attempt > 1 {
            Cow::Owned(self.without_before_hooks())
        } else {
            Cow::Borrowed(self)
        }
    }

    /// Sleeps before the next attempt, or hands the error back when
    /// `attempt` may not be retried.
    async fn wait_for_retry(&self, attempt: u32, err: KeelError) -> KeelResult<()> {
        if !self.retry_policy.should_retry(attempt, err.is_lock_contention()) {
            if attempt > 1 {
                warn!("Giving up after {} attempts: {}", attempt, err);
            }
            return Err(err);
        }

        let delay = self.retry_policy.delay_for_attempt(attempt);
        debug!("Attempt {} failed: {}; retrying in {:?}", attempt, err, delay);
        tokio::time::sleep(delay).await;
        Ok(())
    }
}

impl std::fmt::Debug for Dao {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dao")
            .field("concurrent_db", &self.concurrent_db)
            .field("nonconcurrent_db", &self.nonconcurrent_db)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

fn collector(pending: &Arc<Mutex<Vec<AfterCall>>>, action: ModelAction) -> AfterFunc {
    let pending = Arc::clone(pending);
    Arc::new(move |_dao: Dao, model: Box<dyn Model>| -> BoxFuture<'static, ()> {
        pending.lock().push(AfterCall { action, model });
        Box::pin(async { Ok(()) })
    })
}
