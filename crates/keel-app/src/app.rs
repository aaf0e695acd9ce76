//! The application instance.
//!
//! [`BaseApp`] owns everything that lives for the whole process: the
//! configuration, the hooks, the cache, the current settings and the
//! storage pools with their hook-wired [`Dao`]. Nothing is global, so
//! several instances can coexist (e.g. in tests).

use crate::events::{BootstrapEvent, ModelEvent};
use crate::hooks::AppHooks;
use keel_config::AppConfig;
use keel_core::{BoxFuture, Hook, KeelError, KeelResult, Model, PasswordHashing, Settings, Store, User};
use keel_repository::{DatabasePool, Dao};
use keel_resilience::RetryPolicy;
use keel_security::PasswordHasher;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

type ModelHookSelector = fn(&AppHooks) -> &Hook<ModelEvent>;

/// The application instance.
pub struct BaseApp {
    config: AppConfig,
    hooks: Arc<AppHooks>,
    cache: Store<Value>,
    settings: RwLock<Arc<Settings>>,
    pool: RwLock<Option<DatabasePool>>,
    dao: RwLock<Option<Dao>>,
    password_hasher: Arc<dyn PasswordHashing>,
}

impl BaseApp {
    /// Creates a new, not yet bootstrapped application.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let password_hasher = Arc::new(PasswordHasher::from_config(&config.security));
        Self {
            config,
            hooks: Arc::new(AppHooks::new()),
            cache: Store::default(),
            settings: RwLock::new(Arc::new(Settings::new())),
            pool: RwLock::new(None),
            dao: RwLock::new(None),
            password_hasher,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.config.app.debug
    }

    #[must_use]
    pub fn hooks(&self) -> &AppHooks {
        &self.hooks
    }

    /// The application-wide key/value cache.
    #[must_use]
    pub fn cache(&self) -> &Store<Value> {
        &self.cache
    }

    /// The current settings snapshot.
    #[must_use]
    pub fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.settings.read())
    }

    #[must_use]
    pub fn password_hasher(&self) -> &dyn PasswordHashing {
        self.password_hasher.as_ref()
    }

    /// Returns the Dao bound to the application pools.
    pub fn dao(&self) -> KeelResult<Dao> {
        self.dao.read().clone().ok_or_else(not_bootstrapped)
    }

    pub fn pool(&self) -> KeelResult<DatabasePool> {
        self.pool.read().clone().ok_or_else(not_bootstrapped)
    }

    #[must_use]
    pub fn is_bootstrapped(&self) -> bool {
        self.dao.read().is_some()
    }

    /// Opens the storage pools and wires the Dao to the model hooks.
    ///
    /// An error from a before-bootstrap handler aborts the bootstrap.
    /// After-bootstrap errors are logged only.
    pub async fn bootstrap(self: &Arc<Self>) -> KeelResult<()> {
        let mut event = BootstrapEvent {
            app: Arc::clone(self),
        };
        self.hooks.on_before_bootstrap.trigger(&mut event).await?;

        self.reset_bootstrap_state().await;

        let pool = DatabasePool::connect(&self.config.database).await?;
        let dao = self.create_dao_with_hooks(&pool);
        *self.pool.write() = Some(pool);
        *self.dao.write() = Some(dao);

        // the settings table may not exist before the first migration run
        if let Err(err) = self.refresh_settings().await {
            debug!("Settings not loaded during bootstrap: {}", err);
        }

        info!("Application bootstrapped");

        if let Err(err) = self.hooks.on_after_bootstrap.trigger(&mut event).await {
            warn!("After bootstrap hook failed: {}", err);
        }

        Ok(())
    }

    /// Drops the Dao and closes the storage pools.
    pub async fn reset_bootstrap_state(&self) {
        self.dao.write().take();
        let pool = self.pool.write().take();
        if let Some(pool) = pool {
            pool.close().await;
        }
    }

    /// Runs the embedded migrations.
    pub async fn run_migrations(&self) -> KeelResult<()> {
        self.pool()?
            .run_migrations(&RetryPolicy::from_config(&self.config.retry))
            .await
    }

    /// Reloads the settings from storage.
    ///
    /// On first run, when nothing is stored yet, the current settings are
    /// saved as the initial ones.
    pub async fn refresh_settings(&self) -> KeelResult<()> {
        let dao = self.dao()?;
        let mut settings = (*self.settings()).clone();

        match dao.find_settings().await? {
            Some(stored) => settings.merge(&stored)?,
            None => {
                info!("No stored settings found, saving the defaults");
                dao.save_settings(&settings).await?;
            }
        }

        *self.settings.write() = Arc::new(settings);
        Ok(())
    }

    /// Creates the configured superadmin when there are no users yet.
    ///
    /// Returns `true` if the account was created.
    pub async fn ensure_superadmin(&self) -> KeelResult<bool> {
        let dao = self.dao()?;
        if dao.total_users().await? > 0 {
            return Ok(false);
        }

        let mut admin = User::new(self.config.admin.email.as_str());
        admin.is_admin = true;
        admin.is_superadmin = true;
        admin.set_password(self.password_hasher(), &self.config.admin.password)?;
        dao.save_user(&mut admin).await?;

        info!("Created superadmin account {}", admin.email);
        Ok(true)
    }

    fn create_dao_with_hooks(&self, pool: &DatabasePool) -> Dao {
        Dao::from_pool(pool)
            .with_retry_policy(RetryPolicy::from_config(&self.config.retry))
            .with_before_create(before_hook(&self.hooks, |h| &h.on_model_before_create))
            .with_after_create(after_hook(&self.hooks, |h| &h.on_model_after_create))
            .with_before_update(before_hook(&self.hooks, |h| &h.on_model_before_update))
            .with_after_update(after_hook(&self.hooks, |h| &h.on_model_after_update))
            .with_before_delete(before_hook(&self.hooks, |h| &h.on_model_before_delete))
            .with_after_delete(after_hook(&self.hooks, |h| &h.on_model_after_delete))
    }
}

impl std::fmt::Debug for BaseApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseApp")
            .field("config", &self.config)
            .field("bootstrapped", &self.is_bootstrapped())
            .finish_non_exhaustive()
    }
}

fn not_bootstrapped() -> KeelError {
    KeelError::Internal("the application is not bootstrapped".to_string())
}

/// Adapts a model hook into a Dao before callback. The record the
/// handlers leave in the event is the one written.
fn before_hook(
    hooks: &Arc<AppHooks>,
    select: ModelHookSelector,
) -> impl Fn(Dao, Box<dyn Model>) -> BoxFuture<'static, Box<dyn Model>> + Send + Sync + 'static {
    let hooks = Arc::clone(hooks);
    move |dao: Dao, model: Box<dyn Model>| -> BoxFuture<'static, Box<dyn Model>> {
        let hooks = Arc::clone(&hooks);
        Box::pin(async move {
            let mut event = ModelEvent { dao, model };
            select(&hooks).trigger(&mut event).await?;
            Ok(event.model)
        })
    }
}

/// Adapts a model hook into a Dao after callback.
fn after_hook(
    hooks: &Arc<AppHooks>,
    select: ModelHookSelector,
) -> impl Fn(Dao, Box<dyn Model>) -> BoxFuture<'static, ()> + Send + Sync + 'static {
    let hooks = Arc::clone(hooks);
    move |dao: Dao, model: Box<dyn Model>| -> BoxFuture<'static, ()> {
        let hooks = Arc::clone(&hooks);
        Box::pin(async move {
            let mut event = ModelEvent { dao, model };
            select(&hooks).trigger(&mut event).await
        })
    }
}
