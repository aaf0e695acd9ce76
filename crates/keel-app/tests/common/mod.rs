//! Common test infrastructure for application tests.

#![allow(dead_code)]

use keel_app::{AuthService, BaseApp};
use keel_config::{AdminConfig, AppConfig, DatabaseConfig, RetryConfig, SecurityConfig};
use keel_core::User;
use std::sync::Arc;
use tempfile::TempDir;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// An application backed by a SQLite file in a temporary directory.
pub struct TestApp {
    _dir: TempDir,
    pub app: Arc<BaseApp>,
}

impl TestApp {
    /// Creates an application that is not bootstrapped yet.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let app = Arc::new(BaseApp::new(test_config(&dir)));
        Self { _dir: dir, app }
    }

    /// Creates a bootstrapped and migrated application.
    pub async fn bootstrapped() -> Self {
        let test_app = Self::new();
        test_app.app.bootstrap().await.expect("Failed to bootstrap");
        test_app.app.run_migrations().await.expect("Failed to run migrations");
        test_app
            .app
            .refresh_settings()
            .await
            .expect("Failed to load settings");
        test_app
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(Arc::clone(&self.app))
    }

    /// Saves a user with `email` and `password`.
    pub async fn create_user(&self, email: &str, password: &str) -> User {
        let mut user = User::new(email);
        user.set_password(self.app.password_hasher(), password)
            .expect("Failed to hash password");
        self.app
            .dao()
            .expect("app not bootstrapped")
            .save_user(&mut user)
            .await
            .expect("Failed to save user");
        user
    }
}

fn test_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.database = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("data.db").display()),
        min_connections: 0,
        max_connections: 5,
        acquire_timeout_secs: 5,
        idle_timeout_secs: 60,
        busy_timeout_ms: 5000,
        run_migrations: true,
    };
    config.retry = RetryConfig {
        max_attempts: 5,
        step_delay_ms: 10,
    };
    config.security = SecurityConfig {
        password_memory_kib: 1024,
        password_iterations: 1,
        password_parallelism: 1,
    };
    config.admin = AdminConfig {
        email: ADMIN_EMAIL.to_string(),
        password: ADMIN_PASSWORD.to_string(),
    };
    config
}
