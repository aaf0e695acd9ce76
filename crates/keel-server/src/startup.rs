//! Server startup utilities.

use keel_app::{BaseApp, ServeEvent};
use keel_config::ObservabilityConfig;
use keel_core::KeelResult;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},keel=debug,sqlx=warn", config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}

/// Brings `app` into a ready state: bootstrap, a database health check,
/// migrations, settings and the initial superadmin, then the before-serve
/// hook.
pub async fn start(app: &Arc<BaseApp>) -> KeelResult<()> {
    app.bootstrap().await?;
    app.pool()?.health_check().await?;

    if app.config().database.run_migrations {
        app.run_migrations().await?;
    }

    app.refresh_settings().await?;

    if app.ensure_superadmin().await? {
        warn!(
            "Created the initial superadmin {}; change its password",
            app.config().admin.email
        );
    }

    let mut event = ServeEvent {
        app: Arc::clone(app),
    };
    app.hooks().on_before_serve.trigger(&mut event).await?;

    print_startup_info(app);
    Ok(())
}

/// Prints server startup information.
pub fn print_startup_info(app: &BaseApp) {
    let separator = "=".repeat(60);
    let settings = app.settings();
    info!("{}", separator);
    info!("App:         {}", settings.meta.app_name);
    info!("URL:         {}", settings.meta.app_url);
    info!("Database:    {}", app.config().database.url);
    info!("Environment: {}", app.config().app.environment);
    info!("{}", separator);
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install the terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
