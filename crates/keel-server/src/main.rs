//! # Keel Server
//!
//! Loads the layered configuration, starts the application and keeps it
//! running until a shutdown signal arrives.

use keel_app::BaseApp;
use keel_config::ConfigLoader;
use keel_core::KeelResult;
use keel_server::startup::{init_logging, shutdown_signal, start};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match ConfigLoader::from_default_location() {
        Ok(loader) => loader.into_config(),
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.observability);

    info!("Starting Keel...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let app = Arc::new(BaseApp::new(config));
    if let Err(e) = run(&app).await {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run(app: &Arc<BaseApp>) -> KeelResult<()> {
    start(app).await?;

    shutdown_signal().await;

    app.reset_bootstrap_state().await;
    info!("Shutdown complete");
    Ok(())
}
