//! Tag Controller entry point.

use service_core::observability::init_tracing;
use std::sync::Arc;
use tag_controller::config::ControllerConfig;
use tag_controller::services::directory::TailscaleDirectory;
use tag_controller::services::metrics::init_metrics;
use tag_controller::startup::Application;
use tokio::signal;
use tokio_util::sync::CancellationToken;

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load configuration
    let config = ControllerConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    // Initialize tracing
    init_tracing("tag-controller", &config.common.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        tailnet = %config.directory.tailnet,
        auto_apply = config.auto_apply,
        tags = ?config.tags_to_apply,
        poll_interval_secs = config.poll_interval.as_secs(),
        "Starting tag-controller"
    );

    // Initialize metrics
    init_metrics();

    let directory = Arc::new(TailscaleDirectory::new(config.directory.clone()));
    let cancel = CancellationToken::new();

    let app = Application::build(config, directory, cancel.clone())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build application");
            std::io::Error::other(format!("Application build error: {}", e))
        })?;

    tokio::select! {
        result = app.run_until_stopped() => result,
        _ = shutdown_signal() => {
            cancel.cancel();
            Ok(())
        }
    }
}
