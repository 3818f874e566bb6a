//! Approval Bot entry point.

use approval_bot::config::BotConfig;
use approval_bot::services::controller::HttpControllerClient;
use approval_bot::services::gateway::DiscordGateway;
use approval_bot::startup::Application;
use service_core::observability::init_tracing;
use std::sync::Arc;
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
    let config = BotConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    // Initialize tracing
    init_tracing("approval-bot", &config.common.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        controller_url = %config.controller_url,
        channel_id = %config.discord.channel_id,
        fixed_tags = ?config.fixed_tags,
        poll_interval_secs = config.poll_interval.as_secs(),
        "Starting approval-bot"
    );

    let controller = Arc::new(HttpControllerClient::new(&config.controller_url).map_err(|e| {
        tracing::error!(error = %e, "Failed to build controller client");
        std::io::Error::other(format!("Controller client error: {}", e))
    })?);

    let gateway = Arc::new(DiscordGateway::new(
        config.discord.bot_token.clone(),
        config.discord.app_id.clone(),
        config.discord.guild_id.clone(),
    ));

    let cancel = CancellationToken::new();

    let app = Application::build(config, controller, gateway, cancel.clone())
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
