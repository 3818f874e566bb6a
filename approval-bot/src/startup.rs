//! Application startup and lifecycle management.

use crate::config::BotConfig;
use crate::discord::{CommandSpec, InteractionVerifier};
use crate::dispatcher::NotificationDispatcher;
use crate::handlers::{health_check, interactions, COMMAND_NAME};
use crate::services::controller::ControllerApi;
use crate::services::gateway::ChatGateway;
use crate::workflow::ApprovalWorkflow;
use axum::{
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<dyn ControllerApi>,
    pub workflow: Arc<ApprovalWorkflow>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub verifier: InteractionVerifier,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
    gateway: Arc<dyn ChatGateway>,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl Application {
    /// Build the application with the given configuration, controller
    /// client and chat gateway (port 0 = random port for testing).
    pub async fn build(
        config: BotConfig,
        controller: Arc<dyn ControllerApi>,
        gateway: Arc<dyn ChatGateway>,
        cancel: CancellationToken,
    ) -> Result<Self, AppError> {
        let verifier = InteractionVerifier::from_hex(&config.discord.public_key)
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("DISCORD_PUBLIC_KEY: {}", e)))?;

        let workflow = Arc::new(ApprovalWorkflow::new(
            controller.clone(),
            config.fixed_tags.clone(),
        ));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            gateway.clone(),
            config.discord.channel_id.clone(),
        ));

        let state = AppState {
            controller,
            workflow,
            dispatcher,
            verifier,
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("approval-bot: HTTP on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
            gateway,
            poll_interval: config.poll_interval,
            cancel,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Register the slash command, then run the webhook server and the
    /// scheduled pending-device check until the cancellation token fires.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let command = CommandSpec {
            name: COMMAND_NAME.to_string(),
            description: "Check and approve pending Tailscale devices".to_string(),
        };
        self.gateway.register_command(&command).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to register slash command");
            std::io::Error::other(format!("Command registration error: {}", e))
        })?;
        tracing::info!(name = COMMAND_NAME, "Registered slash command");

        let router = Router::new()
            .route("/health", get(health_check))
            .route("/interactions", post(interactions))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone());

        let scheduler = run_scheduled_checks(
            self.state.controller.clone(),
            self.state.dispatcher.clone(),
            self.poll_interval,
            self.cancel.clone(),
        );

        let shutdown = self.cancel.clone();
        let server = axum::serve(self.listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await });

        tokio::select! {
            result = server => result,
            _ = scheduler => Ok(()),
        }
    }
}

/// Unattended pending-device checks, one per poll interval. The first
/// check runs a full interval after startup.
async fn run_scheduled_checks(
    controller: Arc<dyn ControllerApi>,
    dispatcher: Arc<NotificationDispatcher>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        poll_interval_secs = poll_interval.as_secs(),
        "Starting scheduled checks"
    );

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the loop fires
    // one full interval after startup.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Scheduled checks stopped");
                return;
            }
            _ = ticker.tick() => run_check(&controller, &dispatcher).await,
        }
    }
}

async fn run_check(controller: &Arc<dyn ControllerApi>, dispatcher: &NotificationDispatcher) {
    tracing::info!("Running scheduled check");

    match controller.pending_devices().await {
        Ok(pending) => {
            if let Err(err) = dispatcher.dispatch(&pending).await {
                tracing::error!(error = %err, "Failed to dispatch notifications");
            }
        }
        Err(err) => tracing::error!(error = %err, "Scheduled check failed"),
    }
}
