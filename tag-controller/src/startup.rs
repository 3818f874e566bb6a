//! Application startup and lifecycle management.

use crate::config::ControllerConfig;
use crate::handlers::{
    approve_device, available_tags, decline_device, health_check, metrics_endpoint,
    pending_devices,
};
use crate::reconciler::Reconciler;
use crate::services::directory::DirectoryClient;
use crate::services::metrics::{MetricsSink, PrometheusSink};
use axum::{
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::retry::RetryPolicy;
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
    pub config: ControllerConfig,
    pub directory: Arc<dyn DirectoryClient>,
    pub retry: RetryPolicy,
    pub cancel: CancellationToken,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
    metrics: Arc<dyn MetricsSink>,
}

impl Application {
    /// Build the application with the given configuration and directory
    /// client (port 0 = random port for testing).
    pub async fn build(
        config: ControllerConfig,
        directory: Arc<dyn DirectoryClient>,
        cancel: CancellationToken,
    ) -> Result<Self, AppError> {
        let state = AppState {
            config: config.clone(),
            directory,
            retry: RetryPolicy::default(),
            cancel,
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("tag-controller: HTTP on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
            metrics: Arc::new(PrometheusSink),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Reconciler wired to this application's directory and shutdown token.
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.state.directory.clone(),
            self.metrics.clone(),
            self.state.cancel.clone(),
        )
    }

    /// Run the HTTP server and, when auto-apply is enabled, the scheduled
    /// reconciliation loop, until the cancellation token fires.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let cancel = self.state.cancel.clone();
        let config = self.state.config.clone();
        let reconciler = self.reconciler();

        let router = Router::new()
            .route("/health", get(health_check))
            .route("/metrics", get(metrics_endpoint))
            .route("/pending-devices", get(pending_devices))
            .route("/tags", get(available_tags))
            .route("/approve/:device_id", post(approve_device))
            .route("/decline/:device_id", post(decline_device))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state);

        let scheduler = {
            let cancel = cancel.clone();
            async move {
                if config.auto_apply {
                    run_reconcile_loop(
                        reconciler,
                        config.tags_to_apply,
                        config.poll_interval,
                        cancel,
                    )
                    .await;
                } else {
                    cancel.cancelled().await;
                }
            }
        };

        let shutdown = cancel.clone();
        let server = axum::serve(self.listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await });

        tokio::select! {
            result = server => result,
            _ = scheduler => Ok(()),
        }
    }
}

/// Drive unattended reconciliation: one pass immediately at startup, then
/// one per poll interval, until the token fires.
async fn run_reconcile_loop(
    reconciler: Reconciler,
    tags_to_apply: Vec<String>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        poll_interval_secs = poll_interval.as_secs(),
        tags = ?tags_to_apply,
        "Starting reconciliation loop"
    );

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconciliation loop stopped");
                return;
            }
            _ = ticker.tick() => reconciler.reconcile(&tags_to_apply).await,
        }
    }
}
