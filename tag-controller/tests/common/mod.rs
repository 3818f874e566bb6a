//! Common test utilities for tag-controller integration tests.

use service_core::config::Config as CommonConfig;
use std::sync::Arc;
use std::sync::Once;
use std::time::Duration;
use tag_controller::config::{ControllerConfig, DirectoryConfig};
use tag_controller::services::MockDirectory;
use tag_controller::startup::Application;
use tokio_util::sync::CancellationToken;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,tag_controller=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn test_config() -> ControllerConfig {
    ControllerConfig {
        common: CommonConfig {
            port: 0,
            log_level: "debug".to_string(),
        },
        directory: DirectoryConfig {
            api_base: "http://127.0.0.1:0".to_string(),
            tailnet: "example.com".to_string(),
            api_key: "tskey-test".to_string(),
        },
        auto_apply: false,
        tags_to_apply: vec![],
        poll_interval: Duration::from_secs(30),
    }
}

/// Test application wrapper.
#[allow(dead_code)]
pub struct TestApp {
    pub address: String,
    pub directory: Arc<MockDirectory>,
    pub cancel: CancellationToken,
}

impl TestApp {
    /// Spawn the application on a random port against the given mock
    /// directory.
    pub async fn spawn(directory: Arc<MockDirectory>) -> TestApp {
        init_tracing();

        let cancel = CancellationToken::new();
        let app = Application::build(test_config(), directory.clone(), cancel.clone())
            .await
            .expect("Failed to build application");
        let address = format!("http://127.0.0.1:{}", app.port());

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        TestApp {
            address,
            directory,
            cancel,
        }
    }
}
