//! Common test utilities for approval-bot integration tests.

use approval_bot::config::{BotConfig, DiscordConfig};
use approval_bot::services::controller::MockControllerApi;
use approval_bot::services::gateway::MockGateway;
use approval_bot::startup::Application;
use ed25519_dalek::{Signer, SigningKey};
use service_core::config::Config as CommonConfig;
use std::sync::Arc;
use std::sync::Once;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,approval_bot=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn test_config(public_key: String, fixed_tags: Option<Vec<String>>) -> BotConfig {
    BotConfig {
        common: CommonConfig {
            port: 0,
            log_level: "debug".to_string(),
        },
        discord: DiscordConfig {
            bot_token: "test-token".to_string(),
            app_id: "1234567890".to_string(),
            public_key,
            channel_id: "channel-1".to_string(),
            guild_id: None,
        },
        controller_url: "http://127.0.0.1:0".to_string(),
        fixed_tags,
        poll_interval: Duration::from_secs(3600),
    }
}

/// Test application wrapper with a signing key matching the configured
/// public key.
#[allow(dead_code)]
pub struct TestApp {
    pub address: String,
    pub controller: Arc<MockControllerApi>,
    pub gateway: Arc<MockGateway>,
    pub cancel: CancellationToken,
    signing_key: SigningKey,
    client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn(controller: Arc<MockControllerApi>) -> TestApp {
        Self::spawn_with(controller, None).await
    }

    pub async fn spawn_with(
        controller: Arc<MockControllerApi>,
        fixed_tags: Option<Vec<String>>,
    ) -> TestApp {
        init_tracing();

        let signing_key = SigningKey::from_bytes(&[42u8; 32]);
        let public_key = hex::encode(signing_key.verifying_key().to_bytes());
        let gateway = Arc::new(MockGateway::default());
        let cancel = CancellationToken::new();

        let app = Application::build(
            test_config(public_key, fixed_tags),
            controller.clone(),
            gateway.clone(),
            cancel.clone(),
        )
        .await
        .expect("Failed to build application");
        let address = format!("http://127.0.0.1:{}", app.port());

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        TestApp {
            address,
            controller,
            gateway,
            cancel,
            signing_key,
            client: reqwest::Client::new(),
        }
    }

    /// POST a correctly signed interaction payload.
    pub async fn post_interaction(&self, payload: &serde_json::Value) -> reqwest::Response {
        let body = payload.to_string();
        let timestamp = "1700000000";

        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body.as_bytes());
        let signature = hex::encode(self.signing_key.sign(&message).to_bytes());

        self.client
            .post(format!("{}/interactions", self.address))
            .header("X-Signature-Ed25519", signature)
            .header("X-Signature-Timestamp", timestamp)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// POST an interaction signed with the wrong key.
    pub async fn post_badly_signed(&self, payload: &serde_json::Value) -> reqwest::Response {
        let body = payload.to_string();
        let timestamp = "1700000000";

        let wrong_key = SigningKey::from_bytes(&[9u8; 32]);
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body.as_bytes());
        let signature = hex::encode(wrong_key.sign(&message).to_bytes());

        self.client
            .post(format!("{}/interactions", self.address))
            .header("X-Signature-Ed25519", signature)
            .header("X-Signature-Timestamp", timestamp)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}
