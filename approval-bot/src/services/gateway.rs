//! Outbound chat gateway.
//!
//! The minimal surface the bot needs from the chat platform: register the
//! slash command and post messages with interactive components. Inbound
//! interactions arrive over the webhook endpoint instead.

use crate::discord::{CommandSpec, MessageBody};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use std::sync::Mutex;
use thiserror::Error;

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Discord returned status {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn register_command(&self, command: &CommandSpec) -> Result<(), GatewayError>;
    async fn create_message(
        &self,
        channel_id: &str,
        message: &MessageBody,
    ) -> Result<(), GatewayError>;
}

/// Gateway backed by the Discord REST API.
pub struct DiscordGateway {
    bot_token: String,
    app_id: String,
    guild_id: Option<String>,
    http: reqwest::Client,
}

impl DiscordGateway {
    pub fn new(bot_token: String, app_id: String, guild_id: Option<String>) -> Self {
        Self {
            bot_token,
            app_id,
            guild_id,
            http: reqwest::Client::new(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    async fn check(response: reqwest::Response) -> Result<(), GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ChatGateway for DiscordGateway {
    async fn register_command(&self, command: &CommandSpec) -> Result<(), GatewayError> {
        let url = match &self.guild_id {
            Some(guild) => format!(
                "{}/applications/{}/guilds/{}/commands",
                DISCORD_API_BASE, self.app_id, guild
            ),
            None => format!("{}/applications/{}/commands", DISCORD_API_BASE, self.app_id),
        };

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .json(command)
            .send()
            .await?;
        Self::check(response).await
    }

    async fn create_message(
        &self,
        channel_id: &str,
        message: &MessageBody,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/channels/{}/messages", DISCORD_API_BASE, channel_id);

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .json(message)
            .send()
            .await?;
        Self::check(response).await
    }
}

/// Recording gateway for tests.
#[derive(Default)]
pub struct MockGateway {
    messages: Mutex<Vec<(String, MessageBody)>>,
    commands: Mutex<Vec<CommandSpec>>,
}

impl MockGateway {
    pub fn messages(&self) -> Vec<(String, MessageBody)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn registered_commands(&self) -> Vec<CommandSpec> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn register_command(&self, command: &CommandSpec) -> Result<(), GatewayError> {
        self.commands.lock().unwrap().push(command.clone());
        Ok(())
    }

    async fn create_message(
        &self,
        channel_id: &str,
        message: &MessageBody,
    ) -> Result<(), GatewayError> {
        self.messages
            .lock()
            .unwrap()
            .push((channel_id.to_string(), message.clone()));
        Ok(())
    }
}
