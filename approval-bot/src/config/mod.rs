//! Configuration module for approval-bot.

use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub common: core_config::Config,
    pub discord: DiscordConfig,
    pub controller_url: String,
    /// When set, Approve applies these tags directly instead of offering a
    /// tag picker.
    pub fixed_tags: Option<Vec<String>>,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub bot_token: String,
    pub app_id: String,
    /// Hex-encoded ed25519 public key from the application settings, used
    /// to verify interaction webhook deliveries.
    pub public_key: String,
    pub channel_id: String,
    /// Empty = register the slash command globally.
    pub guild_id: Option<String>,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let bot_token = require("DISCORD_BOT_TOKEN")?;
        let app_id = require("DISCORD_APP_ID")?;
        let public_key = require("DISCORD_PUBLIC_KEY")?;
        let channel_id = require("DISCORD_CHANNEL_ID")?;
        let guild_id = env::var("DISCORD_GUILD_ID").ok().filter(|g| !g.is_empty());

        let controller_url = env::var("CONTROLLER_API_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let fixed_tags = env::var("FIXED_TAGS")
            .ok()
            .map(|raw| parse_tag_list(&raw))
            .filter(|tags| !tags.is_empty());

        let poll_interval = match env::var("POLL_INTERVAL") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "POLL_INTERVAL must be a number of seconds (e.g., 86400)"
                    ))
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => DEFAULT_POLL_INTERVAL,
        };

        Ok(Self {
            common,
            discord: DiscordConfig {
                bot_token,
                app_id,
                public_key,
                channel_id,
                guild_id,
            },
            controller_url,
            fixed_tags,
            poll_interval,
        })
    }
}

fn require(key: &str) -> Result<String, AppError> {
    env::var(key).map_err(|_| AppError::ConfigError(anyhow::anyhow!("{} is required", key)))
}

/// Split a comma-separated tag list, trimming whitespace and dropping empty
/// entries.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
