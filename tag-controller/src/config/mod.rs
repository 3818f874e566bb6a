//! Configuration module for tag-controller.

use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub common: core_config::Config,
    pub directory: DirectoryConfig,
    /// When set, the scheduled loop applies `tags_to_apply` to pending
    /// devices without human approval.
    pub auto_apply: bool,
    pub tags_to_apply: Vec<String>,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub api_base: String,
    pub tailnet: String,
    pub api_key: String,
}

impl ControllerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let tailnet = env::var("TAILSCALE_TAILNET").map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!("TAILSCALE_TAILNET is required"))
        })?;
        let api_key = env::var("TAILSCALE_API_KEY").map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!("TAILSCALE_API_KEY is required"))
        })?;
        let api_base = env::var("TAILSCALE_API_BASE")
            .unwrap_or_else(|_| "https://api.tailscale.com".to_string());

        let auto_apply = env::var("AUTO_APPLY")
            .map(|v| v.parse().unwrap_or(false))
            .unwrap_or(false);

        let tags_to_apply = parse_tag_list(&env::var("TAGS_TO_APPLY").unwrap_or_default());
        if auto_apply && tags_to_apply.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TAGS_TO_APPLY is required when AUTO_APPLY is set (e.g., tag:a,tag:b)"
            )));
        }

        let poll_interval = match env::var("POLL_INTERVAL") {
            Ok(raw) => match raw.parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => {
                    tracing::warn!(
                        value = %raw,
                        default_secs = DEFAULT_POLL_INTERVAL.as_secs(),
                        "Invalid POLL_INTERVAL, using default"
                    );
                    DEFAULT_POLL_INTERVAL
                }
            },
            Err(_) => DEFAULT_POLL_INTERVAL,
        };

        Ok(Self {
            common,
            directory: DirectoryConfig {
                api_base,
                tailnet,
                api_key,
            },
            auto_apply,
            tags_to_apply,
            poll_interval,
        })
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_list() {
        assert_eq!(
            parse_tag_list("tag:a, tag:b ,,tag:c"),
            vec!["tag:a", "tag:b", "tag:c"]
        );
        assert!(parse_tag_list("").is_empty());
        assert!(parse_tag_list(" , ,").is_empty());
    }
}
