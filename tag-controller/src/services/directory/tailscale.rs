use super::{DirectoryClient, DirectoryError};
use crate::config::DirectoryConfig;
use crate::models::Device;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Directory client for the Tailscale v2 management API.
pub struct TailscaleDirectory {
    config: DirectoryConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DevicesEnvelope {
    devices: Vec<ApiDevice>,
}

#[derive(Debug, Deserialize)]
struct ApiDevice {
    id: String,
    name: String,
    #[serde(default)]
    authorized: bool,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(rename = "tagOwners", default)]
    tag_owners: BTreeMap<String, serde_json::Value>,
}

impl TailscaleDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, DirectoryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(DirectoryError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl DirectoryClient for TailscaleDirectory {
    async fn list(&self) -> Result<Vec<Device>, DirectoryError> {
        let response = self
            .http
            .get(self.url(&format!(
                "/api/v2/tailnet/{}/devices",
                self.config.tailnet
            )))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let envelope: DevicesEnvelope = Self::check(response).await?.json().await?;

        Ok(envelope
            .devices
            .into_iter()
            .map(|d| Device {
                id: d.id,
                name: d.name,
                authorized: d.authorized,
                tags: d.tags,
            })
            .collect())
    }

    async fn set_tags(&self, device_id: &str, tags: &[String]) -> Result<(), DirectoryError> {
        let response = self
            .http
            .post(self.url(&format!("/api/v2/device/{}/tags", device_id)))
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({ "tags": tags }))
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn available_tags(&self) -> Result<Vec<String>, DirectoryError> {
        let response = self
            .http
            .get(self.url(&format!("/api/v2/tailnet/{}/acl", self.config.tailnet)))
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let policy: PolicyFile = Self::check(response).await?.json().await?;

        // BTreeMap keys come out deduplicated and sorted.
        Ok(policy.tag_owners.into_keys().collect())
    }
}
