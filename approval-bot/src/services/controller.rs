//! HTTP client for the tag-controller API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// A device awaiting tag approval, as reported by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDevice {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct PendingDevicesResponse {
    pending_devices: Vec<PendingDevice>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ApproveRequest<'a> {
    tags: &'a [String],
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Controller returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait ControllerApi: Send + Sync {
    async fn pending_devices(&self) -> Result<Vec<PendingDevice>, ControllerError>;
    async fn available_tags(&self) -> Result<Vec<String>, ControllerError>;
    async fn approve(&self, device_id: &str, tags: &[String]) -> Result<(), ControllerError>;
    async fn decline(&self, device_id: &str) -> Result<(), ControllerError>;
}

pub struct HttpControllerClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpControllerClient {
    pub fn new(base_url: &str) -> Result<Self, ControllerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check(response: &reqwest::Response) -> Result<(), ControllerError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ControllerError::Status(response.status().as_u16()))
        }
    }
}

#[async_trait]
impl ControllerApi for HttpControllerClient {
    async fn pending_devices(&self) -> Result<Vec<PendingDevice>, ControllerError> {
        let response = self.http.get(self.url("/pending-devices")).send().await?;
        Self::check(&response)?;
        let body: PendingDevicesResponse = response.json().await?;
        Ok(body.pending_devices)
    }

    async fn available_tags(&self) -> Result<Vec<String>, ControllerError> {
        let response = self.http.get(self.url("/tags")).send().await?;
        Self::check(&response)?;
        let body: TagsResponse = response.json().await?;
        Ok(body.tags)
    }

    async fn approve(&self, device_id: &str, tags: &[String]) -> Result<(), ControllerError> {
        let response = self
            .http
            .post(self.url(&format!("/approve/{}", device_id)))
            .json(&ApproveRequest { tags })
            .send()
            .await?;
        Self::check(&response)
    }

    async fn decline(&self, device_id: &str) -> Result<(), ControllerError> {
        let response = self
            .http
            .post(self.url(&format!("/decline/{}", device_id)))
            .send()
            .await?;
        Self::check(&response)
    }
}

/// Scripted controller for tests.
#[derive(Default)]
pub struct MockControllerApi {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    pending: Vec<PendingDevice>,
    tags: Vec<String>,
    fail_pending: bool,
    fail_tags: bool,
    fail_approve: bool,
    fail_decline: bool,
    approve_calls: Vec<(String, Vec<String>)>,
    decline_calls: Vec<String>,
    tags_fetches: u64,
}

impl MockControllerApi {
    pub fn with_pending(self, pending: Vec<PendingDevice>) -> Self {
        self.state.lock().unwrap().pending = pending;
        self
    }

    pub fn with_tags(self, tags: Vec<String>) -> Self {
        self.state.lock().unwrap().tags = tags;
        self
    }

    pub fn fail_pending(&self) {
        self.state.lock().unwrap().fail_pending = true;
    }

    pub fn fail_tags(&self) {
        self.state.lock().unwrap().fail_tags = true;
    }

    pub fn fail_approve(&self) {
        self.state.lock().unwrap().fail_approve = true;
    }

    pub fn fail_decline(&self) {
        self.state.lock().unwrap().fail_decline = true;
    }

    pub fn approve_calls(&self) -> Vec<(String, Vec<String>)> {
        self.state.lock().unwrap().approve_calls.clone()
    }

    pub fn decline_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().decline_calls.clone()
    }

    pub fn tags_fetches(&self) -> u64 {
        self.state.lock().unwrap().tags_fetches
    }
}

#[async_trait]
impl ControllerApi for MockControllerApi {
    async fn pending_devices(&self) -> Result<Vec<PendingDevice>, ControllerError> {
        let state = self.state.lock().unwrap();
        if state.fail_pending {
            return Err(ControllerError::Status(502));
        }
        Ok(state.pending.clone())
    }

    async fn available_tags(&self) -> Result<Vec<String>, ControllerError> {
        let mut state = self.state.lock().unwrap();
        state.tags_fetches += 1;
        if state.fail_tags {
            return Err(ControllerError::Status(502));
        }
        Ok(state.tags.clone())
    }

    async fn approve(&self, device_id: &str, tags: &[String]) -> Result<(), ControllerError> {
        let mut state = self.state.lock().unwrap();
        state
            .approve_calls
            .push((device_id.to_string(), tags.to_vec()));
        if state.fail_approve {
            return Err(ControllerError::Status(502));
        }
        Ok(())
    }

    async fn decline(&self, device_id: &str) -> Result<(), ControllerError> {
        let mut state = self.state.lock().unwrap();
        state.decline_calls.push(device_id.to_string());
        if state.fail_decline {
            return Err(ControllerError::Status(502));
        }
        Ok(())
    }
}
