use super::{DirectoryClient, DirectoryError};
use crate::models::Device;
use async_trait::async_trait;
use std::sync::Mutex;

/// Scripted in-memory directory for tests.
///
/// `set_tags` mutates the scripted device state, so a second reconciliation
/// pass over the same mock sees the first pass's tags.
#[derive(Default)]
pub struct MockDirectory {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    devices: Vec<Device>,
    available_tags: Vec<String>,
    fail_list: bool,
    fail_set_tags_for: Option<String>,
    fail_all_set_tags: bool,
    set_tags_calls: Vec<(String, Vec<String>)>,
    available_tags_calls: u64,
}

impl MockDirectory {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            state: Mutex::new(MockState {
                devices,
                ..Default::default()
            }),
        }
    }

    pub fn with_available_tags(self, tags: Vec<String>) -> Self {
        self.state.lock().unwrap().available_tags = tags;
        self
    }

    /// Make every `list` call fail.
    pub fn fail_list(&self) {
        self.state.lock().unwrap().fail_list = true;
    }

    /// Make every `set_tags` call fail.
    pub fn fail_all_set_tags(&self) {
        self.state.lock().unwrap().fail_all_set_tags = true;
    }

    /// Make `set_tags` fail for one specific device.
    pub fn fail_set_tags_for(&self, device_id: &str) {
        self.state.lock().unwrap().fail_set_tags_for = Some(device_id.to_string());
    }

    /// Every `set_tags` call issued so far, including failed ones.
    pub fn set_tags_calls(&self) -> Vec<(String, Vec<String>)> {
        self.state.lock().unwrap().set_tags_calls.clone()
    }

    pub fn available_tags_calls(&self) -> u64 {
        self.state.lock().unwrap().available_tags_calls
    }

    pub fn devices(&self) -> Vec<Device> {
        self.state.lock().unwrap().devices.clone()
    }

    fn api_error() -> DirectoryError {
        DirectoryError::Status {
            status: 500,
            body: "api error".to_string(),
        }
    }
}

#[async_trait]
impl DirectoryClient for MockDirectory {
    async fn list(&self) -> Result<Vec<Device>, DirectoryError> {
        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(Self::api_error());
        }
        Ok(state.devices.clone())
    }

    async fn set_tags(&self, device_id: &str, tags: &[String]) -> Result<(), DirectoryError> {
        let mut state = self.state.lock().unwrap();
        state
            .set_tags_calls
            .push((device_id.to_string(), tags.to_vec()));

        if state.fail_all_set_tags {
            return Err(Self::api_error());
        }
        if state.fail_set_tags_for.as_deref() == Some(device_id) {
            return Err(Self::api_error());
        }

        if let Some(device) = state.devices.iter_mut().find(|d| d.id == device_id) {
            device.tags = tags.to_vec();
        }
        Ok(())
    }

    async fn available_tags(&self) -> Result<Vec<String>, DirectoryError> {
        let mut state = self.state.lock().unwrap();
        state.available_tags_calls += 1;
        Ok(state.available_tags.clone())
    }
}
