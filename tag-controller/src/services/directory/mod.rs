//! The upstream device directory boundary.
//!
//! The directory is the sole writer of the `authorized` flag; this service
//! is the sole writer of `tags` for the devices it approves.

pub mod mock;
pub mod tailscale;

use crate::models::Device;
use async_trait::async_trait;
use thiserror::Error;

pub use mock::MockDirectory;
pub use tailscale::TailscaleDirectory;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Directory returned status {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// List every device known to the directory, authorized or not.
    async fn list(&self) -> Result<Vec<Device>, DirectoryError>;

    /// Replace the device's tag set.
    async fn set_tags(&self, device_id: &str, tags: &[String]) -> Result<(), DirectoryError>;

    /// Tags offered by the network policy, deduplicated and sorted. Never
    /// cached: the catalog can change between render and apply.
    async fn available_tags(&self) -> Result<Vec<String>, DirectoryError>;
}
