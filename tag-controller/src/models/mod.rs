//! Domain models for tag-controller.

use serde::{Deserialize, Serialize};

/// A device as reported by the upstream directory.
///
/// `authorized` is owned by the tailnet's admission control; this service
/// only ever writes `tags`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub authorized: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Projection of a device exposed to the notification and approval surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDevice {
    pub id: String,
    pub name: String,
}
