//! HTTP handlers for tag-controller.

pub mod devices;
pub mod health;

pub use devices::{approve_device, available_tags, decline_device, pending_devices};
pub use health::{health_check, metrics_endpoint};
