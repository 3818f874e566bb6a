//! Pending-device alert dispatch.

use crate::discord::{Component, MessageBody, BUTTON_DANGER, BUTTON_SUCCESS};
use crate::services::controller::PendingDevice;
use crate::services::gateway::{ChatGateway, GatewayError};
use std::sync::Arc;

/// Pending-device count at or above which per-device messages are
/// suppressed in favor of a single warning.
pub const MAX_INDIVIDUAL_ALERTS: usize = 3;

pub struct NotificationDispatcher {
    gateway: Arc<dyn ChatGateway>,
    channel_id: String,
}

impl NotificationDispatcher {
    pub fn new(gateway: Arc<dyn ChatGateway>, channel_id: impl Into<String>) -> Self {
        Self {
            gateway,
            channel_id: channel_id.into(),
        }
    }

    /// Route one notification cycle's pending devices to the channel.
    ///
    /// A failed per-device send is logged and does not stop the remaining
    /// sends.
    pub async fn dispatch(&self, pending: &[PendingDevice]) -> Result<(), GatewayError> {
        if pending.is_empty() {
            tracing::info!("No pending devices found");
            return Ok(());
        }

        if pending.len() >= MAX_INDIVIDUAL_ALERTS {
            tracing::warn!(count = pending.len(), "Unusual number of pending devices");
            return self
                .gateway
                .create_message(
                    &self.channel_id,
                    &MessageBody::text(mass_pending_warning(pending.len())),
                )
                .await;
        }

        for device in pending {
            if let Err(err) = self
                .gateway
                .create_message(&self.channel_id, &approval_message(device))
                .await
            {
                tracing::error!(
                    device = %device.name,
                    error = %err,
                    "Failed to send approval message"
                );
            }
        }
        Ok(())
    }
}

/// Interactive approval prompt for a single device.
pub fn approval_message(device: &PendingDevice) -> MessageBody {
    MessageBody::with_components(
        format!(
            "**New device pending approval**\nName: `{}`\nID: `{}`",
            device.name, device.id
        ),
        vec![Component::action_row(vec![
            Component::button("Approve", BUTTON_SUCCESS, format!("approve:{}", device.id)),
            Component::button("Decline", BUTTON_DANGER, format!("decline:{}", device.id)),
        ])],
    )
}

pub fn mass_pending_warning(count: usize) -> String {
    format!(
        "Warning: {} pending devices found. This is unusual. Please check the Tailscale admin console.",
        count
    )
}
