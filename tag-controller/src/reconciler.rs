//! Device tag reconciliation.
//!
//! One pass lists every device from the directory, filters to the pending
//! subset (authorized, untagged) and applies the configured tags to each.
//! Per-device failures do not stop the pass; a listing failure aborts it
//! before any mutation.

use crate::models::{Device, PendingDevice};
use crate::services::directory::DirectoryClient;
use crate::services::metrics::MetricsSink;
use service_core::retry::{retry_call, RetryPolicy};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Filter a device listing down to devices awaiting tag approval.
///
/// A device is pending iff it is authorized and carries no tags. Input
/// order is preserved.
pub fn compute_pending(devices: &[Device]) -> Vec<PendingDevice> {
    devices
        .iter()
        .filter(|d| d.authorized && d.tags.is_empty())
        .map(|d| PendingDevice {
            id: d.id.clone(),
            name: d.name.clone(),
        })
        .collect()
}

pub struct Reconciler {
    directory: Arc<dyn DirectoryClient>,
    metrics: Arc<dyn MetricsSink>,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl Reconciler {
    pub fn new(
        directory: Arc<dyn DirectoryClient>,
        metrics: Arc<dyn MetricsSink>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            directory,
            metrics,
            retry: RetryPolicy::default(),
            cancel,
        }
    }

    /// Run one reconciliation pass, applying `tags_to_apply` to every
    /// pending device.
    ///
    /// A device that became tagged between listing and apply still receives
    /// a redundant `set_tags` call; the directory's idempotent semantics
    /// absorb it.
    pub async fn reconcile(&self, tags_to_apply: &[String]) {
        let start = Instant::now();

        let devices = match retry_call(&self.retry, &self.cancel, "list_devices", || {
            self.directory.list()
        })
        .await
        {
            Ok(devices) => devices,
            Err(err) => {
                tracing::error!(error = %err, "Failed to list devices");
                self.metrics.reconcile_error();
                self.metrics.reconcile_duration(start.elapsed());
                return;
            }
        };

        for device in &devices {
            self.metrics.device_processed();

            if !device.authorized {
                continue;
            }

            if !device.tags.is_empty() {
                continue;
            }

            let applied = retry_call(&self.retry, &self.cancel, "set_tags", || {
                self.directory.set_tags(&device.id, tags_to_apply)
            })
            .await;

            match applied {
                Ok(()) => {
                    self.metrics.tags_applied();
                    tracing::info!(
                        device = %device.name,
                        device_id = %device.id,
                        tags = ?tags_to_apply,
                        "Applied tags to device"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        device = %device.name,
                        device_id = %device.id,
                        error = %err,
                        "Failed to set tags"
                    );
                    self.metrics.reconcile_error();
                }
            }
        }

        self.metrics.reconcile_duration(start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, authorized: bool, tags: &[&str]) -> Device {
        Device {
            id: id.to_string(),
            name: format!("device-{}", id),
            authorized,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_compute_pending_filters_and_preserves_order() {
        let devices = vec![
            device("1", true, &[]),
            device("2", false, &[]),
            device("3", true, &["tag:x"]),
            device("4", true, &[]),
        ];

        let pending = compute_pending(&devices);

        assert_eq!(
            pending.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            vec!["1", "4"]
        );
    }

    #[test]
    fn test_compute_pending_empty_input() {
        assert!(compute_pending(&[]).is_empty());
    }

    #[test]
    fn test_compute_pending_none_pending() {
        let devices = vec![device("1", false, &[]), device("2", true, &["tag:x"])];
        assert!(compute_pending(&devices).is_empty());
    }
}
