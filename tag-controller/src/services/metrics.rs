//! Prometheus metrics for tag-controller.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, Encoder, Histogram, IntCounter, TextEncoder,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub static DEVICES_PROCESSED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "tag_controller_devices_processed_total",
        "Total number of devices processed"
    )
    .expect("Failed to register DEVICES_PROCESSED")
});

pub static TAGS_APPLIED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "tag_controller_tags_applied_total",
        "Total number of devices that had tags applied"
    )
    .expect("Failed to register TAGS_APPLIED")
});

pub static RECONCILE_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "tag_controller_reconcile_errors_total",
        "Total number of reconciliation errors"
    )
    .expect("Failed to register RECONCILE_ERRORS")
});

pub static RECONCILE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "tag_controller_reconcile_duration_seconds",
        "Duration of reconciliation passes"
    )
    .expect("Failed to register RECONCILE_DURATION")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&DEVICES_PROCESSED);
    Lazy::force(&TAGS_APPLIED);
    Lazy::force(&RECONCILE_ERRORS);
    Lazy::force(&RECONCILE_DURATION);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Sink for reconciliation outcomes.
///
/// The reconciler reports through this trait so the pass logic stays free
/// of process-global state.
pub trait MetricsSink: Send + Sync {
    fn device_processed(&self);
    fn tags_applied(&self);
    fn reconcile_error(&self);
    fn reconcile_duration(&self, elapsed: Duration);
}

/// Sink backed by the process-wide Prometheus registry.
#[derive(Debug, Clone, Default)]
pub struct PrometheusSink;

impl MetricsSink for PrometheusSink {
    fn device_processed(&self) {
        DEVICES_PROCESSED.inc();
    }

    fn tags_applied(&self) {
        TAGS_APPLIED.inc();
    }

    fn reconcile_error(&self) {
        RECONCILE_ERRORS.inc();
    }

    fn reconcile_duration(&self, elapsed: Duration) {
        RECONCILE_DURATION.observe(elapsed.as_secs_f64());
    }
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct CountingSink {
    pub devices_processed: AtomicU64,
    pub tags_applied: AtomicU64,
    pub reconcile_errors: AtomicU64,
    pub passes_observed: AtomicU64,
}

impl MetricsSink for CountingSink {
    fn device_processed(&self) {
        self.devices_processed.fetch_add(1, Ordering::SeqCst);
    }

    fn tags_applied(&self) {
        self.tags_applied.fetch_add(1, Ordering::SeqCst);
    }

    fn reconcile_error(&self) {
        self.reconcile_errors.fetch_add(1, Ordering::SeqCst);
    }

    fn reconcile_duration(&self, _elapsed: Duration) {
        self.passes_observed.fetch_add(1, Ordering::SeqCst);
    }
}
