pub mod directory;
pub mod metrics;

pub use directory::{DirectoryClient, DirectoryError, MockDirectory, TailscaleDirectory};
pub use metrics::{get_metrics, init_metrics, CountingSink, MetricsSink, PrometheusSink};
