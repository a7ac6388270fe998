//! warpgrid-metrics: histogram sink for the scheduler framework.
//!
//! Holds labelled histogram vectors with `with_label_values(..).observe(v)`
//! semantics, the two histograms the plugin framework reports into, and
//! Prometheus-compatible text exposition.
//!
//! # Architecture
//!
//! ```text
//! SchedulerMetrics
//!   ├── framework_extension_point_duration  {extension_point, status}
//!   └── plugin_execution_duration           {plugin, extension_point, status}
//!
//! HistogramVec
//!   ├── with_label_values() → Histogram (one series)
//!   └── snapshot() → Vec<SeriesSnapshot>
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for a /metrics endpoint
//! ```

pub mod error;
pub mod histogram;
pub mod prometheus;
pub mod scheduler;

pub use error::{MetricsError, MetricsResult};
pub use histogram::{Histogram, HistogramOpts, HistogramVec, SeriesSnapshot, exponential_buckets};
pub use prometheus::render_prometheus;
pub use scheduler::SchedulerMetrics;
