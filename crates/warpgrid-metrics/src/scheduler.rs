//! Histograms reported by the scheduler plugin framework.

use std::sync::Arc;

use crate::histogram::{HistogramOpts, HistogramVec, exponential_buckets};
use crate::prometheus::render_prometheus;

pub const EXTENSION_POINT_DURATION_NAME: &str =
    "scheduler_framework_extension_point_duration_seconds";
pub const PLUGIN_EXECUTION_DURATION_NAME: &str = "scheduler_plugin_execution_duration_seconds";

/// The framework's duration histograms.
///
/// Cloning is cheap; clones share the underlying series.
#[derive(Debug, Clone)]
pub struct SchedulerMetrics {
    /// Latency of a whole extension point, by `{extension_point, status}`.
    pub framework_extension_point_duration: Arc<HistogramVec>,
    /// Latency of a single plugin call, by `{plugin, extension_point, status}`.
    pub plugin_execution_duration: Arc<HistogramVec>,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self {
            framework_extension_point_duration: Arc::new(HistogramVec::new(HistogramOpts::new(
                EXTENSION_POINT_DURATION_NAME,
                "Latency for running all plugins of a specific extension point.",
                &["extension_point", "status"],
                exponential_buckets(0.0001, 2.0, 12),
            ))),
            plugin_execution_duration: Arc::new(HistogramVec::new(HistogramOpts::new(
                PLUGIN_EXECUTION_DURATION_NAME,
                "Duration for running a plugin at a specific extension point.",
                &["plugin", "extension_point", "status"],
                exponential_buckets(0.00001, 1.5, 20),
            ))),
        }
    }

    /// Render both histograms in Prometheus text format.
    pub fn render(&self) -> String {
        render_prometheus(&[
            self.framework_extension_point_duration.as_ref(),
            self.plugin_execution_duration.as_ref(),
        ])
    }
}

impl Default for SchedulerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
