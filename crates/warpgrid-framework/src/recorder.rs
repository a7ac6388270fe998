//! Asynchronous framework metrics recording.
//!
//! Scheduling code must never wait on telemetry. Observations are pushed
//! into a single bounded channel with `try_send`; when the channel is full
//! the observation is dropped. One background task drains the channel on a
//! fixed cadence and applies each observation to its histogram.
//!
//! ```text
//! observe_*_async() ──try_send──▶ [bounded buffer] ──tick──▶ drain ≤ buffer_size ──▶ HistogramVec
//! ```
//!
//! There is exactly one channel and exactly one consumer. Producers and the
//! drain task always agree on which buffer they are using.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use warpgrid_metrics::{HistogramVec, SchedulerMetrics};

use crate::config::RecorderConfig;
use crate::status::Code;

/// Sink for framework duration observations.
///
/// Both calls must return immediately and never fail.
pub trait Recorder: Send + Sync {
    /// Record how long a whole extension point took.
    fn observe_extension_point_duration_async(&self, extension_point: &str, status: Code, value: f64);

    /// Record how long one plugin took at an extension point.
    fn observe_plugin_duration_async(
        &self,
        plugin_name: &str,
        extension_point: &str,
        status: Code,
        value: f64,
    );
}

/// Recorder that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl Recorder for NoopRecorder {
    fn observe_extension_point_duration_async(&self, _: &str, _: Code, _: f64) {}

    fn observe_plugin_duration_async(&self, _: &str, _: &str, _: Code, _: f64) {}
}

/// One pending observation travelling through the buffer.
#[derive(Debug)]
pub struct FrameworkMetric {
    metric: Arc<HistogramVec>,
    label_values: Vec<String>,
    value: f64,
}

impl FrameworkMetric {
    pub fn new(metric: Arc<HistogramVec>, label_values: Vec<String>, value: f64) -> Self {
        Self {
            metric,
            label_values,
            value,
        }
    }

    fn apply(self) {
        match self.metric.with_label_values(&self.label_values) {
            Ok(histogram) => histogram.observe(self.value),
            Err(e) => warn!(error = %e, "dropping malformed framework metric"),
        }
    }
}

/// Buffered recorder backed by a Tokio task.
pub struct MetricsRecorder {
    buffer_tx: mpsc::Sender<FrameworkMetric>,
    metrics: SchedulerMetrics,
    stop_tx: watch::Sender<bool>,
    stopped_rx: watch::Receiver<bool>,
}

impl MetricsRecorder {
    /// Create the recorder and start its drain task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(metrics: SchedulerMetrics, buffer_size: usize, interval: Duration) -> Self {
        let buffer_size = buffer_size.max(1);
        let interval = interval.max(Duration::from_millis(1));
        let (buffer_tx, buffer_rx) = mpsc::channel(buffer_size);
        let (stop_tx, stop_rx) = watch::channel(false);
        let (stopped_tx, stopped_rx) = watch::channel(false);

        tokio::spawn(run_drain_loop(
            buffer_rx,
            buffer_size,
            interval,
            stop_rx,
            stopped_tx,
        ));

        Self {
            buffer_tx,
            metrics,
            stop_tx,
            stopped_rx,
        }
    }

    pub fn from_config(metrics: SchedulerMetrics, config: &RecorderConfig) -> Self {
        Self::start(metrics, config.buffer_size, config.flush_interval())
    }

    /// The histograms this recorder writes into.
    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    /// Ask the drain task to exit and wait until it has.
    ///
    /// Everything accepted into the buffer before this call is applied.
    /// Calling it again is a no-op.
    pub async fn stop(&self) {
        self.stop_tx.send_replace(true);
        self.wait_stopped().await;
    }

    /// Wait for the drain task to exit.
    pub async fn wait_stopped(&self) {
        let mut stopped = self.stopped_rx.clone();
        // An error means the task is gone without signalling, which is as
        // stopped as it gets.
        let _ = stopped.wait_for(|s| *s).await;
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped_rx.borrow()
    }

    fn enqueue(&self, metric: FrameworkMetric) {
        // Full or closed: telemetry is best-effort, drop it.
        let _ = self.buffer_tx.try_send(metric);
    }
}

impl Recorder for MetricsRecorder {
    fn observe_extension_point_duration_async(&self, extension_point: &str, status: Code, value: f64) {
        self.enqueue(FrameworkMetric::new(
            self.metrics.framework_extension_point_duration.clone(),
            vec![extension_point.to_string(), status.to_string()],
            value,
        ));
    }

    fn observe_plugin_duration_async(
        &self,
        plugin_name: &str,
        extension_point: &str,
        status: Code,
        value: f64,
    ) {
        self.enqueue(FrameworkMetric::new(
            self.metrics.plugin_execution_duration.clone(),
            vec![
                plugin_name.to_string(),
                extension_point.to_string(),
                status.to_string(),
            ],
            value,
        ));
    }
}

/// The drain loop: flush up to `drain_limit` observations per tick until
/// stopped, then flush whatever was accepted and signal `stopped_tx`.
async fn run_drain_loop(
    mut buffer_rx: mpsc::Receiver<FrameworkMetric>,
    drain_limit: usize,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
    stopped_tx: watch::Sender<bool>,
) {
    info!(
        buffer_size = drain_limit,
        interval_ms = interval.as_millis() as u64,
        "metrics recorder started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let applied = flush_buffer(&mut buffer_rx, drain_limit);
                if applied > 0 {
                    debug!(applied, "framework metrics flushed");
                }
            }
            // Fires on stop, and on recorder drop (sender gone).
            _ = stop_rx.changed() => break,
        }
    }

    // No new observations past this point; drain what was accepted.
    buffer_rx.close();
    let applied = flush_buffer(&mut buffer_rx, usize::MAX);
    stopped_tx.send_replace(true);
    info!(applied, "metrics recorder stopped");
}

/// Apply at most `limit` pending observations without waiting.
fn flush_buffer(buffer_rx: &mut mpsc::Receiver<FrameworkMetric>, limit: usize) -> usize {
    let mut applied = 0;
    while applied < limit {
        match buffer_rx.try_recv() {
            Ok(metric) => {
                metric.apply();
                applied += 1;
            }
            Err(_) => break,
        }
    }
    applied
}
