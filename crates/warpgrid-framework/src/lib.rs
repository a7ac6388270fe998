//! warpgrid-framework: the plugin execution core of the scheduler.
//!
//! Turns a declarative list of enabled plugins per extension point into a
//! validated, ordered execution plan and runs the score pipeline against a
//! per-cycle score matrix. Every plugin call and extension point reports
//! its duration to a background metrics recorder.
//!
//! - Builds a `Framework` once from a `Registry` and `Plugins` config
//! - Validates plugin capabilities and cross-phase consistency up front
//! - Runs Score → NormalizeScore → weighting, fail-fast, in config order
//! - Records durations through a bounded, non-blocking buffer
//!
//! # Architecture
//!
//! ```text
//! Framework
//!   ├── Registry (name → factory)
//!   ├── Score plan          [(ScorePlugin, weight), ...]
//!   ├── NormalizeScore plan [NormalizeScorePlugin, ...]
//!   └── FrameworkHandle
//!       └── Recorder ──try_send──▶ bounded buffer ──▶ drain task ──▶ SchedulerMetrics
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod framework;
pub mod plugin;
pub mod recorder;
pub mod registry;
pub mod status;

pub use config::{FrameworkConfig, PluginConfig, PluginEntry, PluginSet, Plugins, RecorderConfig};
pub use context::PluginContext;
pub use error::{FrameworkError, FrameworkResult};
pub use framework::{Framework, MISSING_SCORE_ENTRY, NORMALIZE_SCORE, SCORE, SCORE_WEIGHTS};
pub use plugin::{
    NodeScoreList, NormalizeScorePlugin, Plugin, PluginToNodeScoreMap, Pod, ScorePlugin,
};
pub use recorder::{FrameworkMetric, MetricsRecorder, NoopRecorder, Recorder};
pub use registry::{FrameworkHandle, PluginFactory, Registry, decode_args};
pub use status::{Code, Status, StatusResult};
