//! Framework: the validated plugin execution plan.
//!
//! `Framework::new` resolves every enabled plugin against the registry,
//! checks its capabilities and the cross-phase rules, and freezes the
//! result. Scheduling cycles then only walk the prepared plans:
//!
//! - `run_score_plugins` builds a score matrix for a set of nodes
//! - `run_normalize_score_plugins` rewrites entries in place
//! - `apply_score_weights` multiplies every entry by its plugin weight
//!
//! All three fail fast. In-place changes made before a failure are kept;
//! the matrix is not restored to its input state.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::{PluginConfig, PluginEntry, Plugins, empty_args};
use crate::context::PluginContext;
use crate::error::{FrameworkError, FrameworkResult};
use crate::plugin::{NormalizeScorePlugin, Plugin, PluginToNodeScoreMap, Pod, ScorePlugin};
use crate::recorder::{NoopRecorder, Recorder};
use crate::registry::{FrameworkHandle, Registry};
use crate::status::{Status, StatusResult};

/// Extension point names, used in errors and metric labels.
pub const SCORE: &str = "Score";
pub const NORMALIZE_SCORE: &str = "NormalizeScore";
pub const SCORE_WEIGHTS: &str = "ScoreWeights";

/// Message prefix of the `Code::Error` status returned when the score map
/// lacks an entry for a configured plugin. Plugin failures that also use
/// `Code::Error` are told apart by this prefix.
pub const MISSING_SCORE_ENTRY: &str = "missing score entry";

/// A score plugin and its weight, in configured order.
struct ScoreEntry {
    name: String,
    plugin: Arc<dyn ScorePlugin>,
    weight: i64,
}

/// A normalize score plugin, in configured order.
struct NormalizeScoreEntry {
    name: String,
    plugin: Arc<dyn NormalizeScorePlugin>,
}

/// The validated, immutable execution plan for every scheduling cycle.
pub struct Framework {
    score_plugins: Vec<ScoreEntry>,
    normalize_score_plugins: Vec<NormalizeScoreEntry>,
    handle: FrameworkHandle,
}

/// Instantiates each configured plugin at most once.
struct PluginInstances<'a> {
    registry: &'a Registry,
    args: &'a [PluginConfig],
    handle: &'a FrameworkHandle,
    built: HashMap<String, Arc<dyn Plugin>>,
}

impl PluginInstances<'_> {
    fn get_or_build(&mut self, name: &str) -> FrameworkResult<Arc<dyn Plugin>> {
        if let Some(plugin) = self.built.get(name) {
            return Ok(plugin.clone());
        }

        let factory = self
            .registry
            .get(name)
            .ok_or_else(|| FrameworkError::PluginNotFound(name.to_string()))?;

        let empty = empty_args();
        let args = self
            .args
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.args)
            .unwrap_or(&empty);

        let plugin = factory(args, self.handle).map_err(|source| {
            FrameworkError::PluginInstantiation {
                plugin: name.to_string(),
                source,
            }
        })?;

        debug!(plugin = %name, "plugin instantiated");
        self.built.insert(name.to_string(), plugin.clone());
        Ok(plugin)
    }
}

impl Framework {
    /// Build a framework that discards metrics.
    pub fn new(registry: &Registry, plugins: &Plugins, args: &[PluginConfig]) -> FrameworkResult<Self> {
        Self::with_recorder(registry, plugins, args, Arc::new(NoopRecorder))
    }

    /// Build a framework that reports durations to `recorder`.
    ///
    /// Construction is all-or-nothing: the first invalid entry aborts it.
    pub fn with_recorder(
        registry: &Registry,
        plugins: &Plugins,
        args: &[PluginConfig],
        recorder: Arc<dyn Recorder>,
    ) -> FrameworkResult<Self> {
        let handle = FrameworkHandle::new(recorder);
        let mut instances = PluginInstances {
            registry,
            args,
            handle: &handle,
            built: HashMap::new(),
        };

        let score_set = enabled(plugins.score.as_ref().map(|s| s.enabled.as_slice()));
        check_unique(score_set, SCORE)?;

        let mut score_plugins = Vec::with_capacity(score_set.len());
        for entry in score_set {
            let plugin = instances
                .get_or_build(&entry.name)?
                .as_score()
                .ok_or_else(|| FrameworkError::CapabilityNotImplemented {
                    plugin: entry.name.clone(),
                    extension_point: SCORE,
                })?;
            score_plugins.push(ScoreEntry {
                name: entry.name.clone(),
                plugin,
                weight: entry.effective_weight(),
            });
        }

        let normalize_set = enabled(
            plugins
                .normalize_score
                .as_ref()
                .map(|s| s.enabled.as_slice()),
        );
        check_unique(normalize_set, NORMALIZE_SCORE)?;

        let score_names: HashSet<&str> = score_set.iter().map(|e| e.name.as_str()).collect();
        let mut normalize_score_plugins = Vec::with_capacity(normalize_set.len());
        for entry in normalize_set {
            let plugin = instances
                .get_or_build(&entry.name)?
                .as_normalize_score()
                .ok_or_else(|| FrameworkError::CapabilityNotImplemented {
                    plugin: entry.name.clone(),
                    extension_point: NORMALIZE_SCORE,
                })?;
            if !score_names.contains(entry.name.as_str()) {
                return Err(FrameworkError::InconsistentPluginConfiguration(
                    entry.name.clone(),
                ));
            }
            normalize_score_plugins.push(NormalizeScoreEntry {
                name: entry.name.clone(),
                plugin,
            });
        }

        info!(
            score = score_plugins.len(),
            normalize_score = normalize_score_plugins.len(),
            instances = instances.built.len(),
            "scheduler framework initialized"
        );

        Ok(Self {
            score_plugins,
            normalize_score_plugins,
            handle,
        })
    }

    /// Services shared with plugins.
    pub fn handle(&self) -> &FrameworkHandle {
        &self.handle
    }

    /// Score plugin names, in execution order.
    pub fn score_plugin_names(&self) -> Vec<&str> {
        self.score_plugins.iter().map(|e| e.name.as_str()).collect()
    }

    /// NormalizeScore plugin names, in execution order.
    pub fn normalize_score_plugin_names(&self) -> Vec<&str> {
        self.normalize_score_plugins
            .iter()
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Effective weight of a score plugin.
    pub fn score_weight(&self, name: &str) -> Option<i64> {
        self.score_plugins
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.weight)
    }

    /// Run every score plugin against every node, in order.
    ///
    /// Returns one `NodeScoreList` per score plugin, aligned with `nodes`.
    /// The first failing plugin aborts the run and its status is returned.
    pub fn run_score_plugins(
        &self,
        ctx: &PluginContext,
        pod: &Pod,
        nodes: &[String],
    ) -> StatusResult<PluginToNodeScoreMap> {
        let start = Instant::now();
        let result = self.score(ctx, pod, nodes);
        self.record_extension_point(SCORE, &result, start);
        result
    }

    fn score(&self, ctx: &PluginContext, pod: &Pod, nodes: &[String]) -> StatusResult<PluginToNodeScoreMap> {
        let mut scores = PluginToNodeScoreMap::with_capacity(self.score_plugins.len());
        for entry in &self.score_plugins {
            let mut list = Vec::with_capacity(nodes.len());
            for node in nodes {
                let start = Instant::now();
                let result = entry.plugin.score(ctx, pod, node);
                self.record_plugin(&entry.name, SCORE, &result, start);
                match result {
                    Ok(score) => list.push(score),
                    Err(status) => {
                        warn!(
                            plugin = %entry.name,
                            %pod,
                            %node,
                            error = %status,
                            "score plugin failed"
                        );
                        return Err(status);
                    }
                }
            }
            scores.insert(entry.name.clone(), list);
        }
        Ok(scores)
    }

    /// Run the normalize score plugins over `scores`, in order.
    ///
    /// Each plugin rewrites the entry stored under its own name. Entries of
    /// plugins without normalization are left alone. A missing entry or a
    /// failing plugin aborts the run; entries already normalized stay
    /// normalized. A missing entry is reported as `Code::Error` with a
    /// message starting with [`MISSING_SCORE_ENTRY`].
    pub fn run_normalize_score_plugins(
        &self,
        ctx: &PluginContext,
        pod: &Pod,
        scores: &mut PluginToNodeScoreMap,
    ) -> StatusResult {
        // An empty plan touches nothing but still reports the phase.
        let start = Instant::now();
        let result = self.normalize_scores(ctx, pod, scores);
        self.record_extension_point(NORMALIZE_SCORE, &result, start);
        result
    }

    fn normalize_scores(
        &self,
        ctx: &PluginContext,
        pod: &Pod,
        scores: &mut PluginToNodeScoreMap,
    ) -> StatusResult {
        for entry in &self.normalize_score_plugins {
            let list = scores
                .get_mut(&entry.name)
                .ok_or_else(|| missing_score_entry(&entry.name, NORMALIZE_SCORE, pod))?;

            let start = Instant::now();
            let result = entry.plugin.normalize_score(ctx, list);
            self.record_plugin(&entry.name, NORMALIZE_SCORE, &result, start);

            if let Err(status) = result {
                warn!(
                    plugin = %entry.name,
                    %pod,
                    error = %status,
                    "normalize score plugin failed"
                );
                return Err(status);
            }
        }
        Ok(())
    }

    /// Multiply each score plugin's entry by its weight, in place.
    ///
    /// Arithmetic wraps on `i64` overflow; keep scores and weights small
    /// enough for that not to matter. A missing entry aborts the run after
    /// the preceding entries have been weighted; its status message starts
    /// with [`MISSING_SCORE_ENTRY`].
    pub fn apply_score_weights(
        &self,
        _ctx: &PluginContext,
        pod: &Pod,
        scores: &mut PluginToNodeScoreMap,
    ) -> StatusResult {
        let start = Instant::now();
        let result = self.weigh_scores(pod, scores);
        self.record_extension_point(SCORE_WEIGHTS, &result, start);
        result
    }

    fn weigh_scores(&self, pod: &Pod, scores: &mut PluginToNodeScoreMap) -> StatusResult {
        for entry in &self.score_plugins {
            let list = scores
                .get_mut(&entry.name)
                .ok_or_else(|| missing_score_entry(&entry.name, SCORE_WEIGHTS, pod))?;
            for score in list.iter_mut() {
                *score = score.wrapping_mul(entry.weight);
            }
        }
        Ok(())
    }

    fn record_extension_point<T>(&self, extension_point: &str, result: &StatusResult<T>, start: Instant) {
        self.handle.recorder().observe_extension_point_duration_async(
            extension_point,
            Status::code_of(result),
            start.elapsed().as_secs_f64(),
        );
    }

    fn record_plugin<T>(&self, plugin: &str, extension_point: &str, result: &StatusResult<T>, start: Instant) {
        self.handle.recorder().observe_plugin_duration_async(
            plugin,
            extension_point,
            Status::code_of(result),
            start.elapsed().as_secs_f64(),
        );
    }
}

impl fmt::Debug for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let score: Vec<(&str, i64)> = self
            .score_plugins
            .iter()
            .map(|e| (e.name.as_str(), e.weight))
            .collect();
        f.debug_struct("Framework")
            .field("score", &score)
            .field("normalize_score", &self.normalize_score_plugin_names())
            .finish()
    }
}

fn enabled(set: Option<&[PluginEntry]>) -> &[PluginEntry] {
    set.unwrap_or(&[])
}

fn check_unique(entries: &[PluginEntry], extension_point: &'static str) -> FrameworkResult<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.name.as_str()) {
            return Err(FrameworkError::DuplicatePlugin {
                plugin: entry.name.clone(),
                extension_point,
            });
        }
    }
    Ok(())
}

fn missing_score_entry(plugin: &str, extension_point: &str, pod: &Pod) -> Status {
    warn!(%plugin, %pod, extension_point, "score map has no entry for plugin");
    Status::error(format!(
        "{MISSING_SCORE_ENTRY}: plugin {plugin} at {extension_point} (pod {pod})"
    ))
}
