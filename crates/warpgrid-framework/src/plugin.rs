//! Plugin capability traits and the score matrix types.
//!
//! A plugin is a named unit of scheduling logic that implements one or more
//! capabilities. Capabilities are exposed through the `as_*` accessors on
//! `Plugin`; the framework queries them once, at construction, and keeps
//! the capability-typed handle in its plan.
//!
//! ```ignore
//! impl Plugin for Spread {
//!     fn name(&self) -> &str { "spread" }
//!     fn as_score(self: Arc<Self>) -> Option<Arc<dyn ScorePlugin>> { Some(self) }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::PluginContext;
use crate::status::StatusResult;

/// Per-node scores produced by one plugin; index = node ordinal.
pub type NodeScoreList = Vec<i64>;

/// Score matrix for one scheduling cycle: plugin name → node scores.
pub type PluginToNodeScoreMap = HashMap<String, NodeScoreList>;

/// The workload being scheduled, as far as the framework needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pod {
    pub namespace: String,
    pub name: String,
}

impl Pod {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for Pod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Base trait for every plugin.
///
/// Instances are shared across concurrent scheduling cycles, so any
/// internal state must tolerate reentrant calls.
pub trait Plugin: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// The Score capability, if implemented.
    fn as_score(self: Arc<Self>) -> Option<Arc<dyn ScorePlugin>> {
        None
    }

    /// The NormalizeScore capability, if implemented.
    fn as_normalize_score(self: Arc<Self>) -> Option<Arc<dyn NormalizeScorePlugin>> {
        None
    }
}

/// Ranks candidate nodes for a pod.
pub trait ScorePlugin: Plugin {
    fn score(&self, ctx: &PluginContext, pod: &Pod, node_name: &str) -> StatusResult<i64>;
}

/// Rewrites a score plugin's output in place, e.g. to rescale it into a
/// common range. Only element values may change, never the length.
pub trait NormalizeScorePlugin: Plugin {
    fn normalize_score(&self, ctx: &PluginContext, scores: &mut [i64]) -> StatusResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScoreOnly;

    impl Plugin for ScoreOnly {
        fn name(&self) -> &str {
            "score-only"
        }

        fn as_score(self: Arc<Self>) -> Option<Arc<dyn ScorePlugin>> {
            Some(self)
        }
    }

    impl ScorePlugin for ScoreOnly {
        fn score(&self, _: &PluginContext, _: &Pod, node_name: &str) -> StatusResult<i64> {
            Ok(node_name.len() as i64)
        }
    }

    #[test]
    fn capabilities_default_to_none() {
        let plugin: Arc<dyn Plugin> = Arc::new(ScoreOnly);
        assert!(plugin.clone().as_normalize_score().is_none());

        let score = plugin.as_score().unwrap();
        assert_eq!(score.name(), "score-only");
        let ctx = PluginContext::new();
        assert_eq!(score.score(&ctx, &Pod::default(), "node-1"), Ok(6));
    }

    #[test]
    fn pod_display() {
        assert_eq!(Pod::new("default", "web-0").to_string(), "default/web-0");
    }
}
