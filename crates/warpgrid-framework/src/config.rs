//! Framework configuration: plugin enablement, plugin args, recorder tuning.
//!
//! ```toml
//! [plugins.score]
//! enabled = [{ name = "node-affinity", weight = 2 }, { name = "spread" }]
//!
//! [plugins.normalize_score]
//! enabled = [{ name = "node-affinity" }]
//!
//! [[plugin_config]]
//! name = "node-affinity"
//! args = { preferred_zone = "us-east-1a" }
//!
//! [metrics]
//! buffer_size = 1000
//! flush_interval = "1s"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_BUFFER_SIZE: usize = 1000;
const DEFAULT_FLUSH_INTERVAL: &str = "1s";

/// Top-level framework configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameworkConfig {
    #[serde(default)]
    pub plugins: Plugins,
    #[serde(default)]
    pub plugin_config: Vec<PluginConfig>,
    #[serde(default)]
    pub metrics: RecorderConfig,
}

/// Enabled plugins per extension point. `None` and an empty set are
/// equivalent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plugins {
    pub score: Option<PluginSet>,
    pub normalize_score: Option<PluginSet>,
}

/// Ordered plugin enablement for one extension point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginSet {
    #[serde(default)]
    pub enabled: Vec<PluginEntry>,
}

/// One enabled plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEntry {
    pub name: String,
    /// Score multiplier. Only meaningful for the score extension point;
    /// 0 means "unset" and is treated as 1.
    #[serde(default)]
    pub weight: i64,
}

/// Raw arguments for a single plugin, handed to its factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    pub name: String,
    #[serde(default = "empty_args")]
    pub args: toml::Value,
}

/// Tuning for the asynchronous metrics recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Capacity of the observation buffer; excess observations are dropped.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// How often the buffer is drained, e.g. "500ms", "1s", "1m".
    #[serde(default = "default_flush_interval")]
    pub flush_interval: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL.to_string(),
        }
    }
}

impl RecorderConfig {
    /// The drain interval, falling back to 1s if unparseable.
    pub fn flush_interval(&self) -> Duration {
        parse_duration(&self.flush_interval).unwrap_or(Duration::from_secs(1))
    }
}

impl FrameworkConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: FrameworkConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl PluginSet {
    pub fn new(enabled: Vec<PluginEntry>) -> Self {
        Self { enabled }
    }
}

impl PluginEntry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            weight: 0,
        }
    }

    pub fn weighted(name: &str, weight: i64) -> Self {
        Self {
            name: name.to_string(),
            weight,
        }
    }

    pub fn effective_weight(&self) -> i64 {
        if self.weight == 0 { 1 } else { self.weight }
    }
}

impl PluginConfig {
    pub fn new(name: &str, args: toml::Value) -> Self {
        Self {
            name: name.to_string(),
            args,
        }
    }
}

pub(crate) fn empty_args() -> toml::Value {
    toml::Value::Table(toml::map::Map::new())
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_flush_interval() -> String {
    DEFAULT_FLUSH_INTERVAL.to_string()
}

/// Parse a duration string like "5s", "500ms", "1m".
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
[plugins.score]
enabled = [{ name = "a", weight = 2 }, { name = "b" }]

[plugins.normalize_score]
enabled = [{ name = "a" }]

[[plugin_config]]
name = "a"
args = { offset = 3 }

[metrics]
buffer_size = 64
flush_interval = "250ms"
"#;
        let config = FrameworkConfig::from_toml_str(toml_str).unwrap();

        let score = config.plugins.score.as_ref().unwrap();
        assert_eq!(score.enabled.len(), 2);
        assert_eq!(score.enabled[0], PluginEntry::weighted("a", 2));
        assert_eq!(score.enabled[1].effective_weight(), 1);

        let normalize = config.plugins.normalize_score.as_ref().unwrap();
        assert_eq!(normalize.enabled, vec![PluginEntry::new("a")]);

        assert_eq!(config.plugin_config[0].name, "a");
        assert_eq!(config.plugin_config[0].args.get("offset").and_then(|v| v.as_integer()), Some(3));

        assert_eq!(config.metrics.buffer_size, 64);
        assert_eq!(config.metrics.flush_interval(), Duration::from_millis(250));
    }

    #[test]
    fn parse_minimal() {
        let config = FrameworkConfig::from_toml_str("").unwrap();
        assert!(config.plugins.score.is_none());
        assert!(config.plugins.normalize_score.is_none());
        assert!(config.plugin_config.is_empty());
        assert_eq!(config.metrics, RecorderConfig::default());
    }

    #[test]
    fn plugin_config_args_default_to_empty_table() {
        let toml_str = r#"
[[plugin_config]]
name = "a"
"#;
        let config = FrameworkConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.plugin_config[0].args, empty_args());
    }

    #[test]
    fn round_trips_through_toml() {
        let config = FrameworkConfig {
            plugins: Plugins {
                score: Some(PluginSet::new(vec![PluginEntry::weighted("a", 3)])),
                normalize_score: None,
            },
            plugin_config: vec![],
            metrics: RecorderConfig::default(),
        };
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("weight = 3"));
        assert_eq!(FrameworkConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn negative_weight_is_kept() {
        assert_eq!(PluginEntry::weighted("a", -2).effective_weight(), -2);
    }

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_duration("soon"), None);
    }

    #[test]
    fn overflowing_minutes_do_not_parse() {
        assert_eq!(parse_duration("999999999999999999m"), None);

        let config = RecorderConfig {
            buffer_size: 10,
            flush_interval: "999999999999999999m".to_string(),
        };
        assert_eq!(config.flush_interval(), Duration::from_secs(1));
    }

    #[test]
    fn bad_interval_falls_back_to_one_second() {
        let config = RecorderConfig {
            buffer_size: 10,
            flush_interval: "whenever".to_string(),
        };
        assert_eq!(config.flush_interval(), Duration::from_secs(1));
    }
}
