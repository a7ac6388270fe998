//! Plugin registry: plugin name → factory.
//!
//! The registry is built once at process start and only read afterwards.
//! Factories receive the plugin's raw TOML args and a `FrameworkHandle`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{FrameworkError, FrameworkResult};
use crate::plugin::Plugin;
use crate::recorder::Recorder;

/// Builds a plugin instance from its raw args.
pub type PluginFactory =
    Box<dyn Fn(&toml::Value, &FrameworkHandle) -> anyhow::Result<Arc<dyn Plugin>> + Send + Sync>;

/// Framework services available to plugins.
#[derive(Clone)]
pub struct FrameworkHandle {
    recorder: Arc<dyn Recorder>,
}

impl FrameworkHandle {
    pub fn new(recorder: Arc<dyn Recorder>) -> Self {
        Self { recorder }
    }

    /// Recorder for plugins that want to report their own durations.
    pub fn recorder(&self) -> &Arc<dyn Recorder> {
        &self.recorder
    }
}

impl fmt::Debug for FrameworkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameworkHandle").finish_non_exhaustive()
    }
}

/// Available plugin kinds.
#[derive(Default)]
pub struct Registry {
    factories: HashMap<String, PluginFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory. Names must be unique.
    pub fn register<F>(&mut self, name: &str, factory: F) -> FrameworkResult<()>
    where
        F: Fn(&toml::Value, &FrameworkHandle) -> anyhow::Result<Arc<dyn Plugin>>
            + Send
            + Sync
            + 'static,
    {
        if self.factories.contains_key(name) {
            return Err(FrameworkError::AlreadyRegistered(name.to_string()));
        }
        self.factories.insert(name.to_string(), Box::new(factory));
        Ok(())
    }

    /// Remove a factory.
    pub fn unregister(&mut self, name: &str) -> FrameworkResult<()> {
        self.factories
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| FrameworkError::PluginNotFound(name.to_string()))
    }

    /// Move every factory of `other` into this registry.
    ///
    /// Fails without modifying `self` if any name is already registered.
    pub fn merge(&mut self, other: Registry) -> FrameworkResult<()> {
        if let Some(name) = other.factories.keys().find(|n| self.factories.contains_key(*n)) {
            return Err(FrameworkError::AlreadyRegistered(name.clone()));
        }
        self.factories.extend(other.factories);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PluginFactory> {
        self.factories.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("plugins", &self.names())
            .finish()
    }
}

/// Decode a plugin's raw args into its typed configuration.
pub fn decode_args<T: DeserializeOwned>(args: &toml::Value) -> anyhow::Result<T> {
    Ok(args.clone().try_into()?)
}
