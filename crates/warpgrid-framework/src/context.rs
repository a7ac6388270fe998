//! Per-cycle scratch state shared between plugins.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

type Entry = Arc<dyn Any + Send + Sync>;

/// Key/value store handed to every plugin call of one scheduling cycle.
///
/// A fresh context is created per cycle. It is safe to use from several
/// threads at once.
#[derive(Default)]
pub struct PluginContext {
    storage: RwLock<HashMap<String, Entry>>,
}

impl PluginContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous value under `key`.
    pub fn write<T: Any + Send + Sync>(&self, key: &str, value: T) {
        self.storage
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), Arc::new(value));
    }

    pub fn read(&self, key: &str) -> Option<Entry> {
        self.storage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Read a value and downcast it. `None` if absent or of another type.
    pub fn read_as<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.read(key)?.downcast::<T>().ok()
    }

    /// Remove a value; returns whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        self.storage
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let storage = self.storage.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("PluginContext")
            .field("keys", &storage.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_as() {
        let ctx = PluginContext::new();
        ctx.write("zone", "us-east-1a".to_string());

        let zone = ctx.read_as::<String>("zone").unwrap();
        assert_eq!(zone.as_str(), "us-east-1a");
    }

    #[test]
    fn read_as_wrong_type_is_none() {
        let ctx = PluginContext::new();
        ctx.write("count", 3u32);
        assert!(ctx.read_as::<String>("count").is_none());
        assert!(ctx.read("count").is_some());
    }

    #[test]
    fn delete_reports_presence() {
        let ctx = PluginContext::new();
        ctx.write("k", 1i64);
        assert!(ctx.delete("k"));
        assert!(!ctx.delete("k"));
        assert!(ctx.read("k").is_none());
    }

    #[test]
    fn shared_across_threads() {
        let ctx = Arc::new(PluginContext::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let ctx = ctx.clone();
                std::thread::spawn(move || ctx.write(&format!("k{i}"), i))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for i in 0..4 {
            assert_eq!(*ctx.read_as::<i32>(&format!("k{i}")).unwrap(), i);
        }
    }
}
