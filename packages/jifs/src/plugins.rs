//! Plugin descriptors and the registry they live in.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// What JIFS shows about one plugin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub active: bool,
}

impl PluginDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            provider: String::new(),
            active: true,
        }
    }
}

/// The set of loaded plugins.
///
/// Shared by reference between whoever loads plugins and the
/// `SystemInfo` that reports them; there is no global instance.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: RwLock<BTreeMap<String, PluginDescriptor>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a plugin, keyed by id.
    pub fn register(&self, plugin: PluginDescriptor) -> Option<PluginDescriptor> {
        tracing::debug!(id = %plugin.id, "plugin registered");
        match self.plugins.write() {
            Ok(mut plugins) => plugins.insert(plugin.id.clone(), plugin),
            Err(poisoned) => poisoned.into_inner().insert(plugin.id.clone(), plugin),
        }
    }

    pub fn unregister(&self, id: &str) -> Option<PluginDescriptor> {
        match self.plugins.write() {
            Ok(mut plugins) => plugins.remove(id),
            Err(poisoned) => poisoned.into_inner().remove(id),
        }
    }

    pub fn get(&self, id: &str) -> Option<PluginDescriptor> {
        self.list().into_iter().find(|p| p.id == id)
    }

    /// Every plugin, sorted by id.
    pub fn list(&self) -> Vec<PluginDescriptor> {
        match self.plugins.read() {
            Ok(plugins) => plugins.values().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().values().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_replaces_by_id() {
        let registry = PluginRegistry::new();
        assert!(registry.register(PluginDescriptor::new("fs.ram", "RAMFS", "1.0")).is_none());
        let old = registry
            .register(PluginDescriptor::new("fs.ram", "RAMFS", "1.1"))
            .unwrap();
        assert_eq!(old.version, "1.0");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("fs.ram").unwrap().version, "1.1");
    }

    #[test]
    fn list_is_sorted() {
        let registry = PluginRegistry::new();
        registry.register(PluginDescriptor::new("b", "B", "1"));
        registry.register(PluginDescriptor::new("a", "A", "1"));
        let ids: Vec<String> = registry.list().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(registry.unregister("a").is_some());
        assert!(registry.unregister("a").is_none());
    }

    #[test]
    fn descriptor_json() {
        let plugin: PluginDescriptor =
            serde_json::from_str(r#"{"id": "x", "name": "X", "version": "0.1"}"#).unwrap();
        assert!(!plugin.active);
        assert_eq!(plugin.provider, "");
        let json = serde_json::to_value(&PluginDescriptor::new("x", "X", "0.1")).unwrap();
        assert_eq!(json["active"], true);
    }
}
