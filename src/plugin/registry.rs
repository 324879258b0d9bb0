//! Plugin registry implementation
//!
//! Plugins are compiled into the binary and registered here under the `name`
//! their manifest declares. Discovery finds manifests on disk; the loader
//! resolves each manifest name against this registry. No code is ever loaded
//! from a discovered path.

use super::builtin::{SystemPlugin, SYSTEM_PLUGIN};
use super::types::PluginModule;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a fresh module instance for one load
pub type PluginFactory = Arc<dyn Fn() -> Arc<dyn PluginModule> + Send + Sync>;

/// Static registry of plugin modules keyed by manifest name
#[derive(Clone, Default)]
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
}

impl PluginRegistry {
    /// Create a new empty plugin registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in plugins already registered
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_module(SYSTEM_PLUGIN, SystemPlugin);
        registry
    }

    /// Register a factory; a later registration under the same name wins
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn PluginModule> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            tracing::warn!(plugin = %name, "Replacing registered plugin module");
        }
        self
    }

    /// Register a single shared module instance
    pub fn register_module<M>(&mut self, name: impl Into<String>, module: M) -> &mut Self
    where
        M: PluginModule + 'static,
    {
        let module: Arc<dyn PluginModule> = Arc::new(module);
        self.register(name, move || module.clone())
    }

    /// Module registered for a manifest name
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn PluginModule>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
