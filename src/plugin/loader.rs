//! Plugin loader
//!
//! Brings plugins online in four steps:
//! - discover candidate directories from glob patterns
//! - read each candidate's manifest, dropping unreadable ones
//! - order candidates so dependencies come first
//! - initialize each plugin in turn, isolating failures
//!
//! Boot failures never abort the whole load (a dependency cycle is the one
//! exception). They are logged and reported on `core/plugin-load-error`.

use super::discovery;
use super::facade::PluginFacade;
use super::handle::{panic_message, PluginSetHandle};
use super::manifest::{read_manifest, PluginManifest};
use super::ordering::{self, DependencyOrdering};
use super::registry::PluginRegistry;
use super::types::LoadedPlugin;
use crate::bus::event_bus::{diagnostic, PLUGIN_LOADED, PLUGIN_LOAD_ERROR};
use crate::bus::{EventBus, Message, CORE_CHANNEL};
use crate::core::config::PluginsConfig;
use crate::core::error::{BusError, Result};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub struct PluginLoader {
    bus: EventBus,
    registry: PluginRegistry,
    root: PathBuf,
    ordering: DependencyOrdering,
}

impl PluginLoader {
    pub fn new(bus: EventBus, registry: PluginRegistry, root: impl Into<PathBuf>) -> Self {
        Self {
            bus,
            registry,
            root: root.into(),
            ordering: DependencyOrdering::default(),
        }
    }

    pub fn from_config(bus: EventBus, registry: PluginRegistry, config: &PluginsConfig) -> Self {
        Self::new(bus, registry, config.root.clone()).with_ordering(config.ordering)
    }

    pub fn with_ordering(mut self, ordering: DependencyOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Discover, order and initialize every plugin matched by `patterns`
    pub async fn load(&self, patterns: &[String]) -> Result<PluginSetHandle> {
        let started = Instant::now();
        tracing::info!(
            root = %self.root.display(),
            ordering = %self.ordering,
            "Loading plugins"
        );

        let candidates = self.discover(patterns)?;
        let manifests = self.read_manifests(&candidates).await;
        let ordered = self.order(manifests)?;
        let handle = self.load_each(ordered).await;

        tracing::info!(
            candidates = candidates.len(),
            loaded = handle.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Plugins loaded"
        );
        Ok(handle)
    }

    /// Candidate plugin directories, in pattern order
    pub fn discover(&self, patterns: &[String]) -> Result<Vec<PathBuf>> {
        discovery::discover(&self.root, patterns)
    }

    /// Manifests of the candidates that have a readable one
    pub async fn read_manifests(&self, paths: &[PathBuf]) -> Vec<PluginManifest> {
        let mut manifests = Vec::with_capacity(paths.len());
        for path in paths {
            match read_manifest(path).await {
                Ok(manifest) => manifests.push(manifest),
                Err(e) => self.report_load_error(&e, path, None),
            }
        }
        manifests
    }

    pub fn order(&self, manifests: Vec<PluginManifest>) -> Result<Vec<PluginManifest>> {
        let ordered = ordering::order(manifests, self.ordering)?;
        tracing::debug!(
            order = ?ordered.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            "Resolved plugin load order"
        );
        Ok(ordered)
    }

    /// Initialize each plugin sequentially; failures skip only that plugin
    pub async fn load_each(&self, ordered: Vec<PluginManifest>) -> PluginSetHandle {
        let mut loaded = Vec::with_capacity(ordered.len());

        for info in ordered {
            match self.init_one(&info).await {
                Ok(plugin) => {
                    tracing::info!(plugin = %info.name, path = %info.path.display(), "Plugin initialized");
                    self.bus.notify(
                        Message::new(CORE_CHANNEL, PLUGIN_LOADED).field("name", info.name.as_str()),
                    );
                    loaded.push(plugin);
                }
                Err(e) => self.report_load_error(&e, &info.path, Some(&info.name)),
            }
        }

        PluginSetHandle::new(loaded, self.bus.clone())
    }

    async fn init_one(&self, info: &PluginManifest) -> Result<LoadedPlugin> {
        let module = self
            .registry
            .resolve(&info.name)
            .ok_or_else(|| BusError::NoInit(info.name.clone()))?;

        tracing::debug!(plugin = %info.name, "Initializing plugin");
        let facade = PluginFacade::new(info.name.clone(), self.bus.clone());

        let outcome = AssertUnwindSafe(module.init(facade)).catch_unwind().await;
        match outcome {
            Ok(Ok(())) => Ok(LoadedPlugin::new(info.clone(), module)),
            Ok(Err(e)) => Err(BusError::PluginInit {
                name: info.name.clone(),
                reason: e.to_string(),
            }),
            Err(panic) => Err(BusError::PluginInit {
                name: info.name.clone(),
                reason: panic_message(panic.as_ref()),
            }),
        }
    }

    fn report_load_error(&self, error: &BusError, path: &Path, name: Option<&str>) {
        let kind = error.diagnostic_kind().unwrap_or("LOAD_FAILED");
        tracing::error!(
            kind,
            path = %path.display(),
            plugin = name.unwrap_or("-"),
            "Skipping plugin: {}",
            error
        );

        let mut note = diagnostic(PLUGIN_LOAD_ERROR, error.to_string())
            .field("kind", kind)
            .field("path", path.display().to_string());
        if let Some(name) = name {
            note = note.field("name", name);
        }
        self.bus.notify(note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::notification_handler;
    use crate::plugin::types::PluginModule;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Tracked {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl PluginModule for Tracked {
        async fn init(&self, _facade: PluginFacade) -> Result<()> {
            self.log.lock().push(self.name.to_string());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl PluginModule for Failing {
        async fn init(&self, _facade: PluginFacade) -> Result<()> {
            Err(BusError::HandlerFailed("database unavailable".into()))
        }
    }

    struct Panicking;

    #[async_trait::async_trait]
    impl PluginModule for Panicking {
        async fn init(&self, _facade: PluginFacade) -> Result<()> {
            panic!("init exploded");
        }
    }

    fn write_plugin(root: &Path, dir: &str, manifest: &str) {
        let path = root.join(dir);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("package.json"), manifest).unwrap();
    }

    fn capture_errors(bus: &EventBus) -> Arc<Mutex<Vec<Message>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.listen_for_notifications(
            CORE_CHANNEL,
            PLUGIN_LOAD_ERROR,
            notification_handler(move |note| {
                sink.lock().push(note);
                async { Ok(()) }
            }),
        );
        seen
    }

    #[tokio::test]
    async fn test_load_orders_by_dependencies() {
        let tmp = TempDir::new().unwrap();
        write_plugin(
            tmp.path(),
            "plugins/firstplugin",
            r#"{ "name": "firstplugin", "dependencies": { "secondplugin": "1.0.0" } }"#,
        );
        write_plugin(tmp.path(), "plugins/secondplugin", r#"{ "name": "secondplugin" }"#);

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = PluginRegistry::new();
        registry.register_module("firstplugin", Tracked { name: "firstplugin", log: log.clone() });
        registry.register_module("secondplugin", Tracked { name: "secondplugin", log: log.clone() });

        let loader = PluginLoader::new(EventBus::new(), registry, tmp.path());
        let handle = loader.load(&["plugins/*".to_string()]).await.unwrap();

        assert_eq!(*log.lock(), vec!["secondplugin", "firstplugin"]);
        assert_eq!(handle.names(), vec!["secondplugin", "firstplugin"]);
    }

    #[tokio::test]
    async fn test_missing_manifest_is_skipped_and_reported() {
        let tmp = TempDir::new().unwrap();
        write_plugin(tmp.path(), "plugins/good", r#"{ "name": "good" }"#);
        std::fs::create_dir_all(tmp.path().join("plugins/empty")).unwrap();

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = PluginRegistry::new();
        registry.register_module("good", Tracked { name: "good", log });

        let bus = EventBus::new();
        let errors = capture_errors(&bus);
        let handle = PluginLoader::new(bus, registry, tmp.path())
            .load(&["plugins/*".to_string()])
            .await
            .unwrap();

        assert_eq!(handle.names(), vec!["good"]);
        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].get("kind"), Some(&serde_json::json!("ENOENT")));
    }

    #[tokio::test]
    async fn test_unregistered_and_failing_plugins_are_isolated() {
        let tmp = TempDir::new().unwrap();
        write_plugin(tmp.path(), "plugins/a-unknown", r#"{ "name": "unknown" }"#);
        write_plugin(tmp.path(), "plugins/b-failing", r#"{ "name": "failing" }"#);
        write_plugin(tmp.path(), "plugins/c-panicking", r#"{ "name": "panicking" }"#);
        write_plugin(tmp.path(), "plugins/d-good", r#"{ "name": "good" }"#);

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = PluginRegistry::new();
        registry
            .register_module("failing", Failing)
            .register_module("panicking", Panicking)
            .register_module("good", Tracked { name: "good", log: log.clone() });

        let bus = EventBus::new();
        let errors = capture_errors(&bus);
        let handle = PluginLoader::new(bus, registry, tmp.path())
            .load(&["plugins/*".to_string()])
            .await
            .unwrap();

        assert_eq!(handle.names(), vec!["good"]);
        let kinds: Vec<String> = errors
            .lock()
            .iter()
            .filter_map(|n| n.get("kind").and_then(|k| k.as_str()).map(str::to_string))
            .collect();
        assert_eq!(kinds, vec!["NO_INIT", "INIT_FAILED", "INIT_FAILED"]);
    }

    #[tokio::test]
    async fn test_cycle_aborts_before_any_init() {
        let tmp = TempDir::new().unwrap();
        write_plugin(tmp.path(), "plugins/a", r#"{ "name": "a", "dependencies": { "b": "*" } }"#);
        write_plugin(tmp.path(), "plugins/b", r#"{ "name": "b", "dependencies": { "a": "*" } }"#);

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = PluginRegistry::new();
        registry
            .register_module("a", Tracked { name: "a", log: log.clone() })
            .register_module("b", Tracked { name: "b", log: log.clone() });

        let result = PluginLoader::new(EventBus::new(), registry, tmp.path())
            .load(&["plugins/*".to_string()])
            .await;

        assert!(matches!(result, Err(BusError::CyclicDependency(_))));
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_legacy_ordering_is_selectable() {
        let tmp = TempDir::new().unwrap();
        write_plugin(tmp.path(), "plugins/a", r#"{ "name": "a", "dependencies": { "b": "*" } }"#);
        write_plugin(tmp.path(), "plugins/b", r#"{ "name": "b", "dependencies": { "a": "*" } }"#);

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = PluginRegistry::new();
        registry
            .register_module("a", Tracked { name: "a", log: log.clone() })
            .register_module("b", Tracked { name: "b", log: log.clone() });

        // The legacy comparator has no cycle detection; both plugins load
        let handle = PluginLoader::new(EventBus::new(), registry, tmp.path())
            .with_ordering(DependencyOrdering::Legacy)
            .load(&["plugins/*".to_string()])
            .await
            .unwrap();
        assert_eq!(handle.len(), 2);
    }
}
