//! End-to-end plugin loading against real directories

use parking_lot::Mutex;
use plugin_bus::bus::event_bus::PLUGIN_LOAD_ERROR;
use plugin_bus::bus::{notification_handler, CORE_CHANNEL};
use plugin_bus::core::Result;
use plugin_bus::{BusError, EventBus, Message, PluginFacade, PluginLoader, PluginModule, PluginRegistry};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

type Journal = Arc<Mutex<Vec<String>>>;

/// Registers `<channel>/ping` and records when `init` starts and ends
struct PingPlugin {
    channel: &'static str,
    journal: Journal,
    peer: Option<&'static str>,
}

#[async_trait::async_trait]
impl PluginModule for PingPlugin {
    async fn init(&self, facade: PluginFacade) -> Result<()> {
        self.journal.lock().push(format!("{}:start", self.channel));

        // A dependent may already talk to its dependency during init
        if let Some(peer) = self.peer {
            let pong = facade.request(Message::new(peer, "ping")).await?;
            assert_eq!(pong, json!({ "pong": true }));
        }

        facade
            .listen_for_requests(self.channel)
            .on("ping", |_req| async { Ok(json!({ "pong": true })) });

        tokio::task::yield_now().await;
        self.journal.lock().push(format!("{}:end", self.channel));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.journal.lock().push(format!("{}:close", self.channel));
        if self.channel == "p1" {
            return Err(BusError::HandlerFailed("p1 close failed".into()));
        }
        Ok(())
    }
}

fn write_manifest(root: &Path, dir: &str, manifest: serde_json::Value) {
    let path = root.join(dir);
    std::fs::create_dir_all(&path).unwrap();
    std::fs::write(path.join("package.json"), manifest.to_string()).unwrap();
}

fn ping_registry(journal: &Journal) -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry
        .register_module(
            "p1",
            PingPlugin {
                channel: "p1",
                journal: journal.clone(),
                peer: None,
            },
        )
        .register_module(
            "p2",
            PingPlugin {
                channel: "p2",
                journal: journal.clone(),
                peer: Some("p1"),
            },
        );
    registry
}

#[tokio::test]
async fn test_two_plugins_end_to_end() {
    let tmp = TempDir::new().unwrap();
    // p2 is discovered first but depends on p1
    write_manifest(tmp.path(), "p2/plugin", json!({ "name": "p2", "dependencies": { "p1": "1.0.0" } }));
    write_manifest(tmp.path(), "p1/plugin", json!({ "name": "p1" }));

    let journal: Journal = Arc::default();
    let bus = EventBus::new();
    let loader = PluginLoader::new(bus.clone(), ping_registry(&journal), tmp.path());

    let handle = loader
        .load(&["p2/*".to_string(), "p1/*".to_string()])
        .await
        .unwrap();

    assert_eq!(handle.names(), vec!["p1", "p2"]);
    assert_eq!(
        *journal.lock(),
        vec!["p1:start", "p1:end", "p2:start", "p2:end"]
    );

    for channel in ["p1", "p2"] {
        let pong = bus.request(Message::new(channel, "ping")).await.unwrap();
        assert_eq!(pong, json!({ "pong": true }));
    }
}

#[tokio::test]
async fn test_directory_without_manifest_is_skipped() {
    let tmp = TempDir::new().unwrap();
    write_manifest(tmp.path(), "plugins/p1", json!({ "name": "p1" }));
    std::fs::create_dir_all(tmp.path().join("plugins/orphan")).unwrap();

    let bus = EventBus::new();
    let reported: Arc<Mutex<Vec<Message>>> = Arc::default();
    let sink = reported.clone();
    bus.listen_for_notifications(
        CORE_CHANNEL,
        PLUGIN_LOAD_ERROR,
        notification_handler(move |note| {
            sink.lock().push(note);
            async { Ok(()) }
        }),
    );

    let journal: Journal = Arc::default();
    let handle = PluginLoader::new(bus, ping_registry(&journal), tmp.path())
        .load(&["plugins/*".to_string()])
        .await
        .unwrap();

    assert_eq!(handle.names(), vec!["p1"]);

    let reported = reported.lock();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].get("kind"), Some(&json!("ENOENT")));
    let path = reported[0].get("path").and_then(|p| p.as_str()).unwrap();
    assert!(path.ends_with("orphan"));
}

#[tokio::test]
async fn test_close_all_is_best_effort_in_load_order() {
    let tmp = TempDir::new().unwrap();
    write_manifest(tmp.path(), "plugins/a", json!({ "name": "p2", "dependencies": { "p1": "*" } }));
    write_manifest(tmp.path(), "plugins/b", json!({ "name": "p1" }));

    let journal: Journal = Arc::default();
    let handle = PluginLoader::new(EventBus::new(), ping_registry(&journal), tmp.path())
        .load(&["plugins/*".to_string()])
        .await
        .unwrap();
    journal.lock().clear();

    let err = handle.close_all().await.unwrap_err();
    assert!(matches!(err, BusError::CloseFailed(ref names) if names == &vec!["p1".to_string()]));
    assert_eq!(*journal.lock(), vec!["p1:close", "p2:close"]);
}

#[tokio::test]
async fn test_failed_init_does_not_block_later_plugins() {
    struct Broken;

    #[async_trait::async_trait]
    impl PluginModule for Broken {
        async fn init(&self, facade: PluginFacade) -> Result<()> {
            // Handlers registered before the failure stay registered
            facade
                .listen_for_requests("broken")
                .on("half", |_req| async { Ok(true) });
            Err(BusError::HandlerFailed("missing credentials".into()))
        }
    }

    let tmp = TempDir::new().unwrap();
    write_manifest(tmp.path(), "plugins/a", json!({ "name": "broken" }));
    write_manifest(tmp.path(), "plugins/b", json!({ "name": "p1" }));

    let journal: Journal = Arc::default();
    let mut registry = ping_registry(&journal);
    registry.register_module("broken", Broken);

    let bus = EventBus::new();
    let handle = PluginLoader::new(bus.clone(), registry, tmp.path())
        .load(&["plugins/*".to_string()])
        .await
        .unwrap();

    assert_eq!(handle.names(), vec!["p1"]);
    assert!(handle.get("broken").is_none());
    assert!(bus.has_request_handler("broken", "half"));
}
