//! Plugin Bus - runtime host
//!
//! Loads the configured plugins onto a shared bus and exposes their HTTP
//! bindings until shutdown.

use plugin_bus::{api, bus, core, plugin};

use anyhow::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (handles CLI args, env vars, and config file)
    let config = match core::Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Print error to stderr since logging isn't initialized yet
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Initialize logging system based on configuration
    let _logger = match core::Logger::init(&config.logging) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return Err(e);
        }
    };

    info!("Starting Plugin Bus v{}", plugin_bus::VERSION);
    info!(
        host = %config.server.host,
        port = config.server.port,
        "Server configuration"
    );
    info!(
        root = ?config.plugins.root,
        patterns = ?config.plugins.patterns,
        ordering = %config.plugins.ordering,
        "Plugin configuration"
    );

    let bus = bus::EventBus::new();
    let registry = plugin::PluginRegistry::with_builtins();
    info!(modules = ?registry.names(), "Plugin registry ready");

    let loader = plugin::PluginLoader::from_config(bus.clone(), registry, &config.plugins);
    let plugins = loader.load(&config.plugins.patterns).await?;
    info!(plugins = ?plugins.names(), "Plugin set online");

    let server = api::ApiServer::new(config.server.clone(), &bus);
    let served = server.serve().await;

    info!("Closing plugins...");
    if let Err(e) = plugins.close_all().await {
        tracing::error!("Plugin shutdown incomplete: {}", e);
    }

    served
}
