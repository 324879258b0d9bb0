//! Plugin Bus Library
//!
//! An in-process plugin runtime: plugins talk to each other only through
//! addressed requests and broadcast notifications on a shared [`EventBus`],
//! and are brought online in dependency order by the [`PluginLoader`].
//! Selected requests can be exposed over HTTP by the [`ApiServer`].

pub mod api;
pub mod bus;
pub mod core;
pub mod plugin;

// Re-export commonly used types
pub use api::ApiServer;
pub use bus::{EventBus, HttpMethod, Message, MiddlewareOutcome, Notification, Request};
pub use crate::core::{BusError, Config};
pub use plugin::{PluginFacade, PluginLoader, PluginModule, PluginRegistry, PluginSetHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type alias for the binary edge
pub type Result<T> = anyhow::Result<T>;
