//! Plugin system module
//!
//! This module provides the plugin runtime including:
//! - Discovery of plugin directories from glob patterns
//! - `package.json` manifests and dependency ordering
//! - A static registry of compiled plugin modules
//! - The per-plugin facade over the event bus
//! - Sequential, fault-isolated loading and ordered teardown

pub mod builtin;
pub mod discovery;
pub mod facade;
pub mod handle;
pub mod loader;
pub mod manifest;
pub mod ordering;
pub mod registry;
pub mod types;

pub use builtin::{SystemPlugin, SYSTEM_PLUGIN};
pub use facade::{NotificationRegistrar, PluginFacade, RequestRegistrar};
pub use handle::PluginSetHandle;
pub use loader::PluginLoader;
pub use manifest::{PluginManifest, MANIFEST_FILE};
pub use ordering::DependencyOrdering;
pub use registry::{PluginFactory, PluginRegistry};
pub use types::{LoadedPlugin, PluginModule};
