//! Aggregate handle over the plugins that loaded

use super::types::LoadedPlugin;
use crate::bus::event_bus::{diagnostic, PLUGIN_CLOSE_ERROR};
use crate::bus::EventBus;
use crate::core::error::{BusError, Result};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// Successfully loaded plugins, in load order
pub struct PluginSetHandle {
    plugins: Vec<LoadedPlugin>,
    bus: EventBus,
}

impl PluginSetHandle {
    pub fn new(plugins: Vec<LoadedPlugin>, bus: EventBus) -> Self {
        Self { plugins, bus }
    }

    pub fn plugins(&self) -> &[LoadedPlugin] {
        &self.plugins
    }

    /// Plugin names in load order
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(LoadedPlugin::name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&LoadedPlugin> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Close every plugin in load order
    ///
    /// Best-effort: a failing or panicking `close` is logged and reported on
    /// `core/plugin-close-error`, and the remaining plugins are still closed.
    /// Returns [`BusError::CloseFailed`] naming every plugin that failed.
    pub async fn close_all(&self) -> Result<()> {
        let mut failed = Vec::new();

        for plugin in &self.plugins {
            let name = plugin.name();
            let outcome = AssertUnwindSafe(plugin.module().close()).catch_unwind().await;

            let reason = match outcome {
                Ok(Ok(())) => {
                    tracing::debug!(plugin = %name, "Plugin closed");
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            };

            tracing::error!(plugin = %name, "Failed to close plugin: {}", reason);
            self.bus.notify(
                diagnostic(PLUGIN_CLOSE_ERROR, reason).field("name", name),
            );
            failed.push(name.to_string());
        }

        if failed.is_empty() {
            tracing::info!(count = self.plugins.len(), "All plugins closed");
            Ok(())
        } else {
            Err(BusError::CloseFailed(failed))
        }
    }
}

/// Text of a caught panic payload
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
