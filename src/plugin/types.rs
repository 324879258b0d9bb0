//! Plugin type definitions
//!
//! This module defines the contract every compiled plugin implements and the
//! record kept for each plugin that loaded successfully.

use super::facade::PluginFacade;
use super::manifest::PluginManifest;
use crate::core::error::Result;
use std::sync::Arc;

/// Base trait that every plugin module must implement
///
/// `init` registers the plugin's request and notification handlers through the
/// facade. It runs once, after every plugin this one depends on has finished
/// its own `init`.
#[async_trait::async_trait]
pub trait PluginModule: Send + Sync {
    /// Initialize the plugin against the shared bus
    async fn init(&self, facade: PluginFacade) -> Result<()>;

    /// Release resources at shutdown
    ///
    /// Called in load order by [`PluginSetHandle::close_all`](super::handle::PluginSetHandle::close_all).
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A plugin whose `init` completed
#[derive(Clone)]
pub struct LoadedPlugin {
    info: PluginManifest,
    module: Arc<dyn PluginModule>,
}

impl LoadedPlugin {
    pub fn new(info: PluginManifest, module: Arc<dyn PluginModule>) -> Self {
        Self { info, module }
    }

    pub fn info(&self) -> &PluginManifest {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn module(&self) -> &Arc<dyn PluginModule> {
        &self.module
    }
}

impl std::fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}
