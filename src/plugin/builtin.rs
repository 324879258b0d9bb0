//! Built-in `system` plugin
//!
//! Answers liveness pings and lists the HTTP bindings currently on the bus.

use super::facade::PluginFacade;
use super::types::PluginModule;
use crate::bus::HttpMethod;
use crate::core::error::Result;
use serde_json::json;

/// Manifest name of the built-in plugin
pub const SYSTEM_PLUGIN: &str = "system";

pub struct SystemPlugin;

#[async_trait::async_trait]
impl PluginModule for SystemPlugin {
    async fn init(&self, facade: PluginFacade) -> Result<()> {
        let bus = facade.bus().clone();

        facade
            .listen_for_requests(SYSTEM_PLUGIN)
            .on_http("ping", HttpMethod::Get, "/api/system/ping", |_req| async {
                Ok(json!({ "pong": true }))
            })
            .on_http(
                "endpoints",
                HttpMethod::Get,
                "/api/system/endpoints",
                move |_req| {
                    let endpoints = bus.endpoints();
                    async move { Ok(endpoints) }
                },
            );

        Ok(())
    }
}
