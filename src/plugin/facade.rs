//! Per-plugin view of the shared event bus
//!
//! A [`PluginFacade`] is handed to each plugin's `init`. It forwards to the
//! shared [`EventBus`] and adds fluent registration:
//!
//! ```ignore
//! facade
//!     .listen_for_requests("tables")
//!     .on("list", |_req| async { Ok(vec!["users"]) })
//!     .on_http("rename", HttpMethod::Post, "/api/tables/:table/rename", rename);
//! ```

use crate::bus::{
    notification_handler, EventBus, HttpMethod, Middleware, Notification, Request,
};
use crate::core::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

/// Handle given to a plugin during `init`
#[derive(Clone)]
pub struct PluginFacade {
    name: String,
    bus: EventBus,
}

impl PluginFacade {
    pub fn new(name: impl Into<String>, bus: EventBus) -> Self {
        Self {
            name: name.into(),
            bus,
        }
    }

    /// Name of the plugin this facade belongs to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared bus, e.g. to keep for use after `init`
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub async fn request(&self, request: Request) -> Result<Value> {
        self.bus.request(request).await
    }

    pub async fn request_as<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        self.bus.request_as(request).await
    }

    pub fn notify(&self, note: Notification) {
        self.bus.notify(note);
    }

    pub fn add_middleware(&self, middleware: Middleware) {
        tracing::debug!(plugin = %self.name, "Adding middleware");
        self.bus.add_middleware(middleware);
    }

    /// Start registering request handlers on a channel
    pub fn listen_for_requests(&self, channel: impl Into<String>) -> RequestRegistrar {
        RequestRegistrar {
            plugin: self.name.clone(),
            channel: channel.into(),
            bus: self.bus.clone(),
        }
    }

    /// Start registering notification handlers on a channel
    pub fn listen_for_notifications(&self, channel: impl Into<String>) -> NotificationRegistrar {
        NotificationRegistrar {
            plugin: self.name.clone(),
            channel: channel.into(),
            bus: self.bus.clone(),
        }
    }

    /// Subscribe to every notification on the bus
    pub fn listen_for_all_notifications<F, Fut>(&self, handler: F)
    where
        F: Fn(Notification) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        tracing::debug!(plugin = %self.name, "Listening for all notifications");
        self.bus
            .listen_for_all_notifications(notification_handler(handler));
    }
}

/// Fluent request registration for one channel
pub struct RequestRegistrar {
    plugin: String,
    channel: String,
    bus: EventBus,
}

impl RequestRegistrar {
    /// Handle `method` on this channel
    pub fn on<F, Fut, R>(self, method: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        let method = method.into();
        tracing::debug!(
            plugin = %self.plugin,
            channel = %self.channel,
            method = %method,
            "Registering request handler"
        );
        self.bus
            .listen_for_requests(self.channel.clone(), method, handler);
        self
    }

    /// Handle `method` on this channel and expose it over HTTP
    pub fn on_http<F, Fut, R>(
        self,
        method: impl Into<String>,
        http_method: HttpMethod,
        route: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        let method = method.into();
        let route = route.into();
        tracing::debug!(
            plugin = %self.plugin,
            channel = %self.channel,
            method = %method,
            http_method = %http_method,
            route = %route,
            "Registering request handler with endpoint"
        );
        self.bus.listen_for_requests_with_endpoint(
            self.channel.clone(),
            method,
            http_method,
            route,
            handler,
        );
        self
    }
}

/// Fluent notification registration for one channel
pub struct NotificationRegistrar {
    plugin: String,
    channel: String,
    bus: EventBus,
}

impl NotificationRegistrar {
    pub fn on<F, Fut>(self, method: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Notification) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let method = method.into();
        tracing::debug!(
            plugin = %self.plugin,
            channel = %self.channel,
            method = %method,
            "Registering notification handler"
        );
        self.bus.listen_for_notifications(
            self.channel.clone(),
            method,
            notification_handler(handler),
        );
        self
    }
}
