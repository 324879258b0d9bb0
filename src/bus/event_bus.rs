//! Event bus facade
//!
//! The [`EventBus`] is the one object every plugin gets a handle to. It composes:
//! - a [`RequestRouter`] (one handler per address, optional HTTP binding)
//! - a [`NotificationRouter`] (many handlers per address plus generic listeners)
//! - a [`MiddlewarePipeline`] run in front of every request
//!
//! Cloning is cheap; all clones share the same handler tables.
//!
//! The bus reports on its own operation with diagnostic notifications on the
//! [`CORE_CHANNEL`] channel rather than with errors.

use super::endpoint::{Endpoint, HttpMethod};
use super::message::{Address, Message, Notification, Request};
use super::middleware::{Middleware, MiddlewarePipeline, PipelineResult};
use super::notification_router::{NotificationHandler, NotificationRouter};
use super::request_router::{request_handler, RequestHandler, RequestRouter};
use crate::core::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Channel carrying diagnostics emitted by the runtime itself
pub const CORE_CHANNEL: &str = "core";

/// Emitted when a notification had no subscriber; also the recursion sentinel
pub const UNDEFINED_NOTIFICATION_HANDLER: &str = "undefined-notification-handler";

/// Emitted when a request handler replaces an existing one
pub const HANDLER_OVERWRITE: &str = "handler-overwrite";

/// Emitted when a plugin candidate is skipped during loading
pub const PLUGIN_LOAD_ERROR: &str = "plugin-load-error";

/// Emitted after a plugin finished `init`
pub const PLUGIN_LOADED: &str = "plugin-loaded";

/// Emitted when a plugin's `close` failed
pub const PLUGIN_CLOSE_ERROR: &str = "plugin-close-error";

/// Build a diagnostic notification on the core channel
pub fn diagnostic(method: &str, message: impl Into<String>) -> Notification {
    Message::new(CORE_CHANNEL, method).field("message", message.into())
}

#[derive(Default)]
struct BusInner {
    requests: RequestRouter,
    notifications: NotificationRouter,
    middleware: MiddlewarePipeline,
}

/// Shared in-process event bus
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send a request through the middleware chain to its handler
    pub async fn request(&self, request: Request) -> Result<Value> {
        tracing::debug!(
            channel = %request.channel,
            method = %request.method,
            "Dispatching request"
        );

        let request = match self.inner.middleware.run(request).await? {
            PipelineResult::Continue(request) => request,
            PipelineResult::Resolved(value) => return Ok(value),
        };

        self.inner.requests.dispatch(request).await
    }

    /// Send a request and deserialize the response
    pub async fn request_as<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let value = self.request(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Append a middleware to the request pipeline
    pub fn add_middleware(&self, middleware: Middleware) {
        self.inner.middleware.push(middleware);
    }

    /// Broadcast a notification without waiting for subscribers
    pub fn notify(&self, note: Notification) {
        let invoked = self.inner.notifications.dispatch(&note);
        if invoked > 0 || note.method == UNDEFINED_NOTIFICATION_HANDLER {
            return;
        }

        // Unobserved runtime diagnostics are routine
        if note.channel == CORE_CHANNEL {
            tracing::debug!(method = %note.method, "Core diagnostic has no subscriber");
        } else {
            tracing::warn!(
                channel = %note.channel,
                method = %note.method,
                "Notification has no subscriber"
            );
        }
        self.notify(diagnostic(
            UNDEFINED_NOTIFICATION_HANDLER,
            format!(
                "No notification handler for channel \"{}\" method \"{}\"",
                note.channel, note.method
            ),
        ));
    }

    /// Install the request handler for an address, replacing any existing one
    pub fn listen_for_requests<F, Fut, R>(
        &self,
        channel: impl Into<String>,
        method: impl Into<String>,
        handler: F,
    ) where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        self.install_request_handler(channel.into(), method.into(), request_handler(handler));
    }

    /// Install a request handler and expose it over HTTP
    pub fn listen_for_requests_with_endpoint<F, Fut, R>(
        &self,
        channel: impl Into<String>,
        method: impl Into<String>,
        http_method: HttpMethod,
        route: impl Into<String>,
        handler: F,
    ) where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        let address = Address::new(channel, method);
        self.install_request_handler(
            address.channel.clone(),
            address.method.clone(),
            request_handler(handler),
        );
        self.inner
            .requests
            .bind_endpoint(Endpoint::new(http_method, route, address));
    }

    /// Install an already boxed request handler
    pub fn install_request_handler(&self, channel: String, method: String, handler: RequestHandler) {
        if self.inner.requests.contains(&channel, &method) {
            tracing::warn!(
                channel = %channel,
                method = %method,
                "Overwriting request handler"
            );
            self.notify(diagnostic(
                HANDLER_OVERWRITE,
                format!(
                    "Request handler for channel \"{}\" method \"{}\" was overwritten",
                    channel, method
                ),
            ));
        }

        self.inner.requests.insert(channel, method, handler);
    }

    /// Subscribe to notifications at one address
    pub fn listen_for_notifications(
        &self,
        channel: impl Into<String>,
        method: impl Into<String>,
        handler: NotificationHandler,
    ) {
        self.inner
            .notifications
            .add(channel.into(), method.into(), handler);
    }

    /// Subscribe to every notification
    pub fn listen_for_all_notifications(&self, handler: NotificationHandler) {
        self.inner.notifications.add_generic(handler);
    }

    /// Snapshot of the HTTP bindings in registration order
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.inner.requests.endpoints()
    }

    pub fn has_request_handler(&self, channel: &str, method: &str) -> bool {
        self.inner.requests.contains(channel, method)
    }

    pub fn notification_handler_count(&self, channel: &str, method: &str) -> usize {
        self.inner.notifications.count(channel, method)
    }

    pub fn middleware_count(&self) -> usize {
        self.inner.middleware.len()
    }
}
