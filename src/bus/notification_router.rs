//! Notification routing: many handlers per address plus generic listeners
//!
//! Dispatch is fire-and-forget. Every matching handler function is called
//! synchronously, in registration order, inside [`NotificationRouter::dispatch`];
//! the future it returns is spawned on the current tokio runtime and never
//! joined. Errors from those futures are logged and dropped.

use super::message::Notification;
use crate::core::error::Result;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Type-erased notification handler
pub type NotificationHandler =
    Arc<dyn Fn(Notification) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Box an async closure as a notification handler
pub fn notification_handler<F, Fut>(handler: F) -> NotificationHandler
where
    F: Fn(Notification) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |note| Box::pin(handler(note)))
}

#[derive(Default)]
pub struct NotificationRouter {
    /// channel -> method -> handlers in registration order
    handlers: RwLock<HashMap<String, HashMap<String, Vec<NotificationHandler>>>>,
    generic: RwLock<Vec<NotificationHandler>>,
}

impl NotificationRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, channel: String, method: String, handler: NotificationHandler) {
        self.handlers
            .write()
            .entry(channel)
            .or_default()
            .entry(method)
            .or_default()
            .push(handler);
    }

    pub fn add_generic(&self, handler: NotificationHandler) {
        self.generic.write().push(handler);
    }

    /// Handlers for the address followed by every generic handler
    pub fn matching(&self, channel: &str, method: &str) -> Vec<NotificationHandler> {
        let mut matched: Vec<NotificationHandler> = self
            .handlers
            .read()
            .get(channel)
            .and_then(|methods| methods.get(method))
            .cloned()
            .unwrap_or_default();
        matched.extend(self.generic.read().iter().cloned());
        matched
    }

    /// Number of address-specific handlers (generic ones excluded)
    pub fn count(&self, channel: &str, method: &str) -> usize {
        self.handlers
            .read()
            .get(channel)
            .and_then(|methods| methods.get(method))
            .map_or(0, Vec::len)
    }

    pub fn generic_count(&self) -> usize {
        self.generic.read().len()
    }

    /// Invoke every matching handler and detach its future
    ///
    /// Returns how many handlers were invoked.
    pub fn dispatch(&self, note: &Notification) -> usize {
        let matched = self.matching(&note.channel, &note.method);

        for handler in &matched {
            let fut = handler(note.clone());
            detach(fut, note);
        }

        matched.len()
    }
}

fn detach(fut: BoxFuture<'static, Result<()>>, note: &Notification) {
    let channel = note.channel.clone();
    let method = note.method.clone();

    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(async move {
                if let Err(e) = fut.await {
                    tracing::warn!(
                        channel = %channel,
                        method = %method,
                        "Notification subscriber failed: {}",
                        e
                    );
                }
            });
        }
        Err(_) => {
            tracing::warn!(
                channel = %channel,
                method = %method,
                "No async runtime available, dropping notification subscriber future"
            );
        }
    }
}
