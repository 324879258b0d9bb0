//! Request routing: at most one handler per (channel, method)

use super::endpoint::Endpoint;
use super::message::Request;
use crate::core::error::{BusError, Result};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Type-erased request handler
pub type RequestHandler = Arc<dyn Fn(Request) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Box an async closure returning any serializable response
pub fn request_handler<F, Fut, R>(handler: F) -> RequestHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Serialize + Send + 'static,
{
    Arc::new(move |request| {
        let fut = handler(request);
        Box::pin(async move {
            let response = fut.await?;
            Ok(serde_json::to_value(response)?)
        })
    })
}

/// Handler table for requests plus the endpoint bindings recorded for them
#[derive(Default)]
pub struct RequestRouter {
    /// channel -> method -> handler
    handlers: RwLock<HashMap<String, HashMap<String, RequestHandler>>>,
    endpoints: RwLock<Vec<Endpoint>>,
}

impl RequestRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, channel: &str, method: &str) -> bool {
        self.handlers
            .read()
            .get(channel)
            .is_some_and(|methods| methods.contains_key(method))
    }

    /// Install a handler, returning true if it replaced an existing one
    pub fn insert(&self, channel: String, method: String, handler: RequestHandler) -> bool {
        self.handlers
            .write()
            .entry(channel)
            .or_default()
            .insert(method, handler)
            .is_some()
    }

    pub fn lookup(&self, channel: &str, method: &str) -> Option<RequestHandler> {
        self.handlers
            .read()
            .get(channel)
            .and_then(|methods| methods.get(method))
            .cloned()
    }

    /// Run the handler registered for the request's address
    pub async fn dispatch(&self, request: Request) -> Result<Value> {
        let handler = self
            .lookup(&request.channel, &request.method)
            .ok_or_else(|| BusError::NoHandler {
                channel: request.channel.clone(),
                method: request.method.clone(),
            })?;

        // The table lock is released before the handler runs so it may re-enter the bus
        handler(request).await
    }

    /// Record an HTTP binding; a binding for the same address is replaced
    pub fn bind_endpoint(&self, endpoint: Endpoint) {
        let mut endpoints = self.endpoints.write();
        match endpoints.iter_mut().find(|e| e.address == endpoint.address) {
            Some(existing) => *existing = endpoint,
            None => endpoints.push(endpoint),
        }
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints.read().clone()
    }
}
