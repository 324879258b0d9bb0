//! Middleware pipeline run in front of every request
//!
//! Each middleware sees the request (as rewritten by earlier ones) and decides
//! to pass it on, answer it, or refuse it. Middlewares run strictly one after
//! another in registration order.

use super::message::Request;
use crate::core::error::{BusError, Result};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Decision taken by a middleware
#[derive(Debug, Clone, PartialEq)]
pub enum MiddlewareOutcome {
    /// Continue; `Some` replaces the request for the rest of the chain
    Pass(Option<Request>),
    /// Answer the request now; the handler never runs
    Resolve(Value),
    /// Fail the request now with this payload
    Reject(Value),
}

impl MiddlewareOutcome {
    pub fn pass() -> Self {
        MiddlewareOutcome::Pass(None)
    }

    pub fn rewrite(request: Request) -> Self {
        MiddlewareOutcome::Pass(Some(request))
    }

    pub fn resolve(value: impl Into<Value>) -> Self {
        MiddlewareOutcome::Resolve(value.into())
    }

    pub fn reject(payload: impl Into<Value>) -> Self {
        MiddlewareOutcome::Reject(payload.into())
    }
}

/// Type-erased middleware
pub type Middleware = Arc<dyn Fn(Request) -> BoxFuture<'static, MiddlewareOutcome> + Send + Sync>;

/// Box an async closure as a middleware
pub fn middleware<F, Fut>(f: F) -> Middleware
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MiddlewareOutcome> + Send + 'static,
{
    Arc::new(move |request| Box::pin(f(request)))
}

/// Result of running the whole chain
#[derive(Debug, PartialEq)]
pub enum PipelineResult {
    /// Every middleware passed; dispatch this request
    Continue(Request),
    /// A middleware answered the request
    Resolved(Value),
}

#[derive(Default)]
pub struct MiddlewarePipeline {
    middlewares: RwLock<Vec<Middleware>>,
}

impl MiddlewarePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware; there is no removal
    pub fn push(&self, middleware: Middleware) {
        self.middlewares.write().push(middleware);
    }

    pub fn len(&self) -> usize {
        self.middlewares.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.read().is_empty()
    }

    /// Run the request through every middleware in order
    pub async fn run(&self, request: Request) -> Result<PipelineResult> {
        // Snapshot so middlewares added while this request is in flight do not apply to it
        let chain: Vec<Middleware> = self.middlewares.read().clone();
        let mut request = request;

        for (index, middleware) in chain.iter().enumerate() {
            match middleware(request.clone()).await {
                MiddlewareOutcome::Pass(Some(rewritten)) => {
                    tracing::trace!(index, "Middleware rewrote request");
                    request = rewritten;
                }
                MiddlewareOutcome::Pass(None) => {}
                MiddlewareOutcome::Resolve(value) => {
                    tracing::debug!(
                        index,
                        channel = %request.channel,
                        method = %request.method,
                        "Middleware resolved request"
                    );
                    return Ok(PipelineResult::Resolved(value));
                }
                MiddlewareOutcome::Reject(payload) => {
                    tracing::debug!(
                        index,
                        channel = %request.channel,
                        method = %request.method,
                        "Middleware rejected request"
                    );
                    return Err(BusError::Rejected(payload));
                }
            }
        }

        Ok(PipelineResult::Continue(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::message::Message;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_empty_pipeline_continues() {
        let pipeline = MiddlewarePipeline::new();
        let request = Message::new("c", "m");
        let result = pipeline.run(request.clone()).await.unwrap();
        assert_eq!(result, PipelineResult::Continue(request));
        assert!(pipeline.is_empty());
    }

    #[tokio::test]
    async fn test_rewrite_is_seen_by_later_middlewares() {
        let pipeline = MiddlewarePipeline::new();
        pipeline.push(middleware(|req: Request| async move {
            MiddlewareOutcome::rewrite(req.field("user", "alice"))
        }));
        pipeline.push(middleware(|req: Request| async move {
            if req.get("user") == Some(&json!("alice")) {
                MiddlewareOutcome::pass()
            } else {
                MiddlewareOutcome::reject("unauthenticated")
            }
        }));

        let result = pipeline.run(Message::new("c", "m")).await.unwrap();
        match result {
            PipelineResult::Continue(req) => assert_eq!(req.get("user"), Some(&json!("alice"))),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reject_short_circuits() {
        let pipeline = MiddlewarePipeline::new();
        let later = Arc::new(AtomicUsize::new(0));

        pipeline.push(middleware(|_req| async { MiddlewareOutcome::reject(json!({ "code": 403 })) }));
        let later_clone = later.clone();
        pipeline.push(middleware(move |_req| {
            later_clone.fetch_add(1, Ordering::SeqCst);
            async { MiddlewareOutcome::pass() }
        }));

        let err = pipeline.run(Message::new("c", "m")).await.unwrap_err();
        assert!(matches!(err, BusError::Rejected(ref v) if *v == json!({ "code": 403 })));
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolve_short_circuits() {
        let pipeline = MiddlewarePipeline::new();
        pipeline.push(middleware(|_req| async { MiddlewareOutcome::resolve(json!({ "cached": true })) }));
        pipeline.push(middleware(|_req| async { MiddlewareOutcome::reject("never") }));

        let result = pipeline.run(Message::new("c", "m")).await.unwrap();
        assert_eq!(result, PipelineResult::Resolved(json!({ "cached": true })));
        assert_eq!(pipeline.len(), 2);
    }
}
