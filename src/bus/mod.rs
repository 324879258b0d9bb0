//! In-process message bus
//!
//! Requests are answered by exactly one handler after passing the middleware
//! chain; notifications are broadcast to every matching subscriber.

pub mod endpoint;
pub mod event_bus;
pub mod message;
pub mod middleware;
pub mod notification_router;
pub mod request_router;

pub use endpoint::{Endpoint, HttpMethod};
pub use event_bus::{diagnostic, EventBus, CORE_CHANNEL};
pub use message::{Address, Message, Notification, Request};
pub use middleware::{middleware, Middleware, MiddlewareOutcome, MiddlewarePipeline, PipelineResult};
pub use notification_router::{notification_handler, NotificationHandler, NotificationRouter};
pub use request_router::{request_handler, RequestHandler, RequestRouter};
