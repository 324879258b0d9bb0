//! HTTP bridge module
//!
//! This module exposes the bus over HTTP:
//! - One route per endpoint binding recorded on the bus
//! - Health check and trace-id propagation
//! - Graceful shutdown on Ctrl+C or SIGTERM

pub mod bridge;
pub mod middleware;
pub mod server;

pub use bridge::endpoint_routes;
pub use middleware::{trace_id_middleware, TraceId, TRACE_ID_HEADER};
pub use server::ApiServer;
