//! HTTP endpoint bindings attached to request addresses
//!
//! The bus only records these; the HTTP bridge in `api` consumes them.

use super::message::Address;
use serde::{Deserialize, Serialize};

/// HTTP method enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// HTTP GET method
    Get,
    /// HTTP POST method
    Post,
    /// HTTP PUT method
    Put,
    /// HTTP PATCH method
    Patch,
    /// HTTP DELETE method
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
            HttpMethod::Patch => write!(f, "PATCH"),
            HttpMethod::Delete => write!(f, "DELETE"),
        }
    }
}

/// Route exposed over HTTP for one request address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub http_method: HttpMethod,

    /// Route in axum syntax, e.g. `/api/tables/:name`
    pub route: String,

    /// Request address the route forwards to
    pub address: Address,
}

impl Endpoint {
    pub fn new(http_method: HttpMethod, route: impl Into<String>, address: Address) -> Self {
        Self {
            http_method,
            route: route.into(),
            address,
        }
    }
}
