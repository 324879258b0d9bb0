//! Error type system for the plugin bus
//!
//! This module provides the single error type used across the runtime:
//! - Request-time failures surfaced directly to the caller
//! - Boot-time failures that are isolated per plugin and reported as diagnostics
//! - HTTP response mapping for the bridge

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Main error type for the plugin bus
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    // Request-time errors
    #[error("No handler registered for channel \"{channel}\" method \"{method}\"")]
    NoHandler { channel: String, method: String },

    #[error("{}", describe_payload(.0))]
    Rejected(Value),

    #[error("Handler failed: {0}")]
    HandlerFailed(String),

    // Plugin boot errors
    #[error("Plugin manifest not found: {}", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("Plugin manifest {} is invalid: {reason}", .path.display())]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("Plugin {0} does not provide an init entry point")]
    NoInit(String),

    #[error("Plugin {name} failed to initialize: {reason}")]
    PluginInit { name: String, reason: String },

    #[error("Cyclic plugin dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    #[error("Failed to close plugin(s): {}", .0.join(", "))]
    CloseFailed(Vec<String>),

    #[error("Plugin discovery failed: {0}")]
    Discovery(String),

    // System errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl BusError {
    /// Build a rejection carrying an arbitrary payload
    pub fn rejected(payload: impl Into<Value>) -> Self {
        BusError::Rejected(payload.into())
    }

    /// Get the error type name
    pub fn error_type(&self) -> &'static str {
        match self {
            BusError::NoHandler { .. } => "NoHandler",
            BusError::Rejected(_) => "Rejected",
            BusError::HandlerFailed(_) => "HandlerFailed",
            BusError::ManifestNotFound(_) => "ManifestNotFound",
            BusError::ManifestInvalid { .. } => "ManifestInvalid",
            BusError::NoInit(_) => "NoInit",
            BusError::PluginInit { .. } => "PluginInit",
            BusError::CyclicDependency(_) => "CyclicDependency",
            BusError::CloseFailed(_) => "CloseFailed",
            BusError::Discovery(_) => "Discovery",
            BusError::ConfigError(_) => "ConfigError",
            BusError::IoError(_) => "IoError",
            BusError::SerializationError(_) => "SerializationError",
        }
    }

    /// Kind reported in `plugin-load-error` diagnostics, if this is a boot failure
    pub fn diagnostic_kind(&self) -> Option<&'static str> {
        match self {
            BusError::ManifestNotFound(_) | BusError::ManifestInvalid { .. } => Some("ENOENT"),
            BusError::NoInit(_) => Some("NO_INIT"),
            BusError::PluginInit { .. } => Some("INIT_FAILED"),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BusError {
    fn from(err: serde_json::Error) -> Self {
        BusError::SerializationError(err.to_string())
    }
}

/// Render a rejection payload as a message: strings verbatim, `{message}` or
/// `{error}` fields when present, JSON otherwise.
fn describe_payload(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| payload.to_string()),
        other => other.to_string(),
    }
}

/// Error body returned by the HTTP bridge
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

impl ErrorResponse {
    pub fn from_error(error: &BusError) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

/// Every failed bridged request is answered with 500 and `{error}`
impl IntoResponse for BusError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from_error(&self);

        tracing::error!(
            error_type = self.error_type(),
            "Bridged request failed: {}",
            self
        );

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Result type alias for operations that can fail with BusError
pub type Result<T> = std::result::Result<T, BusError>;
