//! Message envelope shared by requests and notifications
//!
//! On the wire a message is a flat JSON object: `{channel, method, ...payload}`.
//! The runtime only reads `channel` and `method`; payload fields are opaque.

use crate::core::error::{BusError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Two-part address of a handler
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub channel: String,
    pub method: String,
}

impl Address {
    pub fn new(channel: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel, self.method)
    }
}

/// Addressable unit carried by the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub channel: String,
    pub method: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// A message dispatched to exactly one handler
pub type Request = Message;

/// A message broadcast to zero or more handlers
pub type Notification = Message;

impl Message {
    /// Create a message with an empty payload
    pub fn new(channel: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            method: method.into(),
            payload: Map::new(),
        }
    }

    /// Create a message whose payload fields come from a serializable value
    ///
    /// The value must serialize to a JSON object; `channel` and `method` keys
    /// in it are ignored.
    pub fn with_payload(
        channel: impl Into<String>,
        method: impl Into<String>,
        payload: impl Serialize,
    ) -> Result<Self> {
        let mut message = Self::new(channel, method);
        match serde_json::to_value(payload)? {
            Value::Object(map) => {
                for (key, value) in map {
                    message.insert(key, value);
                }
                Ok(message)
            }
            Value::Null => Ok(message),
            other => Err(BusError::SerializationError(format!(
                "message payload must be a JSON object, got {}",
                other
            ))),
        }
    }

    /// Add one payload field
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value.into());
        self
    }

    /// Insert a payload field, ignoring the reserved address keys
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if key != "channel" && key != "method" {
            self.payload.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn address(&self) -> Address {
        Address::new(self.channel.clone(), self.method.clone())
    }

    /// Deserialize the payload into a concrete type
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.payload.clone()))?)
    }

    /// The full wire form, payload flattened next to the address
    pub fn to_value(&self) -> Value {
        let mut map = self.payload.clone();
        map.insert("channel".to_string(), Value::String(self.channel.clone()));
        map.insert("method".to_string(), Value::String(self.method.clone()));
        Value::Object(map)
    }
}
