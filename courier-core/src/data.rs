//! Request and response payloads.
//!
//! [`Data`] is what flows through the transform pipelines: callers usually
//! hand in [`Data::Json`], the default request transform turns it into text,
//! adapters put raw [`Data::Bytes`] on responses, and the default response
//! transform parses them back into JSON.

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A request or response body.
#[derive(Clone, Debug, PartialEq)]
pub enum Data {
    /// A structured JSON value, not yet serialized.
    Json(Value),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes as they travel on the wire.
    Bytes(Bytes),
}

impl Data {
    /// Serialize any value into a [`Data::Json`] payload.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Data::Json)
    }

    /// Get the JSON value, if this payload is structured.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Data::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Get the payload as text.
    ///
    /// Returns `None` for JSON values and for bytes that are not valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Data::Text(text) => Some(text),
            Data::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
            Data::Json(_) => None,
        }
    }

    /// Deserialize the payload into a typed value.
    ///
    /// Text and bytes are parsed as JSON.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self {
            Data::Json(value) => T::deserialize(value),
            Data::Text(text) => serde_json::from_str(text),
            Data::Bytes(bytes) => serde_json::from_slice(bytes),
        }
    }

    /// Encode the payload for the wire.
    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        match self {
            Data::Json(value) => serde_json::to_vec(value).map(Bytes::from),
            Data::Text(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
            Data::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

impl From<Value> for Data {
    fn from(value: Value) -> Self {
        Data::Json(value)
    }
}

impl From<String> for Data {
    fn from(text: String) -> Self {
        Data::Text(text)
    }
}

impl From<&str> for Data {
    fn from(text: &str) -> Self {
        Data::Text(text.to_string())
    }
}

impl From<Bytes> for Data {
    fn from(bytes: Bytes) -> Self {
        Data::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Data {
    fn from(bytes: Vec<u8>) -> Self {
        Data::Bytes(Bytes::from(bytes))
    }
}
