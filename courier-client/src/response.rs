//! Response types.

use http::{HeaderMap, Method, StatusCode, Uri};
use serde::de::DeserializeOwned;

use courier_core::Data;

use crate::config::RequestConfig;
use crate::error::Error;

/// The request an adapter actually sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestHandle {
    pub method: Method,
    pub uri: Uri,
}

/// A response as it travels back through the pipeline.
///
/// Response transforms and interceptors are free to rewrite every field.
#[derive(Clone, Debug)]
pub struct Response {
    pub data: Option<Data>,
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Configuration the request was dispatched with.
    pub config: RequestConfig,
    pub request: Option<RequestHandle>,
}

impl Response {
    /// Create a response with no body or headers.
    pub fn new(status: StatusCode, config: RequestConfig) -> Self {
        Self {
            data: None,
            status,
            headers: HeaderMap::new(),
            config,
            request: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<Data>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Deserialize the body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| Error::transform("response has no body"))?;
        data.decode().map_err(|e| Error::transform(e.to_string()))
    }

    /// The body as text, if it is text.
    pub fn text(&self) -> Option<&str> {
        self.data.as_ref().and_then(Data::as_text)
    }
}
