//! Per-request configuration.
//!
//! [`RequestConfig`] describes one call: where it goes, what it carries and
//! which hooks shape it. The same type holds instance defaults on a
//! [`Client`](crate::Client); the two are combined by
//! [`merge_config`](crate::merge::merge_config) before dispatch.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use courier_core::{ConfigHeaders, Data, ParamsSerializer, Transitional, build_full_path, build_url};

use crate::adapter::{Adapter, SharedAdapter};
use crate::cancel::CancelToken;
use crate::error::Error;
use crate::transform::{default_request_transforms, default_response_transforms};

/// What a transform can see besides the data and headers.
#[derive(Debug)]
pub struct TransformContext<'a> {
    pub method: &'a Method,
    pub transitional: &'a Transitional,
    /// Response status; `None` for request transforms.
    pub status: Option<StatusCode>,
}

/// Shapes outgoing data. May rewrite the request headers.
pub type RequestTransform = Arc<
    dyn Fn(Option<Data>, &mut HeaderMap, &TransformContext<'_>) -> Result<Option<Data>, Error>
        + Send
        + Sync,
>;

/// Shapes incoming data.
pub type ResponseTransform = Arc<
    dyn Fn(Option<Data>, &HeaderMap, &TransformContext<'_>) -> Result<Option<Data>, Error>
        + Send
        + Sync,
>;

/// Decides whether a status code counts as success.
pub type ValidateStatus = Arc<dyn Fn(StatusCode) -> bool + Send + Sync>;

/// Configuration for a single request, or instance defaults.
///
/// Every field is optional; unset fields fall back to the instance defaults
/// and then to built-in behavior.
///
/// # Example
///
/// ```ignore
/// use courier_client::RequestConfig;
/// use std::time::Duration;
///
/// let config = RequestConfig::new()
///     .url("/users")
///     .param("page", 2)
///     .header("x-request-id", "abc-123")
///     .timeout(Duration::from_secs(5));
/// ```
#[derive(Clone, Default)]
pub struct RequestConfig {
    pub url: Option<String>,
    pub base_url: Option<String>,
    pub method: Option<Method>,
    pub headers: ConfigHeaders,
    pub data: Option<Data>,
    pub params: Option<Map<String, Value>>,
    pub params_serializer: Option<ParamsSerializer>,
    /// `None` means the default transforms.
    pub transform_request: Option<Vec<RequestTransform>>,
    /// `None` means the default transforms.
    pub transform_response: Option<Vec<ResponseTransform>>,
    pub adapter: Option<SharedAdapter>,
    pub cancel_token: Option<CancelToken>,
    /// Abort signal, honored alongside `cancel_token`.
    pub signal: Option<CancellationToken>,
    pub transitional: Option<Transitional>,
    pub timeout: Option<Duration>,
    pub validate_status: Option<ValidateStatus>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the method from its name, case-insensitively.
    ///
    /// # Panics
    ///
    /// Panics if the name is not a valid HTTP method token.
    pub fn method_name(self, name: &str) -> Self {
        self.try_method_name(name).expect("invalid method name")
    }

    /// Try to set the method from its name, case-insensitively.
    ///
    /// Returns `None` if the name is not a valid HTTP method token.
    pub fn try_method_name(mut self, name: &str) -> Option<Self> {
        let method = Method::from_bytes(name.to_ascii_uppercase().as_bytes()).ok()?;
        self.method = Some(method);
        Some(self)
    }

    /// Add a flat header.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        K::Error: fmt::Debug,
        V: TryInto<HeaderValue>,
        V::Error: fmt::Debug,
    {
        let name = name.try_into().expect("invalid header name");
        let value = value.try_into().expect("invalid header value");
        self.headers.insert(name, value);
        self
    }

    /// Try to add a flat header.
    ///
    /// Returns `None` if the header name or value is invalid.
    pub fn try_header<K, V>(mut self, name: K, value: V) -> Option<Self>
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        let name = name.try_into().ok()?;
        let value = value.try_into().ok()?;
        self.headers.insert(name, value);
        Some(self)
    }

    /// Replace all headers, including namespaced ones.
    pub fn headers(mut self, headers: impl Into<ConfigHeaders>) -> Self {
        self.headers = headers.into();
        self
    }

    pub fn data(mut self, data: impl Into<Data>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Add one query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Replace all query parameters.
    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn params_serializer(mut self, serializer: ParamsSerializer) -> Self {
        self.params_serializer = Some(serializer);
        self
    }

    /// Append a request transform after the current list (the defaults when
    /// none is set).
    pub fn transform_request<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<Data>, &mut HeaderMap, &TransformContext<'_>) -> Result<Option<Data>, Error>
            + Send
            + Sync
            + 'static,
    {
        self.transform_request
            .get_or_insert_with(default_request_transforms)
            .push(Arc::new(f));
        self
    }

    /// Replace the request transforms, defaults included.
    pub fn transform_requests(mut self, transforms: Vec<RequestTransform>) -> Self {
        self.transform_request = Some(transforms);
        self
    }

    /// Append a response transform after the current list (the defaults when
    /// none is set).
    pub fn transform_response<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<Data>, &HeaderMap, &TransformContext<'_>) -> Result<Option<Data>, Error>
            + Send
            + Sync
            + 'static,
    {
        self.transform_response
            .get_or_insert_with(default_response_transforms)
            .push(Arc::new(f));
        self
    }

    /// Replace the response transforms, defaults included.
    pub fn transform_responses(mut self, transforms: Vec<ResponseTransform>) -> Self {
        self.transform_response = Some(transforms);
        self
    }

    pub fn adapter<A: Adapter + 'static>(mut self, adapter: A) -> Self {
        self.adapter = Some(Arc::new(adapter));
        self
    }

    pub fn shared_adapter(mut self, adapter: SharedAdapter) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn transitional(mut self, transitional: Transitional) -> Self {
        self.transitional = Some(transitional);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate_status<F>(mut self, f: F) -> Self
    where
        F: Fn(StatusCode) -> bool + Send + Sync + 'static,
    {
        self.validate_status = Some(Arc::new(f));
        self
    }

    /// The method, defaulting to `GET`.
    pub fn method_or_default(&self) -> Method {
        self.method.clone().unwrap_or(Method::GET)
    }

    /// The transitional options, or the built-in defaults.
    pub fn transitional_or_default(&self) -> Transitional {
        self.transitional.clone().unwrap_or_default()
    }

    /// `base_url` + `url` + serialized `params`.
    pub fn full_url(&self) -> Result<String, Error> {
        let path = build_full_path(self.base_url.as_deref(), self.url.as_deref().unwrap_or(""));
        Ok(build_url(
            &path,
            self.params.as_ref(),
            self.params_serializer.as_ref(),
        )?)
    }

    /// Whether the status counts as success. Defaults to `2xx`.
    pub fn is_valid_status(&self, status: StatusCode) -> bool {
        match &self.validate_status {
            Some(validate) => validate(status),
            None => status.is_success(),
        }
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("base_url", &self.base_url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("data", &self.data)
            .field("params", &self.params)
            .field("params_serializer", &self.params_serializer)
            .field(
                "transform_request",
                &self.transform_request.as_ref().map(Vec::len),
            )
            .field(
                "transform_response",
                &self.transform_response.as_ref().map(Vec::len),
            )
            .field("adapter", &self.adapter.is_some())
            .field("cancel_token", &self.cancel_token)
            .field("signal", &self.signal)
            .field("transitional", &self.transitional)
            .field("timeout", &self.timeout)
            .field("validate_status", &self.validate_status.is_some())
            .finish()
    }
}
