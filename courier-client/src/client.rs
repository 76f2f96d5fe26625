//! The client: instance defaults, interceptors and the request surface.

use std::fmt;
use std::future::ready;
use std::sync::Arc;

use futures::future::try_join_all;
use http::Method;
use http::header::{CONTENT_TYPE, HeaderValue};
use tracing::Instrument;

use courier_core::headers::MULTIPART_FORM_DATA;
use courier_core::{Data, ValidationMode, validate_transitional};

use crate::adapter::SharedAdapter;
use crate::builder::ClientBuilder;
use crate::config::RequestConfig;
use crate::dispatch::{RequestDispatcher, ResponseFuture};
use crate::error::Error;
use crate::interceptor::Interceptors;
use crate::merge::merge_config;
use crate::response::Response;

/// What [`Client::request`] accepts: a URL or a full config.
#[derive(Debug)]
pub enum RequestInput {
    Url(String),
    Config(RequestConfig),
}

impl From<&str> for RequestInput {
    fn from(url: &str) -> Self {
        RequestInput::Url(url.to_string())
    }
}

impl From<String> for RequestInput {
    fn from(url: String) -> Self {
        RequestInput::Url(url)
    }
}

impl From<RequestConfig> for RequestInput {
    fn from(config: RequestConfig) -> Self {
        RequestInput::Config(config)
    }
}

struct ClientInner {
    defaults: RequestConfig,
    interceptors: Interceptors,
    adapter: Option<SharedAdapter>,
    validation: ValidationMode,
}

/// An HTTP client with its own defaults and interceptors.
///
/// Cloning is cheap and clones share defaults and interceptors.
///
/// # Example
///
/// ```ignore
/// use courier_client::{Client, Interceptor, RequestConfig};
///
/// let client = Client::builder().base_url("http://localhost:3000").build();
///
/// client.interceptors().request.add(
///     Interceptor::sync(|config| Ok(config.header("x-trace", "1"))).synchronous(true),
/// );
///
/// let response = client.get("/users", RequestConfig::new().param("page", 1)).await?;
/// println!("{:?}", response.data);
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("defaults", &self.inner.defaults)
            .field("interceptors", &self.inner.interceptors)
            .field("adapter", &self.inner.adapter.is_some())
            .field("validation", &self.inner.validation)
            .finish()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a client with empty defaults.
    pub fn new() -> Self {
        ClientBuilder::new().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(
        defaults: RequestConfig,
        adapter: Option<SharedAdapter>,
        validation: ValidationMode,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                defaults,
                interceptors: Interceptors::default(),
                adapter,
                validation,
            }),
        }
    }

    /// Derive a client whose defaults are this client's, overlaid with
    /// `config`.
    ///
    /// The child shares this client's adapter and validation mode but starts
    /// with no interceptors. Later changes to either client do not affect the
    /// other.
    pub fn create(&self, config: RequestConfig) -> Client {
        Client::from_parts(
            merge_config(&self.inner.defaults, config),
            self.inner.adapter.clone(),
            self.inner.validation,
        )
    }

    /// Instance defaults.
    pub fn defaults(&self) -> &RequestConfig {
        &self.inner.defaults
    }

    /// Request and response interceptor registries.
    pub fn interceptors(&self) -> &Interceptors {
        &self.inner.interceptors
    }

    /// Dispatch a request.
    ///
    /// When every participating request interceptor is synchronous, the
    /// interceptors and the adapter call run before this returns. Otherwise
    /// nothing happens until the returned future is polled.
    pub fn request(&self, input: impl Into<RequestInput>) -> ResponseFuture {
        let config = match input.into() {
            RequestInput::Url(url) => RequestConfig::new().url(url),
            RequestInput::Config(config) => config,
        };
        self.dispatch(config)
    }

    /// Dispatch `config` to `url`.
    pub fn request_with(&self, url: impl Into<String>, config: RequestConfig) -> ResponseFuture {
        self.dispatch(config.url(url))
    }

    fn dispatch(&self, config: RequestConfig) -> ResponseFuture {
        let mut config = merge_config(&self.inner.defaults, config);

        if let Some(transitional) = config.transitional.as_mut() {
            if let Err(err) = validate_transitional(transitional, self.inner.validation) {
                return Box::pin(ready(Err(Error::from(err))));
            }
        }

        let method = normalize_method(config.method.take());
        config.headers.flatten(&method);
        config.method = Some(method.clone());

        let span = tracing::info_span!(
            "http.request",
            %method,
            url = config.url.as_deref().unwrap_or_default(),
        );
        let dispatcher = RequestDispatcher::new(&self.inner.interceptors, self.inner.adapter.clone());
        let future = span.in_scope(|| dispatcher.dispatch(config));
        Box::pin(future.instrument(span))
    }

    /// The URL a config would be sent to, without sending it.
    pub fn get_uri(&self, config: RequestConfig) -> Result<String, Error> {
        merge_config(&self.inner.defaults, config).full_url()
    }

    pub fn get(&self, url: impl Into<String>, config: impl Into<Option<RequestConfig>>) -> ResponseFuture {
        self.without_data(Method::GET, url, config)
    }

    pub fn delete(&self, url: impl Into<String>, config: impl Into<Option<RequestConfig>>) -> ResponseFuture {
        self.without_data(Method::DELETE, url, config)
    }

    pub fn head(&self, url: impl Into<String>, config: impl Into<Option<RequestConfig>>) -> ResponseFuture {
        self.without_data(Method::HEAD, url, config)
    }

    pub fn options(&self, url: impl Into<String>, config: impl Into<Option<RequestConfig>>) -> ResponseFuture {
        self.without_data(Method::OPTIONS, url, config)
    }

    pub fn post(
        &self,
        url: impl Into<String>,
        data: impl Into<Data>,
        config: impl Into<Option<RequestConfig>>,
    ) -> ResponseFuture {
        self.with_data(Method::POST, url, data, config, false)
    }

    pub fn put(
        &self,
        url: impl Into<String>,
        data: impl Into<Data>,
        config: impl Into<Option<RequestConfig>>,
    ) -> ResponseFuture {
        self.with_data(Method::PUT, url, data, config, false)
    }

    pub fn patch(
        &self,
        url: impl Into<String>,
        data: impl Into<Data>,
        config: impl Into<Option<RequestConfig>>,
    ) -> ResponseFuture {
        self.with_data(Method::PATCH, url, data, config, false)
    }

    /// `POST` with `Content-Type: multipart/form-data`.
    pub fn post_form(
        &self,
        url: impl Into<String>,
        data: impl Into<Data>,
        config: impl Into<Option<RequestConfig>>,
    ) -> ResponseFuture {
        self.with_data(Method::POST, url, data, config, true)
    }

    /// `PUT` with `Content-Type: multipart/form-data`.
    pub fn put_form(
        &self,
        url: impl Into<String>,
        data: impl Into<Data>,
        config: impl Into<Option<RequestConfig>>,
    ) -> ResponseFuture {
        self.with_data(Method::PUT, url, data, config, true)
    }

    /// `PATCH` with `Content-Type: multipart/form-data`.
    pub fn patch_form(
        &self,
        url: impl Into<String>,
        data: impl Into<Data>,
        config: impl Into<Option<RequestConfig>>,
    ) -> ResponseFuture {
        self.with_data(Method::PATCH, url, data, config, true)
    }

    fn without_data(
        &self,
        method: Method,
        url: impl Into<String>,
        config: impl Into<Option<RequestConfig>>,
    ) -> ResponseFuture {
        let config: Option<RequestConfig> = config.into();
        self.dispatch(config.unwrap_or_default().method(method).url(url))
    }

    fn with_data(
        &self,
        method: Method,
        url: impl Into<String>,
        data: impl Into<Data>,
        config: impl Into<Option<RequestConfig>>,
        multipart: bool,
    ) -> ResponseFuture {
        let config: Option<RequestConfig> = config.into();
        let mut config = config.unwrap_or_default().method(method).url(url).data(data);
        if multipart {
            config
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(MULTIPART_FORM_DATA));
        }
        self.dispatch(config)
    }
}

/// Await every call, failing fast on the first error.
pub async fn all<I>(calls: I) -> Result<Vec<Response>, Error>
where
    I: IntoIterator<Item = ResponseFuture>,
{
    try_join_all(calls).await
}

/// Upper-case the method, defaulting to `GET`.
fn normalize_method(method: Option<Method>) -> Method {
    match method {
        None => Method::GET,
        Some(method) => {
            let upper = method.as_str().to_ascii_uppercase();
            if upper == method.as_str() {
                method
            } else {
                Method::from_bytes(upper.as_bytes()).unwrap_or(method)
            }
        }
    }
}
