//! Client builder.
//!
//! Provides a fluent API for configuring and building a [`Client`].

use std::sync::Arc;
use std::time::Duration;

use http::Method;
use http::header::{HeaderName, HeaderValue};

use courier_core::{Transitional, ValidationMode};

use crate::adapter::{Adapter, SharedAdapter};
use crate::client::Client;
use crate::config::RequestConfig;

/// Builder for creating a [`Client`].
///
/// # Example
///
/// ```ignore
/// use courier_client::Client;
/// use std::time::Duration;
///
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .common_header("accept", "application/json")
///     .timeout(Duration::from_secs(10))
///     .build();
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    /// Instance defaults every call is merged over.
    defaults: RequestConfig,
    /// Adapter used when a call does not name one.
    adapter: Option<SharedAdapter>,
    validation: ValidationMode,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("defaults", &self.defaults)
            .field("adapter", &self.adapter.is_some())
            .field("validation", &self.validation)
            .finish()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the instance defaults wholesale.
    pub fn defaults(mut self, defaults: RequestConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Base URL prepended to relative request URLs.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.defaults.base_url = Some(base_url.into());
        self
    }

    /// Default method when a call sets none. Falls back to `GET`.
    pub fn method(mut self, method: Method) -> Self {
        self.defaults.method = Some(method);
        self
    }

    /// Add a flat default header.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        K::Error: std::fmt::Debug,
        V: TryInto<HeaderValue>,
        V::Error: std::fmt::Debug,
    {
        self.defaults = self.defaults.header(name, value);
        self
    }

    /// Add a default header sent with every method.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn common_header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        K::Error: std::fmt::Debug,
        V: TryInto<HeaderValue>,
        V::Error: std::fmt::Debug,
    {
        let name = name.try_into().expect("invalid header name");
        let value = value.try_into().expect("invalid header value");
        self.defaults.headers.common_mut().insert(name, value);
        self
    }

    /// Add a default header sent only with `method`.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn method_header<K, V>(mut self, method: Method, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        K::Error: std::fmt::Debug,
        V: TryInto<HeaderValue>,
        V::Error: std::fmt::Debug,
    {
        let name = name.try_into().expect("invalid header name");
        let value = value.try_into().expect("invalid header value");
        self.defaults.headers.method_mut(method).insert(name, value);
        self
    }

    /// Default timeout for calls.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.defaults.timeout = Some(timeout);
        self
    }

    pub fn transitional(mut self, transitional: Transitional) -> Self {
        self.defaults.transitional = Some(transitional);
        self
    }

    /// Adapter used when a call does not name one.
    ///
    /// Without it, the process-wide default adapter is used.
    pub fn adapter<A: Adapter + 'static>(mut self, adapter: A) -> Self {
        self.adapter = Some(Arc::new(adapter));
        self
    }

    pub fn shared_adapter(mut self, adapter: SharedAdapter) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Fail calls with invalid options instead of dropping them with a
    /// warning.
    pub fn strict_validation(mut self, strict: bool) -> Self {
        self.validation = if strict {
            ValidationMode::Strict
        } else {
            ValidationMode::Lenient
        };
        self
    }

    pub fn build(self) -> Client {
        Client::from_parts(self.defaults, self.adapter, self.validation)
    }
}
