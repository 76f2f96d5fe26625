//! Hyper-based HTTP adapter.
//!
//! This module provides [`HyperAdapter`], the default adapter, built on
//! hyper_util's legacy client with a rustls HTTPS connector.

use std::future::pending;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::Uri;
use http::response::Parts;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls::ClientConfig;
use tokio_util::sync::CancellationToken;

use courier_core::Data;

use super::Adapter;
use crate::cancel::{CancelToken, CanceledError};
use crate::config::RequestConfig;
use crate::error::{AdapterError, AdapterErrorKind, Error};
use crate::response::{RequestHandle, Response};

type HyperClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// HTTP adapter using hyper_util's legacy client.
///
/// Supports HTTP/1.1 and HTTP/2 over plain TCP or TLS, with connection
/// pooling and ALPN negotiation. Honors `timeout`, `cancel_token`, `signal`
/// and `validate_status` from the request configuration.
///
/// # Example
///
/// ```ignore
/// use courier_client::{Client, HyperAdapter};
/// use std::time::Duration;
///
/// let adapter = HyperAdapter::builder()
///     .pool_idle_timeout(Duration::from_secs(30))
///     .build();
///
/// let client = Client::builder().adapter(adapter).build();
/// ```
#[derive(Clone)]
pub struct HyperAdapter {
    client: HyperClient,
    http2_only: bool,
}

impl std::fmt::Debug for HyperAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperAdapter")
            .field("http2_only", &self.http2_only)
            .finish_non_exhaustive()
    }
}

impl HyperAdapter {
    pub fn builder() -> HyperAdapterBuilder {
        HyperAdapterBuilder::new()
    }

    /// Create an adapter with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn is_http2_only(&self) -> bool {
        self.http2_only
    }
}

impl Default for HyperAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for HyperAdapter {
    fn send(&self, config: RequestConfig) -> BoxFuture<'static, Result<Response, Error>> {
        let client = self.client.clone();
        Box::pin(send(client, config))
    }
}

async fn send(client: HyperClient, config: RequestConfig) -> Result<Response, Error> {
    let uri: Uri = config
        .full_url()?
        .parse()
        .map_err(|e| Error::adapter(AdapterErrorKind::BadRequest, format!("invalid url: {e}")))?;
    let method = config.method_or_default();
    let body = config
        .data
        .as_ref()
        .map(Data::to_bytes)
        .transpose()
        .map_err(|e| Error::adapter(AdapterErrorKind::BadRequest, e.to_string()))?
        .unwrap_or_default();

    let mut request = http::Request::builder()
        .method(method.clone())
        .uri(uri.clone())
        .body(Full::new(body))
        .map_err(|e| Error::adapter(AdapterErrorKind::BadRequest, e.to_string()))?;
    *request.headers_mut() = config.headers.flat().clone();

    let handle = RequestHandle {
        method: method.clone(),
        uri,
    };

    tracing::debug!(%method, uri = %handle.uri, "sending request");

    let exchange = async {
        let response = client.request(request).await.map_err(|e| {
            Error::adapter(AdapterErrorKind::Network, format!("request failed: {e}"))
        })?;
        read_body(response).await
    };

    let timed = async {
        match config.timeout {
            Some(timeout) if !timeout.is_zero() => {
                match tokio::time::timeout(timeout, exchange).await {
                    Ok(result) => result,
                    Err(_) => Err(timeout_error(&config, timeout)),
                }
            }
            _ => exchange.await,
        }
    };

    let (parts, bytes) = tokio::select! {
        biased;
        reason = wait_cancelled(config.cancel_token.clone(), config.signal.clone()) => {
            let reason = match reason {
                Some(reason) => reason,
                None => CanceledError::new(None)
                    .with_config(config.clone())
                    .with_request(handle.clone()),
            };
            return Err(Error::Canceled(reason));
        }
        result = timed => result?,
    };

    let status = parts.status;
    let mut response = Response::new(status, config)
        .with_headers(parts.headers)
        .with_data(bytes);
    response.request = Some(handle);

    if !response.config.is_valid_status(status) {
        let message = format!("Request failed with status code {}", status.as_u16());
        let kind = if status.is_client_error() {
            AdapterErrorKind::BadRequest
        } else {
            AdapterErrorKind::BadStatus
        };
        return Err(AdapterError::new(kind, message).with_response(response).into());
    }

    Ok(response)
}

/// Buffer the whole response body.
async fn read_body(response: http::Response<Incoming>) -> Result<(Parts, Bytes), Error> {
    let (parts, body) = response.into_parts();
    let bytes = body
        .collect()
        .await
        .map_err(|e| Error::adapter(AdapterErrorKind::Network, format!("failed to read body: {e}")))?
        .to_bytes();
    Ok((parts, bytes))
}

/// Resolves when either source cancels.
///
/// Yields the token's reason, or `None` when the abort signal fired.
async fn wait_cancelled(
    token: Option<CancelToken>,
    signal: Option<CancellationToken>,
) -> Option<CanceledError> {
    let from_token = async {
        match &token {
            Some(token) => token.cancelled().await,
            None => pending().await,
        }
    };
    let from_signal = async {
        match &signal {
            Some(signal) => signal.cancelled().await,
            None => pending().await,
        }
    };
    tokio::select! {
        reason = from_token => Some(reason),
        _ = from_signal => None,
    }
}

fn timeout_error(config: &RequestConfig, timeout: Duration) -> Error {
    let kind = if config.transitional_or_default().is_clarify_timeout_error() {
        AdapterErrorKind::TimedOut
    } else {
        AdapterErrorKind::ConnectionAborted
    };
    Error::adapter(kind, format!("timeout of {}ms exceeded", timeout.as_millis()))
}

/// Builder for [`HyperAdapter`].
pub struct HyperAdapterBuilder {
    /// Custom TLS configuration. Defaults to the bundled webpki roots.
    tls_config: Option<ClientConfig>,
    http2_only: bool,
    pool_idle_timeout: Option<Duration>,
    pool_max_idle_per_host: usize,
}

impl Default for HyperAdapterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperAdapterBuilder {
    pub fn new() -> Self {
        Self {
            tls_config: None,
            http2_only: false,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }

    /// Use a custom TLS configuration (custom roots, client certificates).
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Speak HTTP/2 without the HTTP/1.1 upgrade (h2c, or servers known to be
    /// HTTP/2 only).
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// Close pooled connections idle for longer than `timeout`.
    ///
    /// Default: 90 seconds.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Never close pooled connections for inactivity.
    pub fn pool_idle_timeout_none(mut self) -> Self {
        self.pool_idle_timeout = None;
        self
    }

    /// Default: 32.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    pub fn build(self) -> HyperAdapter {
        let connector = match self.tls_config {
            Some(config) => HttpsConnectorBuilder::new().with_tls_config(config),
            None => HttpsConnectorBuilder::new().with_webpki_roots(),
        }
        .https_or_http()
        .enable_all_versions()
        .build();

        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_timer(TokioTimer::new());
        if let Some(timeout) = self.pool_idle_timeout {
            builder.pool_idle_timeout(timeout);
        }
        builder.pool_max_idle_per_host(self.pool_max_idle_per_host);
        if self.http2_only {
            builder.http2_only(true);
        }

        HyperAdapter {
            client: builder.build(connector),
            http2_only: self.http2_only,
        }
    }
}

impl std::fmt::Debug for HyperAdapterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperAdapterBuilder")
            .field("tls_config", &self.tls_config.is_some())
            .field("http2_only", &self.http2_only)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = HyperAdapterBuilder::new();
        assert!(!builder.http2_only);
        assert_eq!(builder.pool_max_idle_per_host, 32);
        assert_eq!(builder.pool_idle_timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_builder_pool_settings() {
        let builder = HyperAdapterBuilder::new()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(4)
            .http2_only(true);
        assert_eq!(builder.pool_idle_timeout, Some(Duration::from_secs(60)));
        assert_eq!(builder.pool_max_idle_per_host, 4);
        assert!(builder.build().is_http2_only());
    }

    #[test]
    fn test_timeout_error_kind() {
        let config = RequestConfig::new();
        let err = timeout_error(&config, Duration::from_millis(50));
        assert_eq!(err.kind(), Some(AdapterErrorKind::ConnectionAborted));
        assert!(err.to_string().contains("timeout of 50ms exceeded"));

        let config = RequestConfig::new()
            .transitional(courier_core::Transitional::new().clarify_timeout_error(true));
        let err = timeout_error(&config, Duration::from_millis(50));
        assert_eq!(err.kind(), Some(AdapterErrorKind::TimedOut));
    }

    #[tokio::test]
    async fn test_invalid_url_is_bad_request() {
        let adapter = HyperAdapter::new();
        let err = adapter
            .send(RequestConfig::new().url("http://exa mple.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(AdapterErrorKind::BadRequest));
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_aborts() {
        let source = CancelToken::source();
        source.cancel.cancel("gone");
        let adapter = HyperAdapter::new();
        let err = adapter
            .send(
                RequestConfig::new()
                    .url("http://127.0.0.1:9/")
                    .cancel_token(source.token.clone()),
            )
            .await
            .unwrap_err();
        assert!(err.is_cancel());
        assert_eq!(err.to_string(), "gone");
    }
}
