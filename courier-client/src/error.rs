//! Client error types.
//!
//! This module provides [`Error`], the error type threaded through interceptor
//! chains, transforms and adapters.

use std::fmt;

use courier_core::{UrlError, ValidationError};

use crate::cancel::CanceledError;
use crate::response::Response;

/// Classification of an adapter failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdapterErrorKind {
    /// The request never produced a response (connection refused, DNS, reset).
    Network,
    /// The configured timeout elapsed and `clarify_timeout_error` is set.
    TimedOut,
    /// The request was aborted; also used for timeouts by default.
    ConnectionAborted,
    /// A response arrived but `validate_status` rejected it.
    BadStatus,
    /// The request could not be built from the configuration.
    BadRequest,
    /// Anything else.
    Other,
}

impl AdapterErrorKind {
    /// Machine-readable error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterErrorKind::Network => "ERR_NETWORK",
            AdapterErrorKind::TimedOut => "ETIMEDOUT",
            AdapterErrorKind::ConnectionAborted => "ECONNABORTED",
            AdapterErrorKind::BadStatus => "ERR_BAD_RESPONSE",
            AdapterErrorKind::BadRequest => "ERR_BAD_REQUEST",
            AdapterErrorKind::Other => "ERR_ADAPTER",
        }
    }
}

impl fmt::Display for AdapterErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure reported by an adapter.
///
/// When the server answered but the exchange still failed (for example a
/// rejected status code), `response` carries what was received.
#[derive(Clone, Debug)]
pub struct AdapterError {
    pub kind: AdapterErrorKind,
    pub message: String,
    pub response: Option<Box<Response>>,
}

impl AdapterError {
    pub fn new<S: Into<String>>(kind: AdapterErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
            response: None,
        }
    }

    /// Attach the partial response.
    pub fn with_response(mut self, response: Response) -> Self {
        self.response = Some(Box::new(response));
        self
    }
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl std::error::Error for AdapterError {}

/// Errors produced by the request pipeline.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    /// The call was cancelled through a [`CancelToken`](crate::CancelToken)
    /// or an abort signal.
    #[error(transparent)]
    Canceled(CanceledError),

    /// Configuration failed validation.
    #[error("invalid config: {0}")]
    Validation(#[from] ValidationError),

    /// The adapter failed.
    #[error("adapter error: {0}")]
    Adapter(AdapterError),

    /// A request or response transform failed.
    #[error("transform error: {0}")]
    Transform(String),

    /// The request URL could not be built.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// An interceptor failed.
    #[error("interceptor error: {0}")]
    Interceptor(String),
}

impl Error {
    /// Create an adapter error without a response.
    pub fn adapter<S: Into<String>>(kind: AdapterErrorKind, message: S) -> Self {
        Error::Adapter(AdapterError::new(kind, message))
    }

    /// Create a transform error.
    pub fn transform<S: Into<String>>(message: S) -> Self {
        Error::Transform(message.into())
    }

    /// Create an interceptor error.
    pub fn interceptor<S: Into<String>>(message: S) -> Self {
        Error::Interceptor(message.into())
    }

    /// Whether this error represents a cancellation.
    pub fn is_cancel(&self) -> bool {
        matches!(self, Error::Canceled(_))
    }

    /// Get the cancellation reason, if this is a cancellation.
    pub fn as_canceled(&self) -> Option<&CanceledError> {
        match self {
            Error::Canceled(err) => Some(err),
            _ => None,
        }
    }

    /// Get the adapter error kind, if this is an adapter error.
    pub fn kind(&self) -> Option<AdapterErrorKind> {
        match self {
            Error::Adapter(err) => Some(err.kind),
            _ => None,
        }
    }

    /// Get the partial response carried by an adapter error.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Error::Adapter(err) => err.response.as_deref(),
            _ => None,
        }
    }

    /// Mutable access to the partial response carried by an adapter error.
    pub fn response_mut(&mut self) -> Option<&mut Response> {
        match self {
            Error::Adapter(err) => err.response.as_deref_mut(),
            _ => None,
        }
    }
}

impl From<CanceledError> for Error {
    fn from(err: CanceledError) -> Self {
        Error::Canceled(err)
    }
}

impl From<AdapterError> for Error {
    fn from(err: AdapterError) -> Self {
        Error::Adapter(err)
    }
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

/// Whether `err` represents a cancellation.
pub fn is_cancel(err: &Error) -> bool {
    err.is_cancel()
}
