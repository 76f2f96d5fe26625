//! Adapters perform the actual exchange.
//!
//! The pipeline treats an adapter as an opaque
//! `RequestConfig -> future<Result<Response, Error>>`. [`HyperAdapter`] is the
//! built-in implementation; tests and embedders typically supply their own
//! through [`adapter_fn`].

use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};

use futures::future::BoxFuture;

use crate::config::RequestConfig;
use crate::error::Error;
use crate::response::Response;

pub mod hyper;

pub use self::hyper::{HyperAdapter, HyperAdapterBuilder};

/// Sends a fully prepared request.
///
/// By the time `send` is called the headers are flat and normalized and the
/// request transforms have run.
pub trait Adapter: Send + Sync {
    fn send(&self, config: RequestConfig) -> BoxFuture<'static, Result<Response, Error>>;
}

/// Shared adapter handle.
pub type SharedAdapter = Arc<dyn Adapter>;

/// An [`Adapter`] backed by a closure.
///
/// The closure is invoked as soon as `send` is called; only the future it
/// returns is deferred.
#[derive(Clone)]
pub struct FnAdapter<F> {
    f: F,
}

impl<F> fmt::Debug for FnAdapter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAdapter").finish_non_exhaustive()
    }
}

impl<F, Fut> Adapter for FnAdapter<F>
where
    F: Fn(RequestConfig) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    fn send(&self, config: RequestConfig) -> BoxFuture<'static, Result<Response, Error>> {
        Box::pin((self.f)(config))
    }
}

/// Wrap a closure as an [`Adapter`].
pub fn adapter_fn<F, Fut>(f: F) -> FnAdapter<F>
where
    F: Fn(RequestConfig) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    FnAdapter { f }
}

/// Process-wide fallbacks used when neither the call nor the client
/// configures an adapter.
#[derive(Clone)]
pub struct Defaults {
    pub adapter: SharedAdapter,
}

impl fmt::Debug for Defaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defaults").finish_non_exhaustive()
    }
}

static DEFAULTS: OnceLock<Defaults> = OnceLock::new();

/// Install the process-wide defaults.
///
/// Fails, handing the value back, if defaults were already installed or
/// already lazily created by a request.
pub fn init_defaults(defaults: Defaults) -> Result<(), Defaults> {
    DEFAULTS.set(defaults)
}

/// The process-wide defaults, creating a [`HyperAdapter`] on first use.
pub fn defaults() -> &'static Defaults {
    DEFAULTS.get_or_init(|| {
        tracing::debug!("initializing default hyper adapter");
        Defaults {
            adapter: Arc::new(HyperAdapter::new()),
        }
    })
}
