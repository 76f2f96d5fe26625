//! Request dispatch: chain planning and execution.
//!
//! A call is planned once into a [`DispatchChain`] from a snapshot of the
//! client's interceptors, then executed by the runner for its strategy.
//!
//! - Request interceptors run in reverse registration order, response
//!   interceptors in registration order.
//! - When every participating request interceptor is synchronous, the chain
//!   is [`DispatchChain::Sync`]: request hooks and the adapter call run
//!   eagerly, before the caller receives the future.
//! - Otherwise it is [`DispatchChain::Async`]: nothing runs until the
//!   future is polled, and each step runs in its own scheduler turn.

use std::collections::VecDeque;
use std::future::ready;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::adapter::SharedAdapter;
use crate::config::RequestConfig;
use crate::error::Error;
use crate::interceptor::{Fulfilled, Interceptor, Interceptors, Rejected};
use crate::response::Response;

mod transform;

pub use transform::dispatch_request;

/// Future returned by [`Client::request`](crate::Client::request).
pub type ResponseFuture = BoxFuture<'static, Result<Response, Error>>;

type SyncFn<T> = Arc<dyn Fn(T) -> Result<T, Error> + Send + Sync>;

/// One planned step: a success handler and an error handler.
pub(crate) struct HookPair<T> {
    fulfilled: Option<Fulfilled<T>>,
    rejected: Option<Rejected<T>>,
}

impl<T> From<&Interceptor<T>> for HookPair<T> {
    fn from(interceptor: &Interceptor<T>) -> Self {
        Self {
            fulfilled: interceptor.fulfilled.clone(),
            rejected: interceptor.rejected.clone(),
        }
    }
}

/// A request hook known not to suspend.
pub(crate) struct SyncHook {
    fulfilled: Option<SyncFn<RequestConfig>>,
    rejected: Option<Rejected<RequestConfig>>,
}

/// The planned execution of one call.
pub(crate) enum DispatchChain {
    Sync {
        request: Vec<SyncHook>,
        response: Vec<HookPair<Response>>,
    },
    Async {
        request: Vec<HookPair<RequestConfig>>,
        response: Vec<HookPair<Response>>,
    },
}

impl DispatchChain {
    /// Snapshot `interceptors` for a call with `config`.
    pub(crate) fn plan(interceptors: &Interceptors, config: &RequestConfig) -> Self {
        let mut request = VecDeque::new();
        let mut synchronous = true;
        let mut skipped = 0usize;
        interceptors.request.for_each(|_, interceptor| {
            if !interceptor.should_run(config) {
                skipped += 1;
                return;
            }
            synchronous = synchronous && interceptor.is_synchronous();
            request.push_front(HookPair::from(interceptor));
        });

        let mut response = Vec::new();
        interceptors
            .response
            .for_each(|_, interceptor| response.push(HookPair::from(interceptor)));

        tracing::debug!(
            request_hooks = request.len(),
            response_hooks = response.len(),
            skipped,
            synchronous,
            "planned dispatch chain"
        );

        if synchronous {
            let request = request
                .into_iter()
                .map(|pair| SyncHook {
                    fulfilled: match pair.fulfilled {
                        Some(Fulfilled::Sync(f)) => Some(f),
                        _ => None,
                    },
                    rejected: pair.rejected,
                })
                .collect();
            DispatchChain::Sync { request, response }
        } else {
            DispatchChain::Async {
                request: request.into(),
                response,
            }
        }
    }

    pub(crate) fn is_sync(&self) -> bool {
        matches!(self, DispatchChain::Sync { .. })
    }

    /// Execute the chain. `fallback` is used when the config names no adapter.
    pub(crate) fn run(self, config: RequestConfig, fallback: Option<SharedAdapter>) -> ResponseFuture {
        match self {
            DispatchChain::Sync { request, response } => run_sync(request, response, config, fallback),
            DispatchChain::Async { request, response } => run_async(request, response, config, fallback),
        }
    }
}

/// Plans and runs calls against a set of interceptors.
pub struct RequestDispatcher<'a> {
    interceptors: &'a Interceptors,
    fallback: Option<SharedAdapter>,
}

impl<'a> RequestDispatcher<'a> {
    pub fn new(interceptors: &'a Interceptors, fallback: Option<SharedAdapter>) -> Self {
        Self {
            interceptors,
            fallback,
        }
    }

    /// Dispatch a fully merged and normalized config.
    pub fn dispatch(&self, config: RequestConfig) -> ResponseFuture {
        DispatchChain::plan(self.interceptors, &config).run(config, self.fallback.clone())
    }
}

async fn settle<T>(hook: &HookPair<T>, state: Result<T, Error>) -> Result<T, Error> {
    match state {
        Ok(value) => match &hook.fulfilled {
            Some(Fulfilled::Sync(f)) => f(value),
            Some(Fulfilled::Async(f)) => f(value).await,
            None => Ok(value),
        },
        Err(err) => match &hook.rejected {
            Some(rejected) => rejected(err),
            None => Err(err),
        },
    }
}

fn run_async(
    request: Vec<HookPair<RequestConfig>>,
    response: Vec<HookPair<Response>>,
    config: RequestConfig,
    fallback: Option<SharedAdapter>,
) -> ResponseFuture {
    Box::pin(async move {
        let mut state = Ok(config);
        for hook in &request {
            tokio::task::yield_now().await;
            state = settle(hook, state).await;
        }

        tokio::task::yield_now().await;
        let mut result = match state {
            Ok(config) => match dispatch_request(config, fallback) {
                Ok(pending) => pending.await,
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };

        for hook in &response {
            tokio::task::yield_now().await;
            result = settle(hook, result).await;
        }
        result
    })
}

fn run_sync(
    request: Vec<SyncHook>,
    response: Vec<HookPair<Response>>,
    mut config: RequestConfig,
    fallback: Option<SharedAdapter>,
) -> ResponseFuture {
    for hook in &request {
        let Some(fulfilled) = &hook.fulfilled else {
            continue;
        };
        match fulfilled(config) {
            Ok(next) => config = next,
            Err(err) => match &hook.rejected {
                Some(rejected) => match rejected(err) {
                    Ok(recovered) => {
                        config = recovered;
                        break;
                    }
                    Err(err) => return Box::pin(ready(Err(err))),
                },
                None => return Box::pin(ready(Err(err))),
            },
        }
    }

    let pending = match dispatch_request(config, fallback) {
        Ok(pending) => pending,
        Err(err) => return Box::pin(ready(Err(err))),
    };

    Box::pin(async move {
        let mut result = pending.await;
        for hook in &response {
            result = settle(hook, result).await;
        }
        result
    })
}
