//! Interceptor registry.
//!
//! An [`InterceptorManager`] holds the hooks for one phase of a request
//! (request or response). Registering returns an [`InterceptorId`] that stays
//! valid until the hook is ejected; ejecting leaves a tombstone so no other
//! id shifts.
//!
//! ```ignore
//! use courier_client::{Client, Interceptor};
//!
//! let client = Client::new();
//! let id = client.interceptors().request.add(Interceptor::sync(|config| {
//!     Ok(config.header("authorization", "Bearer token"))
//! }).synchronous(true));
//!
//! client.interceptors().request.eject(id);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::BoxFuture;

use crate::config::RequestConfig;
use crate::error::Error;
use crate::response::Response;

/// Future returned by an asynchronous hook.
pub type HookFuture<T> = BoxFuture<'static, Result<T, Error>>;

/// The success-path handler of an interceptor.
pub enum Fulfilled<T> {
    /// Runs to completion without suspending.
    Sync(Arc<dyn Fn(T) -> Result<T, Error> + Send + Sync>),
    /// Returns a future.
    Async(Arc<dyn Fn(T) -> HookFuture<T> + Send + Sync>),
}

impl<T> Clone for Fulfilled<T> {
    fn clone(&self) -> Self {
        match self {
            Fulfilled::Sync(f) => Fulfilled::Sync(f.clone()),
            Fulfilled::Async(f) => Fulfilled::Async(f.clone()),
        }
    }
}

/// The error-path handler of an interceptor. Returning `Ok` recovers.
pub type Rejected<T> = Arc<dyn Fn(Error) -> Result<T, Error> + Send + Sync>;

/// Predicate deciding whether a request hook participates in a call.
pub type RunWhen = Arc<dyn Fn(&RequestConfig) -> bool + Send + Sync>;

/// A registered hook.
pub struct Interceptor<T> {
    pub(crate) fulfilled: Option<Fulfilled<T>>,
    pub(crate) rejected: Option<Rejected<T>>,
    pub(crate) synchronous: bool,
    pub(crate) run_when: Option<RunWhen>,
}

impl<T> Clone for Interceptor<T> {
    fn clone(&self) -> Self {
        Self {
            fulfilled: self.fulfilled.clone(),
            rejected: self.rejected.clone(),
            synchronous: self.synchronous,
            run_when: self.run_when.clone(),
        }
    }
}

impl<T> fmt::Debug for Interceptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fulfilled = match &self.fulfilled {
            Some(Fulfilled::Sync(_)) => "sync",
            Some(Fulfilled::Async(_)) => "async",
            None => "none",
        };
        f.debug_struct("Interceptor")
            .field("fulfilled", &fulfilled)
            .field("rejected", &self.rejected.is_some())
            .field("synchronous", &self.synchronous)
            .field("run_when", &self.run_when.is_some())
            .finish()
    }
}

impl<T: Send + 'static> Interceptor<T> {
    /// An interceptor with an asynchronous success handler.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        Self::with_fulfilled(Some(Fulfilled::Async(Arc::new(move |value| {
            Box::pin(f(value)) as HookFuture<T>
        }))))
    }

    /// An interceptor with a synchronous success handler.
    ///
    /// It still counts as asynchronous for dispatch unless marked with
    /// [`synchronous(true)`](Self::synchronous).
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(T) -> Result<T, Error> + Send + Sync + 'static,
    {
        Self::with_fulfilled(Some(Fulfilled::Sync(Arc::new(f))))
    }

    /// An interceptor with only an error handler.
    pub fn on_error<F>(f: F) -> Self
    where
        F: Fn(Error) -> Result<T, Error> + Send + Sync + 'static,
    {
        Self::with_fulfilled(None).on_rejected(f)
    }

    fn with_fulfilled(fulfilled: Option<Fulfilled<T>>) -> Self {
        Self {
            fulfilled,
            rejected: None,
            synchronous: false,
            run_when: None,
        }
    }

    /// Set the error handler.
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(Error) -> Result<T, Error> + Send + Sync + 'static,
    {
        self.rejected = Some(Arc::new(f));
        self
    }

    /// Declare that this hook never suspends.
    ///
    /// When every participating request hook is synchronous the chain runs
    /// eagerly. Ignored for hooks built with [`Interceptor::new`].
    pub fn synchronous(mut self, synchronous: bool) -> Self {
        self.synchronous = synchronous;
        self
    }

    /// Only run this hook when `predicate` accepts the request config.
    ///
    /// Consulted for request hooks only.
    pub fn run_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RequestConfig) -> bool + Send + Sync + 'static,
    {
        self.run_when = Some(Arc::new(predicate));
        self
    }
}

impl<T> Interceptor<T> {
    /// Whether this hook may take part in an eagerly-run chain.
    pub fn is_synchronous(&self) -> bool {
        self.synchronous && !matches!(self.fulfilled, Some(Fulfilled::Async(_)))
    }

    pub(crate) fn should_run(&self, config: &RequestConfig) -> bool {
        self.run_when.as_ref().is_none_or(|predicate| predicate(config))
    }
}

/// Handle returned by [`InterceptorManager::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterceptorId(usize);

impl InterceptorId {
    pub fn index(&self) -> usize {
        self.0
    }
}

enum Slot<T> {
    Occupied(Interceptor<T>),
    Vacant,
}

/// Ordered, shareable registry of interceptors for one phase.
pub struct InterceptorManager<T> {
    slots: RwLock<Vec<Slot<T>>>,
}

impl<T> Default for InterceptorManager<T> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }
}

impl<T> fmt::Debug for InterceptorManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.read();
        f.debug_struct("InterceptorManager")
            .field("slots", &slots.len())
            .field(
                "live",
                &slots.iter().filter(|s| matches!(s, Slot::Occupied(_))).count(),
            )
            .finish()
    }
}

impl<T> InterceptorManager<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interceptor after all existing ones.
    pub fn add(&self, interceptor: Interceptor<T>) -> InterceptorId {
        let mut slots = self.write();
        slots.push(Slot::Occupied(interceptor));
        InterceptorId(slots.len() - 1)
    }

    /// Remove an interceptor, leaving its slot empty.
    ///
    /// Returns `false` if `id` is unknown or already ejected.
    pub fn eject(&self, id: InterceptorId) -> bool {
        let mut slots = self.write();
        match slots.get_mut(id.0) {
            Some(slot @ Slot::Occupied(_)) => {
                *slot = Slot::Vacant;
                true
            }
            _ => false,
        }
    }

    /// Remove every interceptor. Ids start from zero again.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Visit live interceptors in registration order.
    ///
    /// `f` sees a snapshot taken before the first call, so it may add or
    /// eject on this manager; those changes show up on the next visit.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(InterceptorId, &Interceptor<T>),
    {
        let live: Vec<(InterceptorId, Interceptor<T>)> = self
            .read()
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied(interceptor) => Some((InterceptorId(index), interceptor.clone())),
                Slot::Vacant => None,
            })
            .collect();
        for (id, interceptor) in &live {
            f(*id, interceptor);
        }
    }

    /// Number of live interceptors.
    pub fn len(&self) -> usize {
        self.read()
            .iter()
            .filter(|slot| matches!(slot, Slot::Occupied(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Slot<T>>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Slot<T>>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The request and response interceptor registries of a client.
#[derive(Debug, Default)]
pub struct Interceptors {
    pub request: InterceptorManager<RequestConfig>,
    pub response: InterceptorManager<Response>,
}
