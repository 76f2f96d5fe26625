//! Cooperative cancellation.
//!
//! A [`CancelToken`] is a cloneable handle on a write-once cancellation
//! reason. The matching [`Canceler`] sets the reason; the first call wins and
//! later calls are no-ops. Interested parties either register a callback with
//! [`CancelToken::subscribe`] or await a [`Cancellation`] future obtained from
//! [`CancelToken::cancelled`].
//!
//! ```ignore
//! use courier_client::{CancelToken, RequestConfig};
//!
//! let source = CancelToken::source();
//! let call = client.get("/slow", RequestConfig::new().cancel_token(source.token.clone()));
//! source.cancel.cancel("user navigated away");
//! assert!(call.await.unwrap_err().is_cancel());
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::config::RequestConfig;
use crate::response::RequestHandle;

/// The reason a request was cancelled.
///
/// Displays as its message, or `"canceled"` when none was given.
#[derive(Clone, Debug, Default, thiserror::Error)]
#[error("{}", .message.as_deref().unwrap_or("canceled"))]
pub struct CanceledError {
    pub message: Option<String>,
    /// Configuration of the request that observed the cancellation.
    pub config: Option<Box<RequestConfig>>,
    pub request: Option<RequestHandle>,
}

impl CanceledError {
    pub fn new(message: Option<String>) -> Self {
        Self {
            message,
            config: None,
            request: None,
        }
    }

    /// Attach the configuration of the observing request.
    ///
    /// The stored copy drops its own cancel token so that the reason never
    /// holds a handle on the token it is stored in.
    pub fn with_config(mut self, mut config: RequestConfig) -> Self {
        config.cancel_token = None;
        self.config = Some(Box::new(config));
        self
    }

    pub fn with_request(mut self, request: RequestHandle) -> Self {
        self.request = Some(request);
        self
    }
}

/// Identifies a pending cancellation listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnOnce(&CanceledError) + Send>;

#[derive(Default)]
struct State {
    reason: Option<CanceledError>,
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

/// A cloneable handle on a cancellation channel.
#[derive(Clone, Default)]
pub struct CancelToken {
    state: Arc<Mutex<State>>,
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("CancelToken")
            .field("reason", &state.reason.as_ref().map(ToString::to_string))
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl CancelToken {
    /// Create a token, handing its [`Canceler`] to `executor` immediately.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Canceler),
    {
        let token = Self::default();
        executor(Canceler {
            token: token.clone(),
        });
        token
    }

    /// Create a token together with its canceler.
    pub fn source() -> CancelTokenSource {
        let token = Self::default();
        let cancel = Canceler {
            token: token.clone(),
        };
        CancelTokenSource { token, cancel }
    }

    /// The cancellation reason, once set.
    pub fn reason(&self) -> Option<CanceledError> {
        self.lock().reason.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().reason.is_some()
    }

    /// Fail with the reason if cancellation has been requested.
    pub fn throw_if_requested(&self) -> Result<(), CanceledError> {
        match self.reason() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    /// Register `listener` to run once with the cancellation reason.
    ///
    /// If the token is already cancelled the listener runs immediately, on
    /// this thread, and the returned id is not pending.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: FnOnce(&CanceledError) + Send + 'static,
    {
        let mut state = self.lock();
        let id = ListenerId(state.next_id);
        state.next_id += 1;
        match state.reason.clone() {
            Some(reason) => {
                drop(state);
                listener(&reason);
            }
            None => state.listeners.push((id, Box::new(listener))),
        }
        id
    }

    /// Remove a pending listener. No-op if it already ran or was removed.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.lock().listeners.retain(|(listener, _)| *listener != id);
    }

    /// A future resolving to the cancellation reason.
    ///
    /// Every call subscribes its own listener, so detaching one
    /// [`Cancellation`] never affects another.
    pub fn cancelled(&self) -> Cancellation {
        let (tx, rx) = oneshot::channel();
        let id = self.subscribe(move |reason| {
            let _ = tx.send(reason.clone());
        });
        Cancellation {
            token: self.clone(),
            id,
            rx: Some(rx),
        }
    }

    fn cancel(&self, reason: CanceledError) -> bool {
        let listeners = {
            let mut state = self.lock();
            if state.reason.is_some() {
                return false;
            }
            state.reason = Some(reason.clone());
            std::mem::take(&mut state.listeners)
        };

        tracing::debug!(
            message = %reason,
            listeners = listeners.len(),
            "request cancelled"
        );

        for (_, listener) in listeners.into_iter().rev() {
            listener(&reason);
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sets the reason on its [`CancelToken`].
#[derive(Clone, Debug)]
pub struct Canceler {
    token: CancelToken,
}

impl Canceler {
    /// Cancel with a message.
    ///
    /// Returns `false` if the token was already cancelled.
    pub fn cancel<S: Into<String>>(&self, message: S) -> bool {
        self.token.cancel(CanceledError::new(Some(message.into())))
    }

    /// Cancel with full context.
    pub fn cancel_with(
        &self,
        message: Option<String>,
        config: Option<RequestConfig>,
        request: Option<RequestHandle>,
    ) -> bool {
        let mut reason = CanceledError::new(message);
        if let Some(config) = config {
            reason = reason.with_config(config);
        }
        reason.request = request;
        self.token.cancel(reason)
    }
}

/// A token paired with its canceler.
#[derive(Clone, Debug)]
pub struct CancelTokenSource {
    pub token: CancelToken,
    pub cancel: Canceler,
}

/// Future returned by [`CancelToken::cancelled`].
///
/// Detaching it, explicitly or by dropping, removes only its own listener.
/// A detached `Cancellation` never resolves.
pub struct Cancellation {
    token: CancelToken,
    id: ListenerId,
    rx: Option<oneshot::Receiver<CanceledError>>,
}

impl Cancellation {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Detach this listener from the token.
    pub fn unsubscribe(&mut self) {
        self.token.unsubscribe(self.id);
        self.rx = None;
    }
}

impl fmt::Debug for Cancellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancellation")
            .field("id", &self.id)
            .field("attached", &self.rx.is_some())
            .finish()
    }
}

impl Future for Cancellation {
    type Output = CanceledError;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Pending;
        };
        match Pin::new(rx).poll(cx) {
            Poll::Ready(Ok(reason)) => {
                self.rx = None;
                Poll::Ready(reason)
            }
            Poll::Ready(Err(_)) => {
                self.rx = None;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Cancellation {
    fn drop(&mut self) {
        if self.rx.is_some() {
            self.token.unsubscribe(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_executor_runs_immediately() {
        let mut captured = None;
        let token = CancelToken::new(|cancel| captured = Some(cancel));
        let cancel = captured.unwrap();

        assert!(!token.is_cancelled());
        assert!(cancel.cancel("stop"));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_first_cancel_wins() {
        let source = CancelToken::source();
        let order = Arc::new(Mutex::new(Vec::new()));

        for name in ["a", "b", "c"] {
            let order = order.clone();
            source.token.subscribe(move |reason| {
                order.lock().unwrap().push((name, reason.to_string()));
            });
        }

        assert!(source.cancel.cancel("x"));
        assert!(!source.cancel.cancel("y"));

        assert_eq!(source.token.reason().unwrap().message.as_deref(), Some("x"));
        assert_eq!(
            *order.lock().unwrap(),
            vec![
                ("c", "x".to_string()),
                ("b", "x".to_string()),
                ("a", "x".to_string())
            ]
        );
    }

    #[test]
    fn test_throw_if_requested() {
        let source = CancelToken::source();
        assert!(source.token.throw_if_requested().is_ok());

        source.cancel.cancel_with(None, None, None);
        let err = source.token.throw_if_requested().unwrap_err();
        assert_eq!(err.to_string(), "canceled");
    }

    #[test]
    fn test_subscribe_after_cancel_fires_immediately() {
        let source = CancelToken::source();
        source.cancel.cancel("done");

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        source.token.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_listener() {
        let source = CancelToken::source();
        let hits = Arc::new(AtomicUsize::new(0));

        let first = hits.clone();
        let id = source.token.subscribe(move |_| {
            first.fetch_add(10, Ordering::SeqCst);
        });
        let second = hits.clone();
        source.token.subscribe(move |_| {
            second.fetch_add(1, Ordering::SeqCst);
        });

        source.token.unsubscribe(id);
        source.token.unsubscribe(id);
        source.cancel.cancel("x");

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_with_strips_token_from_config() {
        let source = CancelToken::source();
        let config = RequestConfig::new()
            .url("/x")
            .cancel_token(source.token.clone());

        source.cancel.cancel_with(Some("bye".into()), Some(config), None);

        let reason = source.token.reason().unwrap();
        let stored = reason.config.unwrap();
        assert_eq!(stored.url.as_deref(), Some("/x"));
        assert!(stored.cancel_token.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_with_reason() {
        let source = CancelToken::source();
        let waiter = source.token.cancelled();

        let cancel = source.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            cancel.cancel("later");
        });

        let reason = waiter.await;
        assert_eq!(reason.message.as_deref(), Some("later"));
    }

    #[tokio::test]
    async fn test_cancelled_detach_is_independent() {
        let source = CancelToken::source();
        let mut detached = source.token.cancelled();
        let attached = source.token.cancelled();

        detached.unsubscribe();
        source.cancel.cancel("x");

        assert_eq!(attached.await.to_string(), "x");
        let pending = tokio::time::timeout(Duration::from_millis(10), detached).await;
        assert!(pending.is_err());
    }

    #[test]
    fn test_dropped_cancellation_detaches() {
        let source = CancelToken::source();
        drop(source.token.cancelled());
        assert_eq!(source.token.lock().listeners.len(), 0);
    }
}
