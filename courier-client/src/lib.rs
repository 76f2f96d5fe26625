//! Interceptor-driven HTTP client for Rust.
//!
//! This crate provides a request pipeline built around three concerns:
//!
//! - an ordered, mutable chain of request and response interceptors that can
//!   be added, ejected and conditionally skipped per call
//! - cooperative cancellation through [`CancelToken`] and abort signals,
//!   checked before the adapter runs, raced while it runs, and checked again
//!   once it settles
//! - deterministic layering of per-call [`RequestConfig`] over instance
//!   defaults, including namespaced headers
//!
//! The actual exchange is delegated to an [`Adapter`]. [`HyperAdapter`] is
//! the default; any closure returning a future can stand in through
//! [`adapter_fn`].
//!
//! ## Example
//!
//! ```ignore
//! use courier_client::{Client, Interceptor, RequestConfig};
//! use serde_json::json;
//!
//! let client = Client::builder()
//!     .base_url("http://localhost:3000")
//!     .common_header("accept", "application/json")
//!     .build();
//!
//! // Request interceptors run newest first.
//! client.interceptors().request.add(
//!     Interceptor::sync(|config| Ok(config.header("authorization", "Bearer token")))
//!         .synchronous(true),
//! );
//!
//! // Response interceptors run in registration order.
//! client.interceptors().response.add(Interceptor::new(|response| async move {
//!     tracing::info!(status = %response.status, "got response");
//!     Ok(response)
//! }));
//!
//! let response = client.post("/users", json!({"name": "ada"}), None).await?;
//! let user: User = response.json()?;
//! ```
//!
//! ## Cancellation
//!
//! ```ignore
//! use courier_client::{CancelToken, RequestConfig};
//!
//! let source = CancelToken::source();
//! let call = client.get("/slow", RequestConfig::new().cancel_token(source.token.clone()));
//!
//! source.cancel.cancel("no longer needed");
//!
//! match call.await {
//!     Err(err) if err.is_cancel() => println!("cancelled: {err}"),
//!     other => println!("{other:?}"),
//! }
//! ```
//!
//! ## Dispatch strategies
//!
//! Request interceptors are asynchronous unless marked
//! [`synchronous(true)`](Interceptor::synchronous). When every request
//! interceptor taking part in a call is synchronous, they and the adapter
//! call run before [`Client::request`] returns; otherwise the chain is lazy
//! and each step runs in its own scheduler turn.

pub mod adapter;
pub mod builder;
pub mod cancel;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod interceptor;
pub mod merge;
pub mod response;
pub mod transform;

// Re-export main types at crate root
pub use adapter::{
    Adapter, Defaults, FnAdapter, HyperAdapter, HyperAdapterBuilder, SharedAdapter, adapter_fn,
    defaults, init_defaults,
};
pub use builder::ClientBuilder;
pub use cancel::{CancelToken, CancelTokenSource, CanceledError, Canceler, Cancellation, ListenerId};
pub use client::{Client, RequestInput, all};
pub use config::{RequestConfig, RequestTransform, ResponseTransform, TransformContext, ValidateStatus};
pub use dispatch::{RequestDispatcher, ResponseFuture};
pub use error::{AdapterError, AdapterErrorKind, Error, is_cancel};
pub use interceptor::{Fulfilled, Interceptor, InterceptorId, InterceptorManager, Interceptors};
pub use response::{RequestHandle, Response};

// Re-export core types for convenience
pub use courier_core::{ConfigHeaders, Data, ParamsSerializer, Transitional, ValidationError, ValidationMode};

// Re-export the abort signal type accepted by `RequestConfig::signal`
pub use tokio_util::sync::CancellationToken;
