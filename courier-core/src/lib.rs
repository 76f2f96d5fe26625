//! Core request-shaping types for courier.
//!
//! This crate provides the pieces shared by the `courier-client` pipeline and
//! by transport adapters. None of it performs I/O.
//!
//! ## Modules
//!
//! - [`data`]: Request and response payloads
//! - [`headers`]: Namespaced configuration headers and flattening
//! - [`url`]: Full-path resolution and query-string serialization
//! - [`validate`]: Transitional option bag and option validation

pub mod data;
pub mod headers;
pub mod url;
pub mod validate;

pub use data::Data;
pub use headers::ConfigHeaders;
pub use url::{ParamsSerializer, UrlError, build_full_path, build_url, is_absolute_url};
pub use validate::{Transitional, ValidationError, ValidationMode, validate_transitional};
