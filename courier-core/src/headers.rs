//! Namespaced configuration headers.
//!
//! Configuration carries three kinds of headers: flat headers that always
//! apply, a `common` namespace applied to every method, and one namespace
//! per HTTP method. Before a request leaves the pipeline they are flattened
//! into a single [`HeaderMap`] and the namespaces are dropped.

use std::collections::HashMap;

use http::header::{CONTENT_TYPE, HeaderName};
use http::{HeaderMap, HeaderValue, Method};

/// `application/json`
pub const APPLICATION_JSON: &str = "application/json";
/// `application/x-www-form-urlencoded`
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
/// `multipart/form-data`
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Headers as they appear in request configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigHeaders {
    flat: HeaderMap,
    common: HeaderMap,
    methods: HashMap<Method, HeaderMap>,
}

impl ConfigHeaders {
    /// Create an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a flat header, replacing any previous values for the name.
    pub fn insert(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.flat.insert(name, value);
        self
    }

    /// Flat headers.
    pub fn flat(&self) -> &HeaderMap {
        &self.flat
    }

    /// Mutable flat headers.
    pub fn flat_mut(&mut self) -> &mut HeaderMap {
        &mut self.flat
    }

    /// Headers applied to every method.
    pub fn common_mut(&mut self) -> &mut HeaderMap {
        &mut self.common
    }

    /// Headers applied only to `method`.
    pub fn method_mut(&mut self, method: Method) -> &mut HeaderMap {
        self.methods.entry(method).or_default()
    }

    /// Whether no namespaced headers remain.
    pub fn is_flat(&self) -> bool {
        self.common.is_empty() && self.methods.values().all(HeaderMap::is_empty)
    }

    /// Overlay `other` onto `self`, name by name, in every namespace.
    pub fn merge(&mut self, other: &ConfigHeaders) {
        overlay(&mut self.flat, &other.flat);
        overlay(&mut self.common, &other.common);
        for (method, headers) in &other.methods {
            overlay(self.methods.entry(method.clone()).or_default(), headers);
        }
    }

    /// Collapse the namespaces for `method` into the flat headers.
    ///
    /// Precedence, lowest first: `common`, the method namespace, then the
    /// flat headers already present. All namespaces are removed afterwards,
    /// including those of other methods.
    pub fn flatten(&mut self, method: &Method) {
        if self.is_flat() {
            self.methods.clear();
            return;
        }

        let mut merged = std::mem::take(&mut self.common);
        if let Some(headers) = self.methods.remove(method) {
            overlay(&mut merged, &headers);
        }
        overlay(&mut merged, &self.flat);
        self.flat = merged;
        self.methods.clear();

        tracing::trace!(%method, count = self.flat.len(), "flattened config headers");
    }

    /// Flatten for `method` and trim every header value.
    pub fn normalize(&mut self, method: &Method) {
        self.flatten(method);
        normalize(&mut self.flat);
    }

    /// Consume the set, returning the flat headers.
    pub fn into_flat(self) -> HeaderMap {
        self.flat
    }
}

impl From<HeaderMap> for ConfigHeaders {
    fn from(flat: HeaderMap) -> Self {
        Self {
            flat,
            ..Default::default()
        }
    }
}

/// Replace every name present in `source` with its values from `source`.
pub fn overlay(target: &mut HeaderMap, source: &HeaderMap) {
    for name in source.keys() {
        target.remove(name);
        for value in source.get_all(name) {
            target.append(name.clone(), value.clone());
        }
    }
}

/// Trim surrounding whitespace from every header value.
pub fn normalize(headers: &mut HeaderMap) {
    for value in headers.values_mut() {
        let bytes = value.as_bytes();
        let trimmed = bytes.trim_ascii();
        if trimmed.len() == bytes.len() {
            continue;
        }
        if let Ok(mut replacement) = HeaderValue::from_bytes(trimmed) {
            replacement.set_sensitive(value.is_sensitive());
            *value = replacement;
        }
    }
}

/// Set `Content-Type` unless the headers already carry one.
pub fn set_content_type_if_absent(headers: &mut HeaderMap, content_type: &'static str) {
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
}

/// Whether the `Content-Type` header names a JSON media type.
pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            let essence = value.split(';').next().unwrap_or("").trim();
            essence.eq_ignore_ascii_case(APPLICATION_JSON) || essence.ends_with("+json")
        })
        .unwrap_or(false)
}
