//! Request URL construction.
//!
//! A request URL is built in two steps: [`build_full_path`] joins a relative
//! `url` onto the configured base, then [`build_url`] serializes `params`
//! into the query string.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// Encodes a single query key or value.
pub type EncodeFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Serializes the whole params object into a query string (without `?`).
pub type SerializeFn = Arc<dyn Fn(&Map<String, Value>) -> String + Send + Sync>;

/// Errors from URL construction.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    /// The params object could not be serialized.
    #[error("failed to serialize params: {0}")]
    Serialize(String),
    /// The resulting URL is not valid.
    #[error("invalid url: {0}")]
    Invalid(String),
}

/// Custom query serialization.
///
/// `serialize` takes priority over `encode`. With neither set, params are
/// serialized with `serde_qs`.
#[derive(Clone, Default)]
pub struct ParamsSerializer {
    pub encode: Option<EncodeFn>,
    pub serialize: Option<SerializeFn>,
}

impl ParamsSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `f` to percent-encode each key and value.
    pub fn encode<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.encode = Some(Arc::new(f));
        self
    }

    /// Use `f` to produce the entire query string.
    pub fn serialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> String + Send + Sync + 'static,
    {
        self.serialize = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for ParamsSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamsSerializer")
            .field("encode", &self.encode.is_some())
            .field("serialize", &self.serialize.is_some())
            .finish()
    }
}

/// Whether `url` is absolute (`scheme://` or protocol-relative `//`).
pub fn is_absolute_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    let Some((scheme, _)) = url.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Join `relative` onto `base` with exactly one `/` between them.
pub fn combine_urls(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

/// Resolve `url` against `base_url` unless `url` is already absolute.
pub fn build_full_path(base_url: Option<&str>, url: &str) -> String {
    match base_url {
        Some(base) if !is_absolute_url(url) => combine_urls(base, url),
        _ => url.to_string(),
    }
}

/// Append `params` to `url` as a query string.
///
/// Any `#fragment` is dropped when a query is appended. Null params are
/// skipped at any depth, and containers left empty by that are skipped too.
/// Array elements are written as `key[]=value`.
pub fn build_url(
    url: &str,
    params: Option<&Map<String, Value>>,
    serializer: Option<&ParamsSerializer>,
) -> Result<String, UrlError> {
    let Some(params) = params else {
        return Ok(url.to_string());
    };

    let query = match serializer {
        Some(ParamsSerializer {
            serialize: Some(serialize),
            ..
        }) => serialize(params),
        Some(ParamsSerializer {
            encode: Some(encode),
            ..
        }) => encode_pairs(params, encode.as_ref()),
        _ => {
            let pruned: Map<String, Value> = params
                .iter()
                .filter_map(|(key, value)| Some((key.clone(), prune_nulls(value)?)))
                .collect();
            let query =
                serde_qs::to_string(&pruned).map_err(|e| UrlError::Serialize(e.to_string()))?;
            unindex_arrays(&query)
        }
    };

    if query.is_empty() {
        return Ok(url.to_string());
    }

    let base = match url.find('#') {
        Some(index) => &url[..index],
        None => url,
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    Ok(format!("{base}{separator}{query}"))
}

/// Drop nulls recursively. Returns `None` for a null, or for a container
/// that only held nulls.
fn prune_nulls(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Array(items) if !items.is_empty() => {
            let items: Vec<Value> = items.iter().filter_map(prune_nulls).collect();
            (!items.is_empty()).then_some(Value::Array(items))
        }
        Value::Object(map) if !map.is_empty() => {
            let map: Map<String, Value> = map
                .iter()
                .filter_map(|(key, value)| Some((key.clone(), prune_nulls(value)?)))
                .collect();
            (!map.is_empty()).then_some(Value::Object(map))
        }
        other => Some(other.clone()),
    }
}

/// Rewrite indexed array keys (`ids[0]`) to the bracket form (`ids[]`).
///
/// Only keys are touched; literal brackets in user keys and values arrive
/// percent-encoded.
fn unindex_arrays(query: &str) -> String {
    query
        .split('&')
        .map(|pair| {
            let (key, value) = match pair.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (pair, None),
            };
            let mut out = String::with_capacity(pair.len());
            let mut rest = key;
            while let Some(open) = rest.find('[') {
                out.push_str(&rest[..open]);
                let after = &rest[open + 1..];
                match after.find(']') {
                    Some(close) if close > 0 && after[..close].bytes().all(|b| b.is_ascii_digit()) => {
                        out.push_str("[]");
                        rest = &after[close + 1..];
                    }
                    _ => {
                        out.push('[');
                        rest = after;
                    }
                }
            }
            out.push_str(rest);
            if let Some(value) = value {
                out.push('=');
                out.push_str(value);
            }
            out
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_pairs(params: &Map<String, Value>, encode: &(dyn Fn(&str) -> String + Send + Sync)) -> String {
    let mut pairs = Vec::new();
    for (key, value) in params {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                let key = encode(&format!("{key}[]"));
                for item in items.iter().filter(|item| !item.is_null()) {
                    pairs.push(format!("{key}={}", encode(&scalar(item))));
                }
            }
            other => pairs.push(format!("{}={}", encode(key), encode(&scalar(other)))),
        }
    }
    pairs.join("&")
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_is_absolute_url() {
        assert!(is_absolute_url("http://example.com"));
        assert!(is_absolute_url("custom-scheme-v1.0://example.com/"));
        assert!(is_absolute_url("//example.com"));
        assert!(!is_absolute_url("/users"));
        assert!(!is_absolute_url("123://example.com"));
        assert!(!is_absolute_url("!valid://example.com"));
    }

    #[test]
    fn test_build_full_path() {
        assert_eq!(build_full_path(Some("http://h/"), "/p"), "http://h/p");
        assert_eq!(build_full_path(Some("http://h"), "p"), "http://h/p");
        assert_eq!(build_full_path(Some("http://h"), "http://other/p"), "http://other/p");
        assert_eq!(build_full_path(None, "/p"), "/p");
        assert_eq!(build_full_path(Some("http://h/api"), ""), "http://h/api");
    }

    #[test]
    fn test_build_url_appends_query() {
        let p = params(json!({"a": 1}));
        assert_eq!(build_url("http://h/p", Some(&p), None).unwrap(), "http://h/p?a=1");
        assert_eq!(build_url("http://h/p?x=y", Some(&p), None).unwrap(), "http://h/p?x=y&a=1");
    }

    #[test]
    fn test_build_url_drops_fragment_and_nulls() {
        let p = params(json!({"a": "b", "skip": null}));
        assert_eq!(build_url("/p#frag", Some(&p), None).unwrap(), "/p?a=b");

        let only_null = params(json!({"skip": null}));
        assert_eq!(build_url("/p#frag", Some(&only_null), None).unwrap(), "/p#frag");
    }

    #[test]
    fn test_build_url_prunes_nested_nulls() {
        let p = params(json!({"ids": [1, null, 2], "n": {"x": null}}));
        assert_eq!(build_url("/p", Some(&p), None).unwrap(), "/p?ids[]=1&ids[]=2");

        let p = params(json!({"n": {"x": null, "y": 1}}));
        assert_eq!(build_url("/p", Some(&p), None).unwrap(), "/p?n[y]=1");
    }

    #[test]
    fn test_default_and_encode_arrays_agree() {
        let p = params(json!({"ids": [1, 2]}));
        let encoded = ParamsSerializer::new().encode(|s| s.to_string());
        assert_eq!(build_url("/p", Some(&p), None).unwrap(), "/p?ids[]=1&ids[]=2");
        assert_eq!(
            build_url("/p", Some(&p), Some(&encoded)).unwrap(),
            "/p?ids[]=1&ids[]=2"
        );
    }

    #[test]
    fn test_unindex_arrays_keeps_values() {
        assert_eq!(unindex_arrays("a[0]=x&b[k][1]=y&c=[2]"), "a[]=x&b[k][]=y&c=[2]");
        assert_eq!(unindex_arrays("a[x]=1"), "a[x]=1");
    }

    #[test]
    fn test_custom_serialize_wins_over_encode() {
        let p = params(json!({"a": 1}));
        let serializer = ParamsSerializer::new()
            .encode(|s| s.to_uppercase())
            .serialize(|_| "custom=1".to_string());
        assert_eq!(build_url("/p", Some(&p), Some(&serializer)).unwrap(), "/p?custom=1");
    }

    #[test]
    fn test_custom_encode_expands_arrays() {
        let p = params(json!({"ids": [1, 2], "q": "x y"}));
        let serializer = ParamsSerializer::new().encode(|s| s.replace(' ', "+"));
        assert_eq!(
            build_url("/p", Some(&p), Some(&serializer)).unwrap(),
            "/p?ids[]=1&ids[]=2&q=x+y"
        );
    }
}
