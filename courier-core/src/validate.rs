//! Option validation.
//!
//! The `transitional` option bag is free-form at the edges (it can be built
//! from arbitrary JSON), so it is checked against a schema before a request
//! is dispatched. In [`ValidationMode::Strict`] a bad entry fails the call.
//! In [`ValidationMode::Lenient`] it is logged and dropped.

use serde_json::{Map, Value};

/// Don't surface JSON parse failures of response bodies.
pub const SILENT_JSON_PARSING: &str = "silent_json_parsing";
/// Try to parse every text response body as JSON.
pub const FORCED_JSON_PARSING: &str = "forced_json_parsing";
/// Report timeouts as `ETIMEDOUT` instead of `ECONNABORTED`.
pub const CLARIFY_TIMEOUT_ERROR: &str = "clarify_timeout_error";

/// Expected type of a validated option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionKind {
    Boolean,
}

impl OptionKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            OptionKind::Boolean => value.is_boolean(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            OptionKind::Boolean => "boolean",
        }
    }
}

const TRANSITIONAL_SCHEMA: &[(&str, OptionKind)] = &[
    (SILENT_JSON_PARSING, OptionKind::Boolean),
    (FORCED_JSON_PARSING, OptionKind::Boolean),
    (CLARIFY_TIMEOUT_ERROR, OptionKind::Boolean),
];

/// How option violations are handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Log a warning and drop the offending entry.
    #[default]
    Lenient,
    /// Fail the request.
    Strict,
}

/// An option failed validation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("option {option} must be a {expected}")]
    BadOption {
        option: String,
        expected: &'static str,
    },
    #[error("unknown option {0}")]
    UnknownOption(String),
    #[error("options must be an object")]
    NotAnObject,
}

/// Compatibility switches for response parsing and error reporting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transitional(Map<String, Value>);

impl Transitional {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an arbitrary JSON value; must be an object.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ValidationError::NotAnObject),
        }
    }

    pub fn silent_json_parsing(mut self, enabled: bool) -> Self {
        self.0.insert(SILENT_JSON_PARSING.into(), Value::Bool(enabled));
        self
    }

    pub fn forced_json_parsing(mut self, enabled: bool) -> Self {
        self.0.insert(FORCED_JSON_PARSING.into(), Value::Bool(enabled));
        self
    }

    pub fn clarify_timeout_error(mut self, enabled: bool) -> Self {
        self.0.insert(CLARIFY_TIMEOUT_ERROR.into(), Value::Bool(enabled));
        self
    }

    /// Defaults to `true`.
    pub fn is_silent_json_parsing(&self) -> bool {
        self.flag(SILENT_JSON_PARSING).unwrap_or(true)
    }

    /// Defaults to `true`.
    pub fn is_forced_json_parsing(&self) -> bool {
        self.flag(FORCED_JSON_PARSING).unwrap_or(true)
    }

    /// Defaults to `false`.
    pub fn is_clarify_timeout_error(&self) -> bool {
        self.flag(CLARIFY_TIMEOUT_ERROR).unwrap_or(false)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    fn flag(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }
}

/// Check every entry of `options` against `schema`.
///
/// Returns each offending key with its violation, in key order.
pub fn check_options(
    options: &Map<String, Value>,
    schema: &[(&str, OptionKind)],
    allow_unknown: bool,
) -> Vec<(String, ValidationError)> {
    let mut violations = Vec::new();
    for (key, value) in options {
        match schema.iter().find(|(name, _)| name == key) {
            Some((_, kind)) if !kind.matches(value) => violations.push((
                key.clone(),
                ValidationError::BadOption {
                    option: key.clone(),
                    expected: kind.as_str(),
                },
            )),
            Some(_) => {}
            None if !allow_unknown => {
                violations.push((key.clone(), ValidationError::UnknownOption(key.clone())))
            }
            None => {}
        }
    }
    violations
}

/// Fail on the first violation of `schema`.
pub fn assert_options(
    options: &Map<String, Value>,
    schema: &[(&str, OptionKind)],
    allow_unknown: bool,
) -> Result<(), ValidationError> {
    match check_options(options, schema, allow_unknown).into_iter().next() {
        Some((_, err)) => Err(err),
        None => Ok(()),
    }
}

/// Validate the transitional bag in place.
pub fn validate_transitional(
    transitional: &mut Transitional,
    mode: ValidationMode,
) -> Result<(), ValidationError> {
    let violations = check_options(&transitional.0, TRANSITIONAL_SCHEMA, false);
    for (key, err) in violations {
        match mode {
            ValidationMode::Strict => return Err(err),
            ValidationMode::Lenient => {
                tracing::warn!(option = %key, error = %err, "dropping invalid transitional option");
                transitional.0.remove(&key);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transitional_defaults() {
        let t = Transitional::new();
        assert!(t.is_silent_json_parsing());
        assert!(t.is_forced_json_parsing());
        assert!(!t.is_clarify_timeout_error());

        let t = t.clarify_timeout_error(true).silent_json_parsing(false);
        assert!(t.is_clarify_timeout_error());
        assert!(!t.is_silent_json_parsing());
    }

    #[test]
    fn test_from_value_requires_object() {
        assert_eq!(
            Transitional::from_value(json!(true)),
            Err(ValidationError::NotAnObject)
        );
    }

    #[test]
    fn test_strict_rejects_bad_type() {
        let mut t = Transitional::from_value(json!({"silent_json_parsing": "yes"})).unwrap();
        let err = validate_transitional(&mut t, ValidationMode::Strict).unwrap_err();
        assert_eq!(
            err,
            ValidationError::BadOption {
                option: "silent_json_parsing".into(),
                expected: "boolean",
            }
        );
    }

    #[test]
    fn test_strict_rejects_unknown_option() {
        let mut t = Transitional::from_value(json!({"made_up": true})).unwrap();
        let err = validate_transitional(&mut t, ValidationMode::Strict).unwrap_err();
        assert_eq!(err, ValidationError::UnknownOption("made_up".into()));
    }

    #[test]
    fn test_lenient_drops_offending_entries() {
        let mut t = Transitional::from_value(json!({
            "made_up": true,
            "forced_json_parsing": 1,
            "clarify_timeout_error": true,
        }))
        .unwrap();

        validate_transitional(&mut t, ValidationMode::Lenient).unwrap();

        assert_eq!(t.as_map().len(), 1);
        assert!(t.is_clarify_timeout_error());
        assert!(t.is_forced_json_parsing());
    }

    #[test]
    fn test_assert_options_allows_unknown() {
        let options = json!({"extra": 1}).as_object().cloned().unwrap();
        assert!(assert_options(&options, TRANSITIONAL_SCHEMA, true).is_ok());
        assert!(assert_options(&options, TRANSITIONAL_SCHEMA, false).is_err());
    }
}
