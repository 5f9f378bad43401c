//! Structural schemas for request and response payloads.
//!
//! A [`Schema`] describes the shape a JSON value must have: its type, whether it
//! may be absent, string length bounds, numeric ranges, enum membership and the
//! nested shape of arrays and objects. Validation walks the whole value and
//! reports every violation it finds rather than stopping at the first one, so a
//! client sees all the problems with a request in a single round trip.
//!
//! # Example
//!
//! ```
//! use kiosk_core::Schema;
//! use serde_json::json;
//!
//! let product = Schema::object(vec![
//!     ("name", Schema::string().min_length(1).required()),
//!     ("price", Schema::number().minimum(0.0).multiple_of(0.01).required()),
//! ]);
//!
//! assert!(product.validate(&json!({"name": "Lamp", "price": 19.99})).is_ok());
//!
//! let violations = product.validate(&json!({"price": 19.999})).unwrap_err();
//! assert_eq!(violations.len(), 2);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Slack allowed when checking `multiple_of`, in units of the value's
/// magnitude. Covers representation error of a parsed decimal and nothing
/// more, so a sub-cent offset on a large price is still caught.
const MULTIPLE_OF_TOLERANCE: f64 = 8.0 * f64::EPSILON;

/// A structural constraint a JSON value must satisfy.
///
/// Every variant except [`Schema::Null`] carries a `required` flag, consulted
/// by the enclosing object when the property is absent. An explicit `null` is
/// only accepted by [`Schema::Null`] and [`Schema::Any`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schema {
    /// A string value.
    String {
        /// Whether the value must be present.
        #[serde(default)]
        required: bool,
        /// Minimum length in characters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        /// Maximum length in characters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
        /// Regular expression the whole string must match.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        /// Well-known string format.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<StringFormat>,
        /// Closed set of accepted values. Empty means unrestricted.
        #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
        allowed: Vec<String>,
    },
    /// A whole number.
    Integer {
        /// Whether the value must be present.
        #[serde(default)]
        required: bool,
        /// Inclusive lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<i64>,
        /// Inclusive upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<i64>,
    },
    /// Any JSON number.
    Number {
        /// Whether the value must be present.
        #[serde(default)]
        required: bool,
        /// Inclusive lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        /// Inclusive upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
        /// The value must be an integral multiple of this step.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        multiple_of: Option<f64>,
    },
    /// `true` or `false`.
    Boolean {
        /// Whether the value must be present.
        #[serde(default)]
        required: bool,
    },
    /// A list whose elements all satisfy `items`.
    Array {
        /// Whether the value must be present.
        #[serde(default)]
        required: bool,
        /// Schema applied to every element.
        items: Box<Schema>,
        /// Minimum number of elements.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_items: Option<usize>,
        /// Maximum number of elements.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_items: Option<usize>,
    },
    /// A JSON object with named properties.
    Object {
        /// Whether the value must be present.
        #[serde(default)]
        required: bool,
        /// Property schemas, in declaration order.
        #[serde(default)]
        properties: IndexMap<String, Schema>,
        /// Properties that must be present.
        #[serde(default)]
        required_properties: Vec<String>,
        /// Whether properties not listed in `properties` are accepted.
        #[serde(default = "default_true")]
        additional_properties: bool,
    },
    /// Accepts anything.
    Any {
        /// Whether the value must be present.
        #[serde(default)]
        required: bool,
    },
    /// Only `null`.
    Null,
}

fn default_true() -> bool {
    true
}

/// Well-known string formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringFormat {
    /// An e-mail address (`local@domain.tld`).
    Email,
}

impl StringFormat {
    fn name(self) -> &'static str {
        match self {
            Self::Email => "email",
        }
    }

    fn matches(self, value: &str) -> bool {
        match self {
            Self::Email => email_regex().is_match(value),
        }
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"))
}

/// Compiled `pattern` constraints, keyed by source. `None` marks a pattern
/// that failed to compile.
fn pattern_cache() -> &'static RwLock<HashMap<String, Option<Regex>>> {
    static PATTERNS: OnceLock<RwLock<HashMap<String, Option<Regex>>>> = OnceLock::new();
    PATTERNS.get_or_init(RwLock::default)
}

fn compiled_pattern(pattern: &str) -> Option<Regex> {
    if let Some(cached) = pattern_cache().read().get(pattern) {
        return cached.clone();
    }
    let compiled = Regex::new(pattern).ok();
    pattern_cache()
        .write()
        .insert(pattern.to_string(), compiled.clone());
    compiled
}

impl Schema {
    /// Creates an unconstrained string schema.
    #[must_use]
    pub fn string() -> Self {
        Self::String {
            required: false,
            min_length: None,
            max_length: None,
            pattern: None,
            format: None,
            allowed: Vec::new(),
        }
    }

    /// Creates a string schema limited to the given values.
    #[must_use]
    pub fn string_enum<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::String {
            required: false,
            min_length: None,
            max_length: None,
            pattern: None,
            format: None,
            allowed: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an unconstrained integer schema.
    #[must_use]
    pub fn integer() -> Self {
        Self::Integer {
            required: false,
            minimum: None,
            maximum: None,
        }
    }

    /// Creates an unconstrained number schema.
    #[must_use]
    pub fn number() -> Self {
        Self::Number {
            required: false,
            minimum: None,
            maximum: None,
            multiple_of: None,
        }
    }

    /// Creates a boolean schema.
    #[must_use]
    pub fn boolean() -> Self {
        Self::Boolean { required: false }
    }

    /// Creates an array schema with the given element schema.
    #[must_use]
    pub fn array(items: Schema) -> Self {
        Self::Array {
            required: false,
            items: Box::new(items),
            min_items: None,
            max_items: None,
        }
    }

    /// Creates an object schema from `(name, schema)` pairs.
    ///
    /// Properties whose schema is marked [`required`](Self::required) are
    /// added to the object's required list. Additional properties are accepted
    /// unless [`closed`](Self::closed) is applied.
    #[must_use]
    pub fn object(properties: Vec<(&str, Schema)>) -> Self {
        let required_properties = properties
            .iter()
            .filter(|(_, schema)| schema.is_required())
            .map(|(name, _)| (*name).to_string())
            .collect();

        Self::Object {
            required: false,
            properties: properties
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect(),
            required_properties,
            additional_properties: true,
        }
    }

    /// Creates a schema that accepts any value.
    #[must_use]
    pub fn any() -> Self {
        Self::Any { required: false }
    }

    /// Creates a schema that only accepts `null`.
    #[must_use]
    pub fn null() -> Self {
        Self::Null
    }

    /// Marks this schema as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        if let Some(flag) = self.required_flag_mut() {
            *flag = true;
        }
        self
    }

    /// Returns whether this schema is marked as required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        match self {
            Self::String { required, .. }
            | Self::Integer { required, .. }
            | Self::Number { required, .. }
            | Self::Boolean { required }
            | Self::Array { required, .. }
            | Self::Object { required, .. }
            | Self::Any { required } => *required,
            Self::Null => false,
        }
    }

    fn required_flag_mut(&mut self) -> Option<&mut bool> {
        match self {
            Self::String { required, .. }
            | Self::Integer { required, .. }
            | Self::Number { required, .. }
            | Self::Boolean { required }
            | Self::Array { required, .. }
            | Self::Object { required, .. }
            | Self::Any { required } => Some(required),
            Self::Null => None,
        }
    }

    /// Sets the minimum string length. Ignored on other schema types.
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        if let Self::String { min_length, .. } = &mut self {
            *min_length = Some(len);
        }
        self
    }

    /// Sets the maximum string length. Ignored on other schema types.
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        if let Self::String { max_length, .. } = &mut self {
            *max_length = Some(len);
        }
        self
    }

    /// Sets a regular expression the string must match.
    #[must_use]
    pub fn pattern(mut self, regex: impl Into<String>) -> Self {
        if let Self::String { pattern, .. } = &mut self {
            *pattern = Some(regex.into());
        }
        self
    }

    /// Requires the string to be a well-formed e-mail address.
    #[must_use]
    pub fn email(mut self) -> Self {
        if let Self::String { format, .. } = &mut self {
            *format = Some(StringFormat::Email);
        }
        self
    }

    /// Sets the inclusive integer lower bound.
    #[must_use]
    pub fn minimum_int(mut self, min: i64) -> Self {
        if let Self::Integer { minimum, .. } = &mut self {
            *minimum = Some(min);
        }
        self
    }

    /// Sets the inclusive integer upper bound.
    #[must_use]
    pub fn maximum_int(mut self, max: i64) -> Self {
        if let Self::Integer { maximum, .. } = &mut self {
            *maximum = Some(max);
        }
        self
    }

    /// Sets the inclusive number lower bound.
    #[must_use]
    pub fn minimum(mut self, min: f64) -> Self {
        if let Self::Number { minimum, .. } = &mut self {
            *minimum = Some(min);
        }
        self
    }

    /// Sets the inclusive number upper bound.
    #[must_use]
    pub fn maximum(mut self, max: f64) -> Self {
        if let Self::Number { maximum, .. } = &mut self {
            *maximum = Some(max);
        }
        self
    }

    /// Requires the number to be an integral multiple of `step`.
    #[must_use]
    pub fn multiple_of(mut self, step: f64) -> Self {
        if let Self::Number { multiple_of, .. } = &mut self {
            *multiple_of = Some(step);
        }
        self
    }

    /// Sets the minimum number of array elements.
    #[must_use]
    pub fn min_items(mut self, min: usize) -> Self {
        if let Self::Array { min_items, .. } = &mut self {
            *min_items = Some(min);
        }
        self
    }

    /// Sets the maximum number of array elements.
    #[must_use]
    pub fn max_items(mut self, max: usize) -> Self {
        if let Self::Array { max_items, .. } = &mut self {
            *max_items = Some(max);
        }
        self
    }

    /// Rejects object properties that are not declared.
    #[must_use]
    pub fn closed(mut self) -> Self {
        if let Self::Object {
            additional_properties,
            ..
        } = &mut self
        {
            *additional_properties = false;
        }
        self
    }

    /// Returns the schema's type name as it appears in serialized form.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String { .. } => "string",
            Self::Integer { .. } => "integer",
            Self::Number { .. } => "number",
            Self::Boolean { .. } => "boolean",
            Self::Array { .. } => "array",
            Self::Object { .. } => "object",
            Self::Any { .. } => "any",
            Self::Null => "null",
        }
    }

    /// Converts a raw path or query string into the JSON value this schema
    /// expects.
    ///
    /// Values that cannot be converted stay strings so that validation reports
    /// a type mismatch for them.
    #[must_use]
    pub fn coerce_param(&self, raw: &str) -> Value {
        let fallback = || Value::String(raw.to_string());
        match self {
            Self::Integer { .. } => raw.parse::<i64>().map_or_else(|_| fallback(), Value::from),
            Self::Number { .. } => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map_or_else(fallback, Value::Number),
            Self::Boolean { .. } => match raw {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => fallback(),
            },
            _ => fallback(),
        }
    }

    /// Validates a value, reporting paths relative to `$`.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<SchemaViolation>> {
        self.validate_at(value, "$")
    }

    /// Validates a value, reporting paths relative to `root`.
    ///
    /// ```
    /// use kiosk_core::Schema;
    /// use serde_json::json;
    ///
    /// let schema = Schema::object(vec![("name", Schema::string().required())]);
    /// let violations = schema.validate_at(&json!({}), "body").unwrap_err();
    /// assert_eq!(violations[0].path, "body.name");
    /// ```
    pub fn validate_at(&self, value: &Value, root: &str) -> Result<(), Vec<SchemaViolation>> {
        let mut violations = Vec::new();
        self.check(value, root, &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    fn check(&self, value: &Value, path: &str, out: &mut Vec<SchemaViolation>) {
        if value.is_null() {
            if !matches!(self, Self::Null | Self::Any { .. }) {
                out.push(SchemaViolation::new(path, "must not be null"));
            }
            return;
        }

        match self {
            Self::String {
                min_length,
                max_length,
                pattern,
                format,
                allowed,
                ..
            } => {
                let Some(s) = value.as_str() else {
                    out.push(SchemaViolation::type_mismatch(path, "string", value));
                    return;
                };
                let len = s.chars().count();
                if let Some(min) = min_length {
                    if len < *min {
                        out.push(SchemaViolation::new(
                            path,
                            format!("must be at least {min} characters long"),
                        ));
                    }
                }
                if let Some(max) = max_length {
                    if len > *max {
                        out.push(SchemaViolation::new(
                            path,
                            format!("must be at most {max} characters long"),
                        ));
                    }
                }
                if let Some(pattern) = pattern {
                    match compiled_pattern(pattern) {
                        Some(re) if re.is_match(s) => {}
                        Some(_) => out.push(SchemaViolation::new(
                            path,
                            format!("must match pattern \"{pattern}\""),
                        )),
                        None => out.push(SchemaViolation::new(
                            path,
                            format!("pattern \"{pattern}\" is not a valid regular expression"),
                        )),
                    }
                }
                if let Some(format) = format {
                    if !format.matches(s) {
                        out.push(SchemaViolation::new(
                            path,
                            format!("must match format \"{}\"", format.name()),
                        ));
                    }
                }
                if !allowed.is_empty() && !allowed.iter().any(|a| a == s) {
                    out.push(SchemaViolation::new(
                        path,
                        format!("must be one of: {}", allowed.join(", ")),
                    ));
                }
            }

            Self::Integer {
                minimum, maximum, ..
            } => {
                let Some(n) = value.as_i64() else {
                    out.push(SchemaViolation::type_mismatch(path, "integer", value));
                    return;
                };
                if let Some(min) = minimum {
                    if n < *min {
                        out.push(SchemaViolation::new(path, format!("must be >= {min}")));
                    }
                }
                if let Some(max) = maximum {
                    if n > *max {
                        out.push(SchemaViolation::new(path, format!("must be <= {max}")));
                    }
                }
            }

            Self::Number {
                minimum,
                maximum,
                multiple_of,
                ..
            } => {
                let Some(n) = value.as_f64() else {
                    out.push(SchemaViolation::type_mismatch(path, "number", value));
                    return;
                };
                if let Some(min) = minimum {
                    if n < *min {
                        out.push(SchemaViolation::new(path, format!("must be >= {min}")));
                    }
                }
                if let Some(max) = maximum {
                    if n > *max {
                        out.push(SchemaViolation::new(path, format!("must be <= {max}")));
                    }
                }
                if let Some(step) = multiple_of {
                    if !is_multiple_of(n, *step) {
                        out.push(SchemaViolation::new(
                            path,
                            format!("must be a multiple of {step}"),
                        ));
                    }
                }
            }

            Self::Boolean { .. } => {
                if !value.is_boolean() {
                    out.push(SchemaViolation::type_mismatch(path, "boolean", value));
                }
            }

            Self::Array {
                items,
                min_items,
                max_items,
                ..
            } => {
                let Some(arr) = value.as_array() else {
                    out.push(SchemaViolation::type_mismatch(path, "array", value));
                    return;
                };
                if let Some(min) = min_items {
                    if arr.len() < *min {
                        out.push(SchemaViolation::new(
                            path,
                            format!("must contain at least {min} items"),
                        ));
                    }
                }
                if let Some(max) = max_items {
                    if arr.len() > *max {
                        out.push(SchemaViolation::new(
                            path,
                            format!("must contain at most {max} items"),
                        ));
                    }
                }
                for (idx, item) in arr.iter().enumerate() {
                    items.check(item, &format!("{path}[{idx}]"), out);
                }
            }

            Self::Object {
                properties,
                required_properties,
                additional_properties,
                ..
            } => {
                let Some(obj) = value.as_object() else {
                    out.push(SchemaViolation::type_mismatch(path, "object", value));
                    return;
                };
                // Required either by the object's list or by the property's own flag
                let flagged = properties
                    .iter()
                    .filter(|(name, schema)| {
                        schema.is_required() && !required_properties.contains(*name)
                    })
                    .map(|(name, _)| name);
                for name in required_properties.iter().chain(flagged) {
                    if !obj.contains_key(name) {
                        out.push(SchemaViolation::new(
                            format!("{path}.{name}"),
                            format!("missing required property '{name}'"),
                        ));
                    }
                }
                for (name, prop_schema) in properties {
                    if let Some(prop_value) = obj.get(name) {
                        prop_schema.check(prop_value, &format!("{path}.{name}"), out);
                    }
                }
                if !additional_properties {
                    for name in obj.keys().filter(|k| !properties.contains_key(*k)) {
                        out.push(SchemaViolation::new(
                            format!("{path}.{name}"),
                            format!("unexpected property '{name}'"),
                        ));
                    }
                }
            }

            Self::Any { .. } => {}

            Self::Null => out.push(SchemaViolation::type_mismatch(path, "null", value)),
        }
    }
}

/// Checks `value` lies on the nearest multiple of `step`, so that `19.99`
/// passes a `0.01` step despite its binary representation.
fn is_multiple_of(value: f64, step: f64) -> bool {
    if step <= 0.0 || !value.is_finite() {
        return false;
    }
    let nearest = (value / step).round() * step;
    (value - nearest).abs() <= MULTIPLE_OF_TOLERANCE * value.abs().max(step)
}

/// Returns a human-readable name for a JSON value type.
fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One place where a value failed its schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    /// Location of the offending value (`body.tags[0]`, `query.name`, ...).
    pub path: String,
    /// What was wrong with it.
    pub message: String,
}

impl SchemaViolation {
    /// Creates a violation at `path`.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    fn type_mismatch(path: &str, expected: &str, actual: &Value) -> Self {
        Self::new(
            path,
            format!("expected {expected}, got {}", value_type_name(actual)),
        )
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.message)
    }
}
