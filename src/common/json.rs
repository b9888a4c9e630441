use std::{fmt, sync::OnceLock};

use assert_json_diff::{assert_json_matches_no_panic, CompareMode, Config, NumericMode};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::common::{
    data::{fail, AssertionError, Error},
    util::read_env,
};

static GLOBAL_CONFIG: OnceLock<JsonConfig> = OnceLock::new();

/// Serialization settings shared by response producers and request builders.
///
/// A configuration can be passed explicitly (see `MockServer::with_config` and
/// `RequestBuilder::json_config`). Everything else falls back to [JsonConfig::global].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonConfig {
    pretty: bool,
    include_nulls: bool,
}

impl JsonConfig {
    pub fn new() -> Self {
        Self {
            pretty: false,
            include_nulls: true,
        }
    }

    /// Reads `JSONMOCK_PRETTY_PRINT` and `JSONMOCK_INCLUDE_NULLS`.
    pub fn from_env() -> Self {
        Self {
            pretty: parse_bool(&read_env("JSONMOCK_PRETTY_PRINT", "false"), false),
            include_nulls: parse_bool(&read_env("JSONMOCK_INCLUDE_NULLS", "true"), true),
        }
    }

    /// The process-wide default, initialised from the environment on first use.
    pub fn global() -> JsonConfig {
        *GLOBAL_CONFIG.get_or_init(|| {
            let config = JsonConfig::from_env();
            tracing::debug!("Using global JSON configuration {:?}", config);
            config
        })
    }

    /// Installs the process-wide default. Returns the rejected configuration if the
    /// default has already been initialised.
    pub fn set_global(config: JsonConfig) -> Result<(), JsonConfig> {
        GLOBAL_CONFIG.set(config)
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn include_nulls(mut self, include_nulls: bool) -> Self {
        self.include_nulls = include_nulls;
        self
    }

    pub fn is_pretty(&self) -> bool {
        self.pretty
    }

    pub fn includes_nulls(&self) -> bool {
        self.include_nulls
    }

    /// Converts a value into its JSON tree, dropping `null` object members unless
    /// nulls are included.
    pub fn to_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value, Error> {
        let mut value = serde_json::to_value(value)?;
        if !self.include_nulls {
            strip_nulls(&mut value);
        }
        Ok(value)
    }

    /// Serializes a value to JSON text.
    ///
    /// Field order follows the `Serialize` implementation unless nulls are excluded,
    /// in which case object members come out sorted by name.
    pub fn stringify<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, Error> {
        if self.include_nulls {
            return Ok(match self.pretty {
                true => serde_json::to_string_pretty(value)?,
                false => serde_json::to_string(value)?,
            });
        }

        let value = self.to_value(value)?;
        Ok(match self.pretty {
            true => serde_json::to_string_pretty(&value)?,
            false => serde_json::to_string(&value)?,
        })
    }
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

// ================================================================================================
// Structural matcher
// ================================================================================================

#[derive(Debug)]
enum NodeCheck {
    Equals(Value),
    Matches(Regex),
    Nested(JsonExpect),
    Absent,
}

#[derive(Debug)]
enum JsonCheck {
    Property(String, NodeCheck),
    Item(usize, NodeCheck),
    Count(usize),
    Value(Value),
    Includes(Value),
}

/// A declarative description of a JSON document.
///
/// Checks run in the order they were declared and the first failing check ends the
/// evaluation. Failures name the JSON pointer of the offending node, e.g.
/// `/name: JSON value doesn't match - expected "Mary", was "Maria"`.
#[derive(Debug, Default)]
pub struct JsonExpect {
    checks: Vec<JsonCheck>,
}

impl JsonExpect {
    pub fn new() -> Self {
        Self::default()
    }

    /// The object member `name` must equal `expected`. Numbers compare by value, so
    /// `1` equals `1.0`.
    pub fn property<V: Into<Value>>(&mut self, name: &str, expected: V) -> &mut Self {
        self.checks.push(JsonCheck::Property(
            name.to_string(),
            NodeCheck::Equals(expected.into()),
        ));
        self
    }

    /// The object member `name` must be present and satisfy the nested checks.
    pub fn property_with<F: FnOnce(&mut JsonExpect)>(&mut self, name: &str, f: F) -> &mut Self {
        let mut nested = JsonExpect::new();
        f(&mut nested);
        self.checks
            .push(JsonCheck::Property(name.to_string(), NodeCheck::Nested(nested)));
        self
    }

    /// The object member `name` must be a string matching `pattern`.
    ///
    /// # Panics
    /// Panics if `pattern` is not a valid regular expression.
    pub fn property_matches(&mut self, name: &str, pattern: &str) -> &mut Self {
        let regex = Regex::new(pattern).expect("cannot convert provided value into regex");
        self.checks
            .push(JsonCheck::Property(name.to_string(), NodeCheck::Matches(regex)));
        self
    }

    pub fn property_absent(&mut self, name: &str) -> &mut Self {
        self.checks
            .push(JsonCheck::Property(name.to_string(), NodeCheck::Absent));
        self
    }

    pub fn item<V: Into<Value>>(&mut self, index: usize, expected: V) -> &mut Self {
        self.checks
            .push(JsonCheck::Item(index, NodeCheck::Equals(expected.into())));
        self
    }

    pub fn item_with<F: FnOnce(&mut JsonExpect)>(&mut self, index: usize, f: F) -> &mut Self {
        let mut nested = JsonExpect::new();
        f(&mut nested);
        self.checks
            .push(JsonCheck::Item(index, NodeCheck::Nested(nested)));
        self
    }

    /// The current node must be an array (or object) with exactly `count` entries.
    pub fn count(&mut self, count: usize) -> &mut Self {
        self.checks.push(JsonCheck::Count(count));
        self
    }

    /// The current node must equal `expected` as a whole.
    pub fn value<V: Into<Value>>(&mut self, expected: V) -> &mut Self {
        self.checks.push(JsonCheck::Value(expected.into()));
        self
    }

    /// The current node must contain `expected`: objects may carry additional members,
    /// arrays must contain the expected elements at the same positions.
    pub fn includes<V: Into<Value>>(&mut self, expected: V) -> &mut Self {
        self.checks.push(JsonCheck::Includes(expected.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Parses `text` and evaluates all checks against the document root.
    pub fn check(&self, text: &str) -> Result<(), AssertionError> {
        let document: Value = match serde_json::from_str(text) {
            Ok(document) => document,
            Err(err) => return fail(format!("Unable to parse JSON - {}", err)),
        };
        self.check_value(&document)
    }

    pub fn check_value(&self, document: &Value) -> Result<(), AssertionError> {
        self.evaluate(document, "")
    }

    fn evaluate(&self, node: &Value, path: &str) -> Result<(), AssertionError> {
        for check in &self.checks {
            match check {
                JsonCheck::Property(name, node_check) => {
                    let object = match node {
                        Value::Object(object) => object,
                        other => return type_mismatch(path, "object", other),
                    };
                    let child_path = format!("{}/{}", path, escape_pointer_token(name));
                    node_check.evaluate(object.get(name), &child_path)?;
                }
                JsonCheck::Item(index, node_check) => {
                    let items = match node {
                        Value::Array(items) => items,
                        other => return type_mismatch(path, "array", other),
                    };
                    let child_path = format!("{}/{}", path, index);
                    if *index >= items.len() {
                        return fail(format!(
                            "{}: JSON array index out of bounds - length was {}",
                            display_path(&child_path),
                            items.len()
                        ));
                    }
                    node_check.evaluate(items.get(*index), &child_path)?;
                }
                JsonCheck::Count(count) => {
                    let (kind, actual) = match node {
                        Value::Array(items) => ("array", items.len()),
                        Value::Object(object) => ("object", object.len()),
                        other => return type_mismatch(path, "array", other),
                    };
                    if actual != *count {
                        return fail(format!(
                            "{}: JSON {} length doesn't match - expected {}, was {}",
                            display_path(path),
                            kind,
                            count,
                            actual
                        ));
                    }
                }
                JsonCheck::Value(expected) => compare_values(path, expected, node)?,
                JsonCheck::Includes(expected) => {
                    if let Err(diff) =
                        assert_json_matches_no_panic(node, expected, Config::new(CompareMode::Inclusive))
                    {
                        return fail(format!(
                            "{}: JSON value doesn't include expected content - {}",
                            display_path(path),
                            diff.trim_end()
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

impl NodeCheck {
    fn evaluate(&self, node: Option<&Value>, path: &str) -> Result<(), AssertionError> {
        let node = match (self, node) {
            (NodeCheck::Absent, None) => return Ok(()),
            (NodeCheck::Absent, Some(actual)) => {
                return fail(format!(
                    "{}: JSON property expected to be absent, was {}",
                    display_path(path),
                    actual
                ))
            }
            (_, None) => return fail(format!("{}: JSON property missing", display_path(path))),
            (_, Some(node)) => node,
        };

        match self {
            NodeCheck::Equals(expected) => compare_values(path, expected, node),
            NodeCheck::Nested(nested) => nested.evaluate(node, path),
            NodeCheck::Matches(regex) => match node {
                Value::String(text) if regex.is_match(text) => Ok(()),
                Value::String(_) => fail(format!(
                    "{}: JSON value doesn't match pattern {} - was {}",
                    display_path(path),
                    regex,
                    node
                )),
                other => type_mismatch(path, "string", other),
            },
            NodeCheck::Absent => Ok(()),
        }
    }
}

fn compare_values(path: &str, expected: &Value, actual: &Value) -> Result<(), AssertionError> {
    let config = Config::new(CompareMode::Strict).numeric_mode(NumericMode::AssumeFloat);
    if assert_json_matches_no_panic(actual, expected, config).is_ok() {
        return Ok(());
    }

    fail(format!(
        "{}: JSON value doesn't match - expected {}, was {}",
        display_path(path),
        expected,
        actual
    ))
}

fn type_mismatch<T>(path: &str, expected: &str, actual: &Value) -> Result<T, AssertionError> {
    fail(format!(
        "{}: JSON type doesn't match - expected {}, was {}",
        display_path(path),
        expected,
        JsonType(actual)
    ))
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        return "/";
    }
    path
}

// RFC 6901
fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

struct JsonType<'a>(&'a Value);

impl fmt::Display for JsonType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self.0 {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        })
    }
}

/// Evaluates a structural JSON description against `text`.
///
/// ```
/// use jsonmock::expect_json;
///
/// let result = expect_json(r#"{"id":1,"name":"Maria"}"#, |json| {
///     json.property("id", 1).property("name", "Mary");
/// });
///
/// assert_eq!(
///     result.unwrap_err().message(),
///     r#"/name: JSON value doesn't match - expected "Mary", was "Maria""#
/// );
/// ```
pub fn expect_json<F: FnOnce(&mut JsonExpect)>(text: &str, f: F) -> Result<(), AssertionError> {
    let mut expect = JsonExpect::new();
    f(&mut expect);
    expect.check(text)
}
