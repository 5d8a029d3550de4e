//! Rendering of console-style arguments into log message text.
//!
//! Top-level arguments are flattened to plain text and joined with a
//! single space. Composite arguments that have no dedicated text form are
//! rendered as JSON, with [`stringify_object_replacer`] giving well-known
//! runtime objects a readable shape at every depth.

use crate::error::SerializeError;
use crate::value::{ErrorValue, RequestInfo, ResponseInfo, Value};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};

/// Placeholder for values that cannot be represented.
pub const UNREPRESENTABLE: &str = "{}";

/// Placeholder for callables.
pub const FUNCTION_PLACEHOLDER: &str = "[fn()]";

// Exclusive upper bounds of `i64` and `u64` as exact `f64` values.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;

/// Render a list of console arguments as one message line.
pub fn stringify_arg_list(args: &[Value]) -> String {
    args.iter()
        .map(|arg| stringify_arg(arg, false))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a single console argument.
///
/// `nested` single-quotes strings so they stand apart from numbers when
/// shown inside a larger structure.
pub fn stringify_arg(value: &Value, nested: bool) -> String {
    match value {
        Value::Str(s) if nested => format!("'{s}'"),
        Value::Str(s) => s.clone(),
        Value::Number(n) => format_number(*n),
        Value::BigInt(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Function => FUNCTION_PLACEHOLDER.to_string(),
        Value::Symbol(description) => format!("Symbol({})", description.as_deref().unwrap_or_default()),
        Value::Undefined => UNREPRESENTABLE.to_string(),
        _ => stringify_object_arg(value),
    }
}

/// Render an object-like argument.
///
/// Errors, dates, regular expressions and URLs get a dedicated text form;
/// everything else becomes JSON. Any failure while producing the JSON
/// (circular structures, bigints) yields `{}`.
pub fn stringify_object_arg(value: &Value) -> String {
    match value {
        Value::Error(err) => stringify_error(err),
        Value::Date(date) => format!("'{}'", utc_string(date)),
        Value::RegExp(re) => re.to_string(),
        Value::Url(url) => format!("'{}'", url.as_str()),
        _ => match to_json_string(value) {
            Ok(Some(json)) => json,
            Ok(None) | Err(_) => UNREPRESENTABLE.to_string(),
        },
    }
}

fn stringify_error(err: &ErrorValue) -> String {
    match &err.stack {
        Some(stack) => format!("{stack}\n"),
        None => format!("{}: '{}'", err.name(), err.message),
    }
}

/// Serialize a value to a JSON string, applying
/// [`stringify_object_replacer`] at every depth.
///
/// Returns `Ok(None)` when the value has no JSON form at all (undefined,
/// functions, symbols).
pub fn to_json_string(value: &Value) -> Result<Option<String>, SerializeError> {
    match stringify_object_replacer(value)? {
        Some(json) => Ok(Some(serde_json::to_string(&json)?)),
        None => Ok(None),
    }
}

/// Convert a value into its JSON-safe shape.
///
/// - errors become `{message, stack, type}`
/// - form data, maps and headers become plain objects
/// - dates become their UTC string, regexes their pattern source, URLs
///   their href
/// - sets become arrays
/// - requests and responses expose only their metadata, never a body
///
/// `None` marks a value JSON skips: it is omitted from objects and written
/// as `null` inside arrays.
pub fn stringify_object_replacer(value: &Value) -> Result<Option<JsonValue>, SerializeError> {
    JsonWriter::default().write(value)
}

/// Tracks the arrays/objects on the current path to detect cycles.
#[derive(Default)]
struct JsonWriter {
    path: Vec<usize>,
}

impl JsonWriter {
    fn write(&mut self, value: &Value) -> Result<Option<JsonValue>, SerializeError> {
        let json = match value {
            Value::Undefined | Value::Function | Value::Symbol(_) => return Ok(None),
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => json_number(*n),
            Value::BigInt(_) => return Err(SerializeError::BigInt),
            Value::Str(s) => JsonValue::String(s.clone()),
            Value::Error(err) => error_object(err),
            Value::Date(date) => JsonValue::String(utc_string(date)),
            Value::RegExp(re) => JsonValue::String(re.source.clone()),
            Value::Url(url) => JsonValue::String(url.as_str().to_string()),
            Value::FormData(pairs) | Value::Headers(pairs) => string_object(pairs),
            Value::Map(pairs) => {
                let mut object = Map::new();
                for (key, value) in pairs {
                    let Some(key) = property_key(key) else { continue };
                    if let Some(json) = self.write(value)? {
                        object.insert(key, json);
                    }
                }
                JsonValue::Object(object)
            }
            Value::Set(items) => JsonValue::Array(self.write_items(items.iter())?),
            Value::Request(request) => request_object(request),
            Value::Response(response) => response_object(response),
            Value::Array(array) => {
                self.enter(array.id())?;
                let items = array.read().ok_or(SerializeError::Poisoned)?;
                let json = self.write_items(items.iter())?;
                self.path.pop();
                JsonValue::Array(json)
            }
            Value::Object(object) => {
                self.enter(object.id())?;
                let fields = object.read().ok_or(SerializeError::Poisoned)?;
                let mut json = Map::new();
                for (key, value) in fields.iter() {
                    if let Some(value) = self.write(value)? {
                        json.insert(key.clone(), value);
                    }
                }
                self.path.pop();
                JsonValue::Object(json)
            }
        };
        Ok(Some(json))
    }

    fn write_items<'a>(&mut self, items: impl Iterator<Item = &'a Value>) -> Result<Vec<JsonValue>, SerializeError> {
        items
            .map(|item| -> Result<JsonValue, SerializeError> { Ok(self.write(item)?.unwrap_or(JsonValue::Null)) })
            .collect()
    }

    fn enter(&mut self, id: usize) -> Result<(), SerializeError> {
        if self.path.contains(&id) {
            return Err(SerializeError::Circular);
        }
        self.path.push(id);
        Ok(())
    }
}

fn error_object(err: &ErrorValue) -> JsonValue {
    let mut object = Map::new();
    object.insert("message".to_string(), JsonValue::String(err.message.clone()));
    if let Some(stack) = &err.stack {
        object.insert("stack".to_string(), JsonValue::String(stack.clone()));
    }
    object.insert("type".to_string(), JsonValue::String(err.name().to_string()));
    JsonValue::Object(object)
}

fn string_object(pairs: &[(String, String)]) -> JsonValue {
    JsonValue::Object(
        pairs
            .iter()
            .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
            .collect(),
    )
}

fn request_object(request: &RequestInfo) -> JsonValue {
    let mut object = Map::new();
    object.insert("url".to_string(), JsonValue::String(request.url.clone()));
    object.insert("method".to_string(), JsonValue::String(request.method.clone()));
    object.insert("headers".to_string(), string_object(&request.headers));
    object.insert("referrer".to_string(), JsonValue::String(request.referrer.clone()));
    object.insert("credentials".to_string(), JsonValue::String(request.credentials.clone()));
    object.insert("mode".to_string(), JsonValue::String(request.mode.clone()));
    JsonValue::Object(object)
}

fn response_object(response: &ResponseInfo) -> JsonValue {
    let mut object = Map::new();
    object.insert("status".to_string(), JsonValue::from(response.status));
    object.insert("headers".to_string(), string_object(&response.headers));
    object.insert("type".to_string(), JsonValue::String(response.kind.clone()));
    JsonValue::Object(object)
}

/// Object key for a map entry; symbols have none.
fn property_key(key: &Value) -> Option<String> {
    match key {
        Value::Symbol(_) => None,
        Value::Null => Some("null".to_string()),
        Value::Undefined => Some("undefined".to_string()),
        Value::Str(s) => Some(s.clone()),
        Value::Number(n) => Some(format_number(*n)),
        Value::BigInt(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => Some("[object Object]".to_string()),
    }
}

fn json_number(n: f64) -> JsonValue {
    if !n.is_finite() {
        return JsonValue::Null;
    }
    // Integral values print all their digits, not an exponent.
    if n.fract() == 0.0 {
        if n >= -I64_BOUND && n < I64_BOUND {
            return JsonValue::from(n as i64);
        }
        if n >= 0.0 && n < U64_BOUND {
            return JsonValue::from(n as u64);
        }
    }
    serde_json::Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
}

/// RFC 1123 date in UTC, e.g. `Thu, 01 Jan 1970 00:00:00 GMT`.
pub fn utc_string(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Decimal form of a number: integral values carry no fractional part,
/// non-finite values read `NaN`, `Infinity` or `-Infinity`, and very large
/// or very small magnitudes use exponent notation.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let magnitude = n.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        let formatted = format!("{n:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{mantissa}e+{exponent}"),
            _ => formatted,
        };
    }
    n.to_string()
}
