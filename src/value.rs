//! Dynamic values accepted by the console-style logging surface.
//!
//! [`Value`] covers the shapes a console call can receive: primitives,
//! well-known runtime objects (errors, dates, regexes, URLs, form data,
//! headers, maps, sets, requests, responses) and generic arrays/objects.
//! Arrays and objects are shared handles: cloning a [`Value`] clones the
//! handle, not the contents, which is what makes circular graphs possible.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard};
use url::Url;

#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    Str(String),
    /// Symbol with its optional description.
    Symbol(Option<String>),
    Function,
    Error(ErrorValue),
    Date(DateTime<Utc>),
    RegExp(RegExpValue),
    Url(Url),
    FormData(Vec<(String, String)>),
    Headers(Vec<(String, String)>),
    Map(Vec<(Value, Value)>),
    Set(Vec<Value>),
    Request(RequestInfo),
    Response(ResponseInfo),
    Array(Array),
    Object(Object),
}

impl Value {
    /// Build a plain object from key/value pairs.
    pub fn object<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let object = Object::new();
        for (key, value) in pairs {
            object.insert(key, value);
        }
        Value::Object(object)
    }

    pub fn array<V: Into<Value>, I: IntoIterator<Item = V>>(items: I) -> Self {
        let array = Array::new();
        for item in items {
            array.push(item);
        }
        Value::Array(array)
    }

    pub fn map<K: Into<Value>, V: Into<Value>, I: IntoIterator<Item = (K, V)>>(pairs: I) -> Self {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn set<V: Into<Value>, I: IntoIterator<Item = V>>(items: I) -> Self {
        Value::Set(items.into_iter().map(Into::into).collect())
    }

    pub fn form_data<K: Into<String>, V: Into<String>, I: IntoIterator<Item = (K, V)>>(pairs: I) -> Self {
        Value::FormData(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Header names are lowercased and iterated in sorted order.
    pub fn headers<K: AsRef<str>, V: Into<String>, I: IntoIterator<Item = (K, V)>>(pairs: I) -> Self {
        Value::Headers(normalize_headers(pairs))
    }

    /// Regular expression from its pattern body and flags.
    pub fn regexp(source: impl Into<String>, flags: impl AsRef<str>) -> Self {
        Value::RegExp(RegExpValue::new(source, flags))
    }

    /// Convert any serializable value through its JSON form.
    ///
    /// Values that fail to serialize become [`Value::Undefined`].
    pub fn from_serialize<T: serde::Serialize + ?Sized>(value: &T) -> Self {
        serde_json::to_value(value).map_or(Value::Undefined, Value::from)
    }
}

fn normalize_headers<K: AsRef<str>, V: Into<String>, I: IntoIterator<Item = (K, V)>>(
    pairs: I,
) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = Vec::new();
    for (name, value) in pairs {
        let name = name.as_ref().to_ascii_lowercase();
        let value = value.into();
        match headers.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => {
                slot.1.push_str(", ");
                slot.1.push_str(&value);
            }
            None => headers.push((name, value)),
        }
    }
    headers.sort_by(|a, b| a.0.cmp(&b.0));
    headers
}

/// Error-like value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorValue {
    /// Constructor name, `Error` when unset.
    pub name: Option<String>,
    pub message: String,
    pub stack: Option<String>,
}

impl ErrorValue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            name: None,
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "Error",
        }
    }

    /// Capture a Rust error by its display text.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(err.to_string())
    }
}

/// Regular expression pattern with canonically ordered flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegExpValue {
    pub source: String,
    pub flags: String,
}

const REGEXP_FLAG_ORDER: &str = "dgimsuvy";

impl RegExpValue {
    pub fn new(source: impl Into<String>, flags: impl AsRef<str>) -> Self {
        let source = source.into();
        let flags = flags.as_ref();
        Self {
            source: if source.is_empty() { "(?:)".to_string() } else { source },
            flags: REGEXP_FLAG_ORDER.chars().filter(|c| flags.contains(*c)).collect(),
        }
    }
}

impl fmt::Display for RegExpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

/// The non-body parts of an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub referrer: String,
    pub credentials: String,
    pub mode: String,
}

impl RequestInfo {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: Vec::new(),
            referrer: "about:client".to_string(),
            credentials: "same-origin".to_string(),
            mode: "cors".to_string(),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into().to_ascii_uppercase();
        self
    }

    pub fn with_headers<K: AsRef<str>, V: Into<String>, I: IntoIterator<Item = (K, V)>>(mut self, headers: I) -> Self {
        self.headers = normalize_headers(headers);
        self
    }
}

/// The non-body parts of a received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseInfo {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Response type, `default` for locally constructed responses.
    pub kind: String,
}

impl ResponseInfo {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            kind: "default".to_string(),
        }
    }

    pub fn with_headers<K: AsRef<str>, V: Into<String>, I: IntoIterator<Item = (K, V)>>(mut self, headers: I) -> Self {
        self.headers = normalize_headers(headers);
        self
    }
}

/// Shared, mutable array handle.
#[derive(Clone, Default)]
pub struct Array(Arc<RwLock<Vec<Value>>>);

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, value: impl Into<Value>) {
        let mut items = self.0.write().unwrap_or_else(|e| e.into_inner());
        items.push(value.into());
    }

    pub fn len(&self) -> usize {
        self.0.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn read(&self) -> Option<RwLockReadGuard<'_, Vec<Value>>> {
        self.0.read().ok()
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Array({} items)", self.len())
    }
}

/// Shared, mutable plain-object handle. Keys keep insertion order.
#[derive(Clone, Default)]
pub struct Object(Arc<RwLock<Vec<(String, Value)>>>);

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let mut fields = self.0.write().unwrap_or_else(|e| e.into_inner());
        match fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => fields.push((key, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.0.read().map(|fields| fields.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn read(&self) -> Option<RwLockReadGuard<'_, Vec<(String, Value)>>> {
        self.0.read().ok()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({} keys)", self.len())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Str(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! value_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Number(value as f64)
                }
            }
        )*
    };
}

value_from_number!(f32, f64, i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<i128> for Value {
    fn from(value: i128) -> Self {
        Value::BigInt(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::array(items)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Date(value)
    }
}

impl From<Url> for Value {
    fn from(value: Url) -> Self {
        Value::Url(value)
    }
}

impl From<ErrorValue> for Value {
    fn from(value: ErrorValue) -> Self {
        Value::Error(value)
    }
}

impl From<RegExpValue> for Value {
    fn from(value: RegExpValue) -> Self {
        Value::RegExp(value)
    }
}

impl From<RequestInfo> for Value {
    fn from(value: RequestInfo) -> Self {
        Value::Request(value)
    }
}

impl From<ResponseInfo> for Value {
    fn from(value: ResponseInfo) -> Self {
        Value::Response(value)
    }
}

impl From<Array> for Value {
    fn from(value: Array) -> Self {
        Value::Array(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => Value::array(items),
            serde_json::Value::Object(fields) => Value::object(fields),
        }
    }
}

/// Build a `Vec<Value>` from heterogeneous expressions.
///
/// ```
/// use logpush_agent::args;
/// let values = args!["retrying", 3, true];
/// assert_eq!(values.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::value::Value::from($value)),*]
    };
}
