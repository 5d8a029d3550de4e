//! Per-call metadata input and its normalization into [`Metadata`].

use crate::record::Metadata;
use crate::serialize::format_number;

/// A raw metadata value as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Str(String),
    Number(f64),
    /// Integer input, kept exact instead of going through `f64`.
    Int(i128),
    Bool(bool),
    Null,
    Undefined,
}

impl MetaValue {
    /// Transform into the string form kept in [`Metadata`], or `None` when
    /// the value has no representation (null, undefined, blank strings).
    pub fn normalize(&self) -> Option<String> {
        let value = match self {
            MetaValue::Str(s) => s.trim().to_string(),
            MetaValue::Number(n) => format_number(*n),
            MetaValue::Int(n) => n.to_string(),
            MetaValue::Bool(b) => b.to_string(),
            MetaValue::Null | MetaValue::Undefined => return None,
        };
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Str(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::Str(value)
    }
}

impl From<&String> for MetaValue {
    fn from(value: &String) -> Self {
        MetaValue::Str(value.clone())
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Bool(value)
    }
}

macro_rules! meta_value_from {
    ($variant:ident as $target:ty: $($ty:ty),*) => {
        $(
            impl From<$ty> for MetaValue {
                fn from(value: $ty) -> Self {
                    MetaValue::$variant(value as $target)
                }
            }
        )*
    };
}

meta_value_from!(Number as f64: f32, f64);
meta_value_from!(Int as i128: i8, i16, i32, i64, i128, u8, u16, u32, u64, usize, isize);

impl<T: Into<MetaValue>> From<Option<T>> for MetaValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(MetaValue::Null, Into::into)
    }
}

/// Ordered set of raw metadata pairs for one call.
///
/// Setting a key that already exists replaces its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataInit(Vec<(String, MetaValue)>);

impl MetadataInit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<MetaValue>> FromIterator<(K, V)> for MetadataInit {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut init = MetadataInit::new();
        for (key, value) in iter {
            init.insert(key, value);
        }
        init
    }
}

impl<K: Into<String>, V: Into<MetaValue>, const N: usize> From<[(K, V); N]> for MetadataInit {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Normalize optional per-call metadata.
///
/// Returns `None` only when no input was given at all; an empty input
/// yields an empty map. Keys whose value normalizes to nothing are dropped.
pub fn unwrap_metadata(init: Option<&MetadataInit>) -> Option<Metadata> {
    let init = init?;
    Some(
        init.iter()
            .filter_map(|(key, value)| value.normalize().map(|v| (key.to_string(), v)))
            .collect(),
    )
}
