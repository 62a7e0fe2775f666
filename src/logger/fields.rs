//! Immutable field sets attached to log entries.

use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

/// Key under which [`Fields::with_error`] stores the error message.
pub const ERROR_KEY: &str = "error";

/// An immutable set of key/value annotations.
///
/// Cloning is cheap (the map is shared). Every specialization builds a new map,
/// so a `Fields` value observed by one logger can never change underneath it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Fields(Arc<BTreeMap<String, Value>>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Returns a new set holding every entry of `self` overwritten or extended
    /// by `additions`.
    pub fn merge(&self, additions: &Fields) -> Fields {
        if additions.is_empty() {
            return self.clone();
        }
        let mut merged = (*self.0).clone();
        for (k, v) in additions.iter() {
            merged.insert(k.clone(), v.clone());
        }
        Fields(Arc::new(merged))
    }

    /// Returns a new set with a single entry added.
    pub fn with(&self, key: impl Into<String>, value: impl Into<Value>) -> Fields {
        let mut merged = (*self.0).clone();
        merged.insert(key.into(), value.into());
        Fields(Arc::new(merged))
    }

    /// Returns a new set with [`ERROR_KEY`] bound to the error's message.
    pub fn with_error(&self, err: &(dyn Error + 'static)) -> Fields {
        self.with(ERROR_KEY, err.to_string())
    }

    /// Renders the set the way Go's `%v` prints a map: `map[k:v k2:v2]`.
    pub fn to_map_string(&self) -> String {
        let body = self
            .iter()
            .map(|(k, v)| format!("{}:{}", k, display_value(v)))
            .collect::<Vec<_>>()
            .join(" ");
        format!("map[{}]", body)
    }
}

/// Plain rendering of a value: strings without quotes, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Fields(Arc::new(
            iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ))
    }
}

impl From<BTreeMap<String, Value>> for Fields {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Fields(Arc::new(map))
    }
}

impl From<BTreeMap<String, String>> for Fields {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

/// Builds a [`Fields`] set from `key => value` pairs.
///
/// ```
/// let fields = grpc_logger::fields! { "user" => "alice", "attempt" => 3 };
/// assert_eq!(fields.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => { $crate::logger::Fields::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {
        [$(($key.to_string(), $crate::__private::serde_json::json!($value))),+]
            .into_iter()
            .collect::<$crate::logger::Fields>()
    };
}
