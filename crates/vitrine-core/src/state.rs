//! The synchronizable state tree.
//!
//! [`StateValue`] is shaped like a JSON value but may additionally carry raw
//! binary leaves ([`StateValue::Bytes`]), which `serde_json::Value` cannot
//! represent. Binary leaves never reach the wire as JSON: the splitter in
//! [`crate::buffers`] moves them into an out-of-band buffer list first.
//!
//! [`StateDict`] is the ordered key → value map that mirrors a model's
//! synchronizable fields. Key order is preserved (insertion order), matching
//! the observable order of updates the front end receives.

use bytes::Bytes;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::errors::StateError;

/// A JSON-compatible value that may contain binary leaves.
#[derive(Clone, Debug, PartialEq)]
pub enum StateValue {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number.
    Number(serde_json::Number),
    /// JSON string.
    String(String),
    /// A raw binary payload. Transmitted out-of-band, never as JSON.
    Bytes(Bytes),
    /// An ordered sequence.
    Array(Vec<StateValue>),
    /// An ordered map.
    Object(StateDict),
}

impl StateValue {
    /// Build a state value from a plain JSON value. Lossless; the result
    /// contains no [`StateValue::Bytes`] leaves.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Object(StateDict::from_json_map(map)),
        }
    }

    /// Convert into a plain JSON value.
    ///
    /// Fails with [`StateError::InvalidShape`] if the tree still contains a
    /// binary leaf; callers are expected to split buffers out first.
    pub fn into_json(self) -> Result<Value, StateError> {
        match self {
            Self::Null => Ok(Value::Null),
            Self::Bool(b) => Ok(Value::Bool(b)),
            Self::Number(n) => Ok(Value::Number(n)),
            Self::String(s) => Ok(Value::String(s)),
            Self::Bytes(_) => Err(StateError::InvalidShape(
                "binary payload in plain state; split buffers before serializing".to_string(),
            )),
            Self::Array(items) => Ok(Value::Array(
                items
                    .into_iter()
                    .map(Self::into_json)
                    .collect::<Result<_, _>>()?,
            )),
            Self::Object(dict) => Ok(Value::Object(dict.into_json_map()?)),
        }
    }

    /// Serialize an arbitrary value into a state tree via serde.
    ///
    /// This is the entry point for structured-record models: any type that
    /// derives [`serde::Serialize`] can be captured. Serialization failures
    /// (non-string map keys, unrepresentable values) surface as
    /// [`StateError::InvalidShape`].
    pub fn from_serialize<T: serde::Serialize>(value: &T) -> Result<Self, StateError> {
        let json =
            serde_json::to_value(value).map_err(|e| StateError::InvalidShape(e.to_string()))?;
        Ok(Self::from_json(json))
    }

    /// `true` for [`StateValue::Bytes`].
    #[must_use]
    pub fn is_bytes(&self) -> bool {
        matches!(self, Self::Bytes(_))
    }
}

impl From<Value> for StateValue {
    fn from(value: Value) -> Self {
        Self::from_json(value)
    }
}

impl From<Bytes> for StateValue {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&str> for StateValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for StateValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for StateValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<bool> for StateValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StateDict — ordered key → value map
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered mapping from state key to [`StateValue`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateDict(IndexMap<String, StateValue>);

impl StateDict {
    /// Create an empty dict.
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Build from a JSON object, preserving key order.
    #[must_use]
    pub fn from_json_map(map: Map<String, Value>) -> Self {
        Self(
            map.into_iter()
                .map(|(k, v)| (k, StateValue::from_json(v)))
                .collect(),
        )
    }

    /// Convert into a JSON object. Fails if any value still holds bytes.
    pub fn into_json_map(self) -> Result<Map<String, Value>, StateError> {
        self.0
            .into_iter()
            .map(|(k, v)| Ok((k, v.into_json()?)))
            .collect()
    }

    /// Insert a value, returning the previous value for the key if any.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<StateValue>,
    ) -> Option<StateValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Insert only if the key is absent.
    pub fn insert_default(&mut self, key: impl Into<String>, value: impl Into<StateValue>) {
        let _ = self.0.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Look up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.0.get(key)
    }

    /// Look up a value mutably.
    #[must_use]
    pub fn get_mut(&mut self, key: &str) -> Option<&mut StateValue> {
        self.0.get_mut(key)
    }

    /// Remove a value.
    pub fn remove(&mut self, key: &str) -> Option<StateValue> {
        self.0.shift_remove(key)
    }

    /// `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Merge `other` over `self`: keys from `other` win.
    pub fn merge(&mut self, other: StateDict) {
        for (key, value) in other.0 {
            let _ = self.0.insert(key, value);
        }
    }

    /// Keep only keys for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|key, _| keep(key));
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if the dict has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &StateValue)> {
        self.0.iter()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl IntoIterator for StateDict {
    type Item = (String, StateValue);
    type IntoIter = indexmap::map::IntoIter<String, StateValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, StateValue)> for StateDict {
    fn from_iter<I: IntoIterator<Item = (String, StateValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn json_round_trip_preserves_order() {
        let map = json!({"b": 1, "a": 2, "c": [true, null]});
        let Value::Object(map) = map else {
            unreachable!()
        };
        let dict = StateDict::from_json_map(map.clone());
        assert_eq!(
            dict.keys().collect::<Vec<_>>(),
            vec!["b", "a", "c"],
            "insertion order must survive"
        );
        assert_eq!(dict.into_json_map().unwrap(), map);
    }

    #[test]
    fn bytes_refuse_json_conversion() {
        let value = StateValue::Bytes(Bytes::from_static(b"01"));
        assert_matches!(value.into_json(), Err(StateError::InvalidShape(_)));
    }

    #[test]
    fn merge_prefers_other() {
        let mut base = StateDict::new();
        let _ = base.insert("x", 1i64);
        let _ = base.insert("y", 2i64);
        let mut over = StateDict::new();
        let _ = over.insert("y", 9i64);
        base.merge(over);
        assert_eq!(base.get("y"), Some(&StateValue::from(9i64)));
        assert_eq!(base.get("x"), Some(&StateValue::from(1i64)));
    }

    #[test]
    fn from_serialize_captures_records() {
        #[derive(serde::Serialize)]
        struct Point {
            x: i32,
            y: i32,
        }
        let value = StateValue::from_serialize(&Point { x: 1, y: -2 }).unwrap();
        let StateValue::Object(dict) = value else {
            panic!("expected object");
        };
        assert_eq!(dict.get("x"), Some(&StateValue::from(1i64)));
    }

    #[test]
    fn insert_default_keeps_existing() {
        let mut dict = StateDict::new();
        let _ = dict.insert("_esm", "user module");
        dict.insert_default("_esm", "fallback");
        assert_eq!(dict.get("_esm"), Some(&StateValue::from("user module")));
    }
}
