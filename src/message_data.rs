use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Typed key/value payload carried by a [`Message`](crate::Message).
///
/// Values are stored as `serde_json::Value`, so anything serializable can
/// ride along. The typed getters are forgiving: a missing key or a value of
/// the wrong type yields the default instead of an error, since payload
/// lookups happen inside listeners where there is nobody left to report to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageData {
    entries: HashMap<String, Value>,
}

impl MessageData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Store any serializable value under `key`.
    ///
    /// Returns the serialization error if the value cannot be represented
    /// as JSON (maps with non-string keys, for instance).
    pub fn put<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.entries.insert(key.into(), value);
        Ok(())
    }

    /// Deserialize the value under `key`, or `None` when absent or of the
    /// wrong shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn put_value(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn put_bool(&mut self, key: impl Into<String>, value: bool) {
        self.entries.insert(key.into(), Value::from(value));
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get_bool_or(key, false)
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        match self.entries.get(key) {
            Some(Value::Bool(b)) => *b,
            _ => default,
        }
    }

    pub fn put_i64(&mut self, key: impl Into<String>, value: i64) {
        self.entries.insert(key.into(), Value::from(value));
    }

    pub fn get_i64(&self, key: &str) -> i64 {
        self.get_i64_or(key, 0)
    }

    pub fn get_i64_or(&self, key: &str, default: i64) -> i64 {
        self.entries
            .get(key)
            .and_then(Value::as_i64)
            .unwrap_or(default)
    }

    pub fn put_f64(&mut self, key: impl Into<String>, value: f64) {
        self.entries.insert(key.into(), Value::from(value));
    }

    pub fn get_f64(&self, key: &str) -> f64 {
        self.get_f64_or(key, 0.0)
    }

    pub fn get_f64_or(&self, key: &str, default: f64) -> f64 {
        self.entries
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), Value::from(value.into()));
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    pub fn get_string_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_string(key).unwrap_or(default)
    }
}
