//! Scalar metadata attached to records and collections.
//!
//! Metadata is an unordered map from string keys to scalar values (string,
//! integer, float or boolean). It is stored alongside each record and can be
//! matched by [`Filter`](crate::Filter) expressions.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetadataValue {
    /// Returns the value as a string slice, if it is a string.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an i64, if it is an integer.
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as an f64. Integers are widened.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Int(i) => Some(*i as f64),
            MetadataValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the value as a bool, if it is a boolean.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns true for integer and float values.
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, MetadataValue::Int(_) | MetadataValue::Float(_))
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Int(i) => write!(f, "{i}"),
            MetadataValue::Float(x) => write!(f, "{x}"),
            MetadataValue::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Str(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Str(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        MetadataValue::Int(value as i64)
    }
}

impl From<u32> for MetadataValue {
    fn from(value: u32) -> Self {
        MetadataValue::Int(value as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<f32> for MetadataValue {
    fn from(value: f32) -> Self {
        MetadataValue::Float(value as f64)
    }
}

/// Metadata map attached to a record or a collection.
///
/// # Example
///
/// ```
/// use cairndb_core::Metadata;
///
/// let metadata = Metadata::new()
///     .with_field("policy_type", "hotels")
///     .with_field("max_spend", 300)
///     .with_field("requires_portal", true);
///
/// assert_eq!(metadata.get_str("policy_type"), Some("hotels"));
/// assert_eq!(metadata.get_i64("max_spend"), Some(300));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    data: HashMap<String, MetadataValue>,
}

impl Metadata {
    /// Creates an empty metadata map.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    /// Creates metadata from a HashMap.
    #[inline]
    pub fn from_map(data: HashMap<String, MetadataValue>) -> Self {
        Self { data }
    }

    /// Adds a field. Chainable.
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<MetadataValue>,
    {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Sets a field value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<MetadataValue>,
    {
        self.data.insert(key.into(), value.into());
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.data.get(key)
    }

    #[inline]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    #[inline]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(|v| v.as_i64())
    }

    #[inline]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(|v| v.as_f64())
    }

    #[inline]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(|v| v.as_bool())
    }

    /// Removes a field and returns its value if present.
    #[inline]
    pub fn remove(&mut self, key: &str) -> Option<MetadataValue> {
        self.data.remove(key)
    }

    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns an iterator over the fields, in no particular order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.data.iter()
    }

    #[inline]
    pub fn into_inner(self) -> HashMap<String, MetadataValue> {
        self.data
    }

    /// Rejects NaN and infinite floats, which have no JSON representation.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in &self.data {
            if let MetadataValue::Float(x) = value {
                if !x.is_finite() {
                    return Err(Error::InvalidArgument(format!(
                        "metadata field {key:?} is not a finite number"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<String>,
    V: Into<MetadataValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            data: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for Metadata {
    /// Formats as `{key: value, ...}` with keys sorted, for stable output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.data.keys().collect();
        keys.sort();
        write!(f, "{{")?;
        for (i, key) in keys.into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {}", self.data[key])?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_new() {
        let m = Metadata::new();
        assert!(m.is_empty());
    }

    #[test]
    fn test_metadata_with_field() {
        let m = Metadata::new()
            .with_field("policy_type", "flights")
            .with_field("deadline_days", 15);

        assert_eq!(m.len(), 2);
        assert_eq!(m.get_str("policy_type"), Some("flights"));
        assert_eq!(m.get_i64("deadline_days"), Some(15));
    }

    #[test]
    fn test_metadata_get_typed() {
        let m = Metadata::new()
            .with_field("str_field", "hello")
            .with_field("int_field", 123)
            .with_field("float_field", 3.5)
            .with_field("bool_field", true);

        assert_eq!(m.get_str("str_field"), Some("hello"));
        assert_eq!(m.get_i64("int_field"), Some(123));
        assert_eq!(m.get_f64("int_field"), Some(123.0));
        assert!((m.get_f64("float_field").unwrap() - 3.5).abs() < 1e-10);
        assert_eq!(m.get_bool("bool_field"), Some(true));
        assert_eq!(m.get_str("int_field"), None);
    }

    #[test]
    fn test_metadata_remove() {
        let mut m = Metadata::new().with_field("key", "value");
        assert!(m.contains_key("key"));

        assert!(m.remove("key").is_some());
        assert!(!m.contains_key("key"));
    }

    #[test]
    fn test_metadata_json_keeps_scalar_kinds() {
        let m = Metadata::new()
            .with_field("name", "test")
            .with_field("count", 42)
            .with_field("ratio", 2.0)
            .with_field("flag", false);

        let json = serde_json::to_string(&m).unwrap();
        let restored: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(m, restored);
        assert_eq!(restored.get("count"), Some(&MetadataValue::Int(42)));
        assert_eq!(restored.get("ratio"), Some(&MetadataValue::Float(2.0)));
    }

    #[test]
    fn test_metadata_display_sorted() {
        let m = Metadata::new()
            .with_field("policy_type", "hotels")
            .with_field("max_spend", 300);
        assert_eq!(m.to_string(), "{max_spend: 300, policy_type: hotels}");
    }

    #[test]
    fn test_validate_rejects_non_finite_floats() {
        assert!(Metadata::new().with_field("score", 0.5).validate().is_ok());
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let m = Metadata::new().with_field("k", "v").with_field("score", bad);
            assert!(matches!(m.validate(), Err(Error::InvalidArgument(_))));
        }
    }
}
