use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

impl From<Value> for AttributeValue {
    /// Arrays and objects are kept as their compact JSON text.
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            nested @ (Value::Array(_) | Value::Object(_)) => Self::String(nested.to_string()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

/// Display metadata for one area, keyed by property name.
///
/// Keys are kept sorted so that serialized attribute tables are byte-stable.
///
/// # Examples
///
/// ```
/// use nearpoly_types::attributes::AttributeRecord;
///
/// let mut record = AttributeRecord::new();
/// record.insert("name", "Kiel");
/// assert_eq!(record.get("name").and_then(|v| v.as_str()), Some("Kiel"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeRecord(BTreeMap<String, AttributeValue>);

impl AttributeRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from GeoJSON feature properties.
    pub fn from_properties(properties: Map<String, Value>) -> Self {
        Self(
            properties
                .into_iter()
                .map(|(key, value)| (key, AttributeValue::from(value)))
                .collect(),
        )
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_properties_flattens_nested() {
        let props = json!({
            "name": "Nordfriesland",
            "code": 1054,
            "active": true,
            "note": null,
            "tags": ["a", "b"]
        });
        let Value::Object(map) = props else {
            panic!("expected object");
        };

        let record = AttributeRecord::from_properties(map);
        assert_eq!(record.len(), 5);
        assert_eq!(record.get("code").and_then(|v| v.as_f64()), Some(1054.0));
        assert_eq!(
            record.get("tags"),
            Some(&AttributeValue::String(r#"["a","b"]"#.to_string()))
        );
        assert_eq!(record.get("note"), Some(&AttributeValue::Null));
    }

    #[test]
    fn test_serialization_is_sorted_and_preserves_integers() {
        let mut record = AttributeRecord::new();
        record.insert("zeta", 7i64);
        record.insert("alpha", "x");

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"alpha":"x","zeta":7}"#);

        let parsed: AttributeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_null_deserializes_as_null() {
        let parsed: AttributeRecord = serde_json::from_str(r#"{"empty":null}"#).unwrap();
        assert_eq!(parsed.get("empty"), Some(&AttributeValue::Null));
    }
}
