use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of entries a metadata map may hold.
pub const MAX_ENTRIES: usize = 32;
/// Maximum length of a metadata key, in bytes.
pub const MAX_KEY_LEN: usize = 64;
/// Maximum length of a single text value, in bytes.
pub const MAX_TEXT_LEN: usize = 1024;
/// Maximum size of the whole map once serialized to JSON, in bytes.
pub const MAX_SERIALIZED_BYTES: usize = 8192;

/// A single metadata value. Scalars are kept as scalars; anything structured must be
/// a JSON array or object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
}

impl MetaValue {
    fn check(&self, key: &str) -> Result<(), ValidationError> {
        match self {
            MetaValue::Float(f) if !f.is_finite() => Err(ValidationError::new(
                "metadata",
                format!("value for '{key}' is not a finite number"),
            )),
            MetaValue::Text(text) if text.len() > MAX_TEXT_LEN => Err(ValidationError::new(
                "metadata",
                format!("text value for '{key}' exceeds {MAX_TEXT_LEN} bytes"),
            )),
            MetaValue::Json(value) if !(value.is_array() || value.is_object()) => {
                Err(ValidationError::new(
                    "metadata",
                    format!("value for '{key}' must be a scalar, array or object (null is not allowed)"),
                ))
            }
            _ => Ok(()),
        }
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Bool(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Int(value)
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Float(value)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Text(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::Text(value)
    }
}

/// Arbitrary key-value context attached to a `QueryEvent`.
///
/// Keys are kept ordered so that the stored JSON is stable, and the container enforces
/// size limits on every insert as well as in `validate` (for maps that arrive deserialized).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, MetaValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, rejecting it if the map would violate any limit.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<MetaValue>,
    ) -> Result<(), ValidationError> {
        let key = key.into();
        let value = value.into();
        check_key(&key)?;
        value.check(&key)?;
        if !self.0.contains_key(&key) && self.0.len() >= MAX_ENTRIES {
            return Err(ValidationError::new(
                "metadata",
                format!("more than {MAX_ENTRIES} entries"),
            ));
        }
        let previous = self.0.insert(key.clone(), value);
        if let Err(e) = self.check_size() {
            // Undo the insert so a rejected value never lingers.
            match previous {
                Some(old) => self.0.insert(key, old),
                None => self.0.remove(&key),
            };
            return Err(e);
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetaValue)> {
        self.0.iter()
    }

    /// Re-checks every limit. Used on maps that were deserialized rather than built
    /// through `insert`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.0.len() > MAX_ENTRIES {
            return Err(ValidationError::new(
                "metadata",
                format!("more than {MAX_ENTRIES} entries"),
            ));
        }
        for (key, value) in &self.0 {
            check_key(key)?;
            value.check(key)?;
        }
        self.check_size()
    }

    /// The JSON representation stored in the event log.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        let metadata: Metadata = serde_json::from_value(value)
            .map_err(|e| ValidationError::new("metadata", e.to_string()))?;
        metadata.validate()?;
        Ok(metadata)
    }

    fn check_size(&self) -> Result<(), ValidationError> {
        let size = serde_json::to_vec(&self.0)
            .map_err(|e| ValidationError::new("metadata", e.to_string()))?
            .len();
        if size > MAX_SERIALIZED_BYTES {
            return Err(ValidationError::new(
                "metadata",
                format!("serialized size {size} exceeds {MAX_SERIALIZED_BYTES} bytes"),
            ));
        }
        Ok(())
    }
}

fn check_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(ValidationError::new(
            "metadata",
            format!("keys must be 1-{MAX_KEY_LEN} bytes long"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_scalars_and_structures() {
        let metadata: Metadata = serde_json::from_value(json!({
            "chat_id": 42,
            "model": "gpt",
            "streamed": true,
            "latency_ratio": 0.5,
            "tags": ["btc", "scalp"],
        }))
        .unwrap();

        assert_eq!(metadata.get("chat_id"), Some(&MetaValue::Int(42)));
        assert_eq!(metadata.get("model"), Some(&MetaValue::Text("gpt".into())));
        assert_eq!(metadata.get("streamed"), Some(&MetaValue::Bool(true)));
        assert_eq!(metadata.get("latency_ratio"), Some(&MetaValue::Float(0.5)));
        assert!(matches!(metadata.get("tags"), Some(MetaValue::Json(_))));
        assert!(metadata.validate().is_ok());
    }

    #[test]
    fn keys_are_ordered_in_storage() {
        let mut metadata = Metadata::new();
        metadata.insert("zeta", 1i64).unwrap();
        metadata.insert("alpha", 2i64).unwrap();
        assert_eq!(metadata.to_json().to_string(), r#"{"alpha":2,"zeta":1}"#);
    }

    #[test]
    fn null_values_are_rejected() {
        let err = Metadata::from_json(json!({ "missing": null })).unwrap_err();
        assert_eq!(err.field, "metadata");
    }

    #[test]
    fn entry_limit_is_enforced() {
        let mut metadata = Metadata::new();
        for i in 0..MAX_ENTRIES {
            metadata.insert(format!("k{i}"), i as i64).unwrap();
        }
        assert!(metadata.insert("one_more", 1i64).is_err());
        // Overwriting an existing key is still allowed at the limit.
        assert!(metadata.insert("k0", 7i64).is_ok());
    }

    #[test]
    fn oversized_text_is_rejected() {
        let mut metadata = Metadata::new();
        let long = "x".repeat(MAX_TEXT_LEN + 1);
        assert!(metadata.insert("note", long.as_str()).is_err());
        assert!(metadata.is_empty());
    }

    #[test]
    fn total_size_limit_rolls_back_the_insert() {
        let mut metadata = Metadata::new();
        let chunk = "y".repeat(MAX_TEXT_LEN);
        let mut accepted = 0;
        for i in 0..MAX_ENTRIES {
            if metadata.insert(format!("chunk{i}"), chunk.as_str()).is_err() {
                break;
            }
            accepted += 1;
        }
        assert!(accepted < MAX_ENTRIES);
        assert_eq!(metadata.len(), accepted);
        assert!(metadata.validate().is_ok());
    }
}
