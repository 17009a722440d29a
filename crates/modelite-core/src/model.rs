//! Model handles, records and field specifications.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Name of the primary key field of every record.
pub const PRIMARY_KEY: &str = "id";

/// Handle to a model resolved by a backend.
///
/// Cheap to clone; queries hold one of these and never own the model itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelRef {
    name: Arc<str>,
}

impl ModelRef {
    /// Create a handle for the named model.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
        }
    }

    /// Model name as known to the backend.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A single entity: an ordered map of field names to values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Value of `field`, if present
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set `field`, returning the previous value
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Remove `field`, returning its value
    pub fn unset(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Primary key, when assigned
    pub fn id(&self) -> Option<&Value> {
        self.fields.get(PRIMARY_KEY).filter(|v| !v.is_null())
    }

    /// Iterate over `(field, value)` pairs in field-name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Keep only the named fields (the primary key is always kept)
    pub fn project(&self, fields: &std::collections::BTreeSet<String>) -> Record {
        if fields.is_empty() {
            return self.clone();
        }
        let fields = self
            .fields
            .iter()
            .filter(|(name, _)| name.as_str() == PRIMARY_KEY || fields.contains(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Record { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Declared type of a model field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Any,
    Bool,
    Int,
    Float,
    String,
    List,
}

impl FieldType {
    /// Whether `value` is acceptable for a field of this type (`Null` always is).
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldType::Any, _)
                | (_, Value::Null)
                | (FieldType::Bool, Value::Bool(_))
                | (FieldType::Int, Value::Int(_))
                | (FieldType::Float, Value::Float(_) | Value::Int(_))
                | (FieldType::String, Value::String(_))
                | (FieldType::List, Value::List(_))
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Any => "any",
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::List => "list",
        };
        write!(f, "{}", name)
    }
}

/// Declared field of a model, used for schema validation and introspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_record_builder_and_id() {
        let record = Record::new().with("id", 7).with("name", "Alice");
        assert_eq!(record.id(), Some(&Value::Int(7)));
        assert_eq!(record.get("name"), Some(&Value::from("Alice")));
        assert_eq!(Record::new().with("id", Value::Null).id(), None);
    }

    #[test]
    fn test_project_keeps_primary_key() {
        let record = Record::new().with("id", 1).with("a", 1).with("b", 2);
        let fields: BTreeSet<String> = ["a".to_string()].into_iter().collect();
        let projected = record.project(&fields);
        assert_eq!(projected.len(), 2);
        assert!(projected.get("b").is_none());
    }

    #[test]
    fn test_field_type_accepts() {
        assert!(FieldType::Float.accepts(&Value::Int(1)));
        assert!(FieldType::String.accepts(&Value::Null));
        assert!(!FieldType::Int.accepts(&Value::from("1")));
    }
}
