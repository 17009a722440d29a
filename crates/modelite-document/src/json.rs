// Conversions between records and JSON documents

use modelite_core::{Error, Record, Result, Value, PRIMARY_KEY};
use serde_json::{Map, Number, Value as Json};

/// A stored document
pub type Document = Map<String, Json>;

pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number(Number::from(*i)),
        Value::Float(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
        Value::String(s) => Json::String(s.clone()),
        Value::List(items) => Json::Array(items.iter().map(to_json).collect()),
    }
}

/// Convert a JSON value. Extended-JSON object ids (`{"$oid": "..."}`) become
/// strings; other nested documents are rejected.
pub fn from_json(json: &Json) -> Result<Value> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(from_json).collect::<Result<_>>()?),
        Json::Object(map) => match map.get("$oid").and_then(Json::as_str) {
            Some(oid) if map.len() == 1 => Value::String(oid.to_string()),
            _ => {
                return Err(Error::Serialization(
                    "Nested documents cannot be represented as record values".to_string(),
                ))
            }
        },
    })
}

/// Build a document from a record, renaming `id` to `id_field`
pub fn to_document(record: &Record, id_field: &str) -> Document {
    record
        .iter()
        .map(|(field, value)| (store_field(field, id_field).to_string(), to_json(value)))
        .collect()
}

/// Build a record from a document, renaming `id_field` to `id`
pub fn to_record(document: &Document, id_field: &str) -> Result<Record> {
    document
        .iter()
        .map(|(field, value)| {
            let name = if field == id_field { PRIMARY_KEY } else { field.as_str() };
            Ok((name.to_string(), from_json(value)?))
        })
        .collect()
}

/// Field name as known to the store
pub fn store_field<'a>(field: &'a str, id_field: &'a str) -> &'a str {
    if field == PRIMARY_KEY {
        id_field
    } else {
        field
    }
}
