// In-memory tables and the row-level update operations

use modelite_core::query::{Assignment, UpdateOp};
use modelite_core::{Error, FieldSpec, Record, Result, Value, PRIMARY_KEY};
use serde::{Deserialize, Serialize};

/// Rows of one model, in insertion order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Declared fields; empty for a schemaless model
    pub fields: Vec<FieldSpec>,
    pub rows: Vec<Record>,
    next_id: i64,
}

impl Table {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            rows: Vec::new(),
            next_id: 1,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn position(&self, id: &Value) -> Option<usize> {
        self.rows.iter().position(|row| row.id() == Some(id))
    }

    /// Insert `record`, or replace the row with the same primary key.
    /// Records without a key get the next auto-increment id.
    pub fn upsert(&mut self, model: &str, mut record: Record) -> Result<Record> {
        self.validate(model, &record)?;
        let id = match record.id() {
            Some(id) => id.clone(),
            None => {
                let id = Value::Int(self.next_id);
                record.set(PRIMARY_KEY, id.clone());
                id
            }
        };
        if let Value::Int(n) = &id {
            self.next_id = self.next_id.max(n.saturating_add(1));
        }
        match self.position(&id) {
            Some(idx) => self.rows[idx] = record.clone(),
            None => self.rows.push(record.clone()),
        }
        Ok(record)
    }

    /// Check `record` against the declared fields
    pub fn validate(&self, model: &str, record: &Record) -> Result<()> {
        if self.is_dynamic() {
            return Ok(());
        }
        for (name, value) in record.iter() {
            if name == PRIMARY_KEY {
                continue;
            }
            let spec = self
                .fields
                .iter()
                .find(|f| &f.name == name)
                .ok_or_else(|| Error::ModelSchema {
                    model: model.to_string(),
                    field: name.clone(),
                })?;
            if !spec.field_type.accepts(value) {
                return Err(Error::Query(format!(
                    "Field '{}' of '{}' expects {}, got {}",
                    name,
                    model,
                    spec.field_type,
                    value.type_name()
                )));
            }
        }
        if let Some(missing) = self
            .fields
            .iter()
            .find(|f| f.required && record.get(&f.name).map_or(true, Value::is_null))
        {
            return Err(Error::Query(format!(
                "Field '{}' of '{}' is required",
                missing.name, model
            )));
        }
        Ok(())
    }
}

/// Apply normalized assignments to a single row
pub fn apply(row: &mut Record, assignments: &[Assignment]) -> Result<()> {
    for assignment in assignments {
        let field = assignment.field.as_str();
        if field == PRIMARY_KEY {
            return Err(Error::Query("The primary key cannot be updated".to_string()));
        }
        let current = row.get(field).cloned().unwrap_or_default();
        let next = match assignment.op {
            UpdateOp::Set => assignment.value.clone(),
            UpdateOp::Incr => increment(field, &current, &assignment.value)?,
            UpdateOp::Push => append(field, current, assignment.value.clone())?,
        };
        row.set(field, next);
    }
    Ok(())
}

// A missing or null field counts as zero
fn increment(field: &str, current: &Value, by: &Value) -> Result<Value> {
    match (current, by) {
        (Value::Null, Value::Int(b)) => Ok(Value::Int(*b)),
        (Value::Null, Value::Float(b)) => Ok(Value::Float(*b)),
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| Error::Query(format!("Integer overflow incrementing '{}'", field))),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 + b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + *b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
        _ => Err(Error::Query(format!(
            "Cannot increment field '{}' of type {} by {}",
            field,
            current.type_name(),
            by.type_name()
        ))),
    }
}

// A missing or null field becomes a new list
fn append(field: &str, current: Value, item: Value) -> Result<Value> {
    match current {
        Value::Null => Ok(Value::List(vec![item])),
        Value::List(mut items) => {
            items.push(item);
            Ok(Value::List(items))
        }
        other => Err(Error::Query(format!(
            "Cannot push onto field '{}' of type {}",
            field,
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelite_core::query::prepare_update;
    use modelite_core::FieldType;

    #[test]
    fn test_auto_increment_ids() {
        let mut table = Table::new(vec![]);
        let a = table.upsert("Log", Record::new().with("msg", "a")).unwrap();
        let b = table.upsert("Log", Record::new().with("msg", "b")).unwrap();
        assert_eq!(a.id(), Some(&Value::Int(1)));
        assert_eq!(b.id(), Some(&Value::Int(2)));

        table.upsert("Log", Record::new().with("id", 10)).unwrap();
        let c = table.upsert("Log", Record::new()).unwrap();
        assert_eq!(c.id(), Some(&Value::Int(11)));
    }

    #[test]
    fn test_upsert_replaces_same_key() {
        let mut table = Table::new(vec![]);
        table.upsert("Log", Record::new().with("id", 1).with("v", 1)).unwrap();
        table.upsert("Log", Record::new().with("id", 1).with("v", 2)).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].get("v"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_validation() {
        let table = Table::new(vec![
            FieldSpec::new("name", FieldType::String).required(),
            FieldSpec::new("age", FieldType::Int),
        ]);
        assert!(table.validate("User", &Record::new().with("name", "a")).is_ok());
        assert!(matches!(
            table.validate("User", &Record::new().with("name", "a").with("email", "x")),
            Err(Error::ModelSchema { .. })
        ));
        assert!(table.validate("User", &Record::new().with("name", "a").with("age", "old")).is_err());
        assert!(table.validate("User", &Record::new().with("age", 3)).is_err());
    }

    #[test]
    fn test_apply_update_ops() {
        let mut row = Record::new().with("id", 1).with("visits", 2).with("tags", vec!["a"]);
        let data = prepare_update([
            ("visits__incr", Value::Int(3)),
            ("tags__push", Value::from("b")),
            ("score__incr", Value::Float(0.5)),
            ("notes__push", Value::from("first")),
            ("name", Value::from("Zed")),
        ])
        .unwrap();
        apply(&mut row, &data).unwrap();
        assert_eq!(row.get("visits"), Some(&Value::Int(5)));
        assert_eq!(row.get("tags"), Some(&Value::from(vec!["a", "b"])));
        assert_eq!(row.get("score"), Some(&Value::Float(0.5)));
        assert_eq!(row.get("notes"), Some(&Value::from(vec!["first"])));
        assert_eq!(row.get("name"), Some(&Value::from("Zed")));
    }

    #[test]
    fn test_apply_rejects_type_mismatch() {
        let mut row = Record::new().with("id", 1).with("name", "a");
        let incr = prepare_update([("name__incr", 1)]).unwrap();
        assert!(matches!(apply(&mut row, &incr), Err(Error::Query(_))));
        let push = prepare_update([("name__push", 1)]).unwrap();
        assert!(matches!(apply(&mut row, &push), Err(Error::Query(_))));
        let key = prepare_update([("id", 2)]).unwrap();
        assert!(apply(&mut row, &key).is_err());
    }
}
