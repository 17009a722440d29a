//! Query → filter/update document translation.
//!
//! Leaves map to the usual query operators (`$ne`, `$gt`, `$in`, ...).
//! `contains` on a string becomes an escaped `$regex`; on any other value it
//! becomes an equality, which document stores evaluate as array membership.

use crate::json::{store_field, to_json};
use crate::store::{FindCommand, SortKey, UpdateCommand};
use modelite_core::query::{Assignment, Combinator, Direction, Filter, FilterGroup, Operator, Predicate, UpdateOp};
use modelite_core::{Error, Query, Result, Value, PRIMARY_KEY};
use serde_json::{json, Map, Value as Json};

const BACKEND: &str = "document";

/// Filter document of a group. An empty group of either combinator matches
/// everything.
pub fn filter_document(group: &FilterGroup, id_field: &str) -> Result<Json> {
    let mut children = group
        .children()
        .iter()
        .map(|child| match child {
            Predicate::Filter(filter) => leaf(filter, id_field),
            Predicate::Group(inner) => filter_document(inner, id_field),
        })
        .collect::<Result<Vec<Json>>>()?;

    Ok(match (group.combinator(), children.len()) {
        (_, 0) => json!({}),
        (_, 1) => children.remove(0),
        (Combinator::And, _) => json!({ "$and": children }),
        (Combinator::Or, _) => json!({ "$or": children }),
    })
}

fn leaf(filter: &Filter, id_field: &str) -> Result<Json> {
    let field = store_field(filter.field(), id_field);
    let value = to_json(filter.value());
    let condition = match filter.operator() {
        Operator::Eq => value,
        Operator::Ne => json!({ "$ne": value }),
        Operator::Lt => json!({ "$lt": value }),
        Operator::Lte => json!({ "$lte": value }),
        Operator::Gt => json!({ "$gt": value }),
        Operator::Gte => json!({ "$gte": value }),
        Operator::In => json!({ "$in": as_array(value) }),
        Operator::Nin => json!({ "$nin": as_array(value) }),
        Operator::Contains => match filter.value() {
            Value::String(needle) => json!({ "$regex": escape_regex(needle) }),
            _ => value,
        },
        op @ (Operator::Incr | Operator::Push) => return Err(Error::unsupported_operator(op, BACKEND)),
    };
    let mut document = Map::new();
    document.insert(field.to_string(), condition);
    Ok(Json::Object(document))
}

// A scalar `$in` operand is a one-element array
fn as_array(value: Json) -> Json {
    match value {
        Json::Array(_) => value,
        other => Json::Array(vec![other]),
    }
}

/// Escape regular expression metacharacters so `text` matches literally
pub fn escape_regex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Update document with `$set`, `$inc` and `$push` sections.
///
/// Several pushes onto the same field are merged with `$each`.
pub fn update_document(data: &[Assignment], id_field: &str) -> Result<Json> {
    if data.is_empty() {
        return Err(Error::Query("Update without any assignment".to_string()));
    }
    let mut set = Map::new();
    let mut inc = Map::new();
    let mut push: Map<String, Json> = Map::new();
    for assignment in data {
        if assignment.field == PRIMARY_KEY {
            return Err(Error::Query("The primary key cannot be updated".to_string()));
        }
        let field = store_field(&assignment.field, id_field).to_string();
        let value = to_json(&assignment.value);
        match assignment.op {
            UpdateOp::Set => {
                set.insert(field, value);
            }
            UpdateOp::Incr => {
                inc.insert(field, value);
            }
            UpdateOp::Push => match push.remove(&field) {
                None => {
                    push.insert(field, value);
                }
                Some(Json::Object(mut each)) if each.contains_key("$each") => {
                    if let Some(Json::Array(items)) = each.get_mut("$each") {
                        items.push(value);
                    }
                    push.insert(field, Json::Object(each));
                }
                Some(previous) => {
                    push.insert(field, json!({ "$each": [previous, value] }));
                }
            },
        }
    }

    let mut update = Map::new();
    for (key, section) in [("$set", set), ("$inc", inc), ("$push", push)] {
        if !section.is_empty() {
            update.insert(key.to_string(), Json::Object(section));
        }
    }
    Ok(Json::Object(update))
}

pub fn sort_keys(query: &Query, id_field: &str) -> Vec<SortKey> {
    query
        .ordering()
        .iter()
        .map(|order| {
            let direction = match order.direction {
                Direction::Asc => 1,
                Direction::Desc => -1,
            };
            (store_field(&order.field, id_field).to_string(), direction)
        })
        .collect()
}

/// Full find command for `query`
pub fn find_command(query: &Query, id_field: &str) -> Result<FindCommand> {
    let projection = if query.selected_fields().is_empty() {
        None
    } else {
        let mut fields = Map::new();
        fields.insert(id_field.to_string(), json!(1));
        for field in query.selected_fields() {
            fields.insert(store_field(field, id_field).to_string(), json!(1));
        }
        Some(Json::Object(fields))
    };
    Ok(FindCommand {
        collection: query.model().name().to_string(),
        filter: filter_document(&query.predicate(), id_field)?,
        sort: sort_keys(query, id_field),
        skip: query.offset_value().map(|n| n as u64),
        limit: query.limit_value().map(|n| n as u64),
        projection,
    })
}

/// Update command for `query`; its window is ignored
pub fn update_command(query: &Query, data: &[Assignment], id_field: &str) -> Result<UpdateCommand> {
    Ok(UpdateCommand {
        collection: query.model().name().to_string(),
        filter: filter_document(&query.predicate(), id_field)?,
        update: update_document(data, id_field)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelite_core::query::prepare_update;
    use modelite_core::{and, or};

    fn translate(filter: Filter) -> Json {
        filter_document(&and(vec![filter]), "_id").unwrap()
    }

    #[test]
    fn test_every_read_operator() {
        let cases = vec![
            (Filter::new("a", Operator::Eq, 1), json!({"a": 1})),
            (Filter::new("a", Operator::Ne, 1), json!({"a": {"$ne": 1}})),
            (Filter::new("a", Operator::Lt, 1), json!({"a": {"$lt": 1}})),
            (Filter::new("a", Operator::Lte, 1), json!({"a": {"$lte": 1}})),
            (Filter::new("a", Operator::Gt, 1), json!({"a": {"$gt": 1}})),
            (Filter::new("a", Operator::Gte, 1), json!({"a": {"$gte": 1}})),
            (Filter::new("a", Operator::In, vec![1, 2]), json!({"a": {"$in": [1, 2]}})),
            (Filter::new("a", Operator::In, 3), json!({"a": {"$in": [3]}})),
            (Filter::new("a", Operator::Nin, vec![1]), json!({"a": {"$nin": [1]}})),
            (Filter::new("a", Operator::Contains, "x.y"), json!({"a": {"$regex": "x\\.y"}})),
            (Filter::new("tags", Operator::Contains, 5), json!({"tags": 5})),
            (Filter::new("id", Operator::Eq, "k"), json!({"_id": "k"})),
        ];
        for (filter, expected) in cases {
            assert_eq!(translate(filter.clone()), expected, "{}", filter);
        }
    }

    #[test]
    fn test_groups() {
        let group = and(vec![
            Predicate::from(Filter::eq("a", 1)),
            or(vec![Filter::eq("b", 2), Filter::eq("c", 3)]).into(),
        ]);
        assert_eq!(
            filter_document(&group, "_id").unwrap(),
            json!({"$and": [{"a": 1}, {"$or": [{"b": 2}, {"c": 3}]}]})
        );
        assert_eq!(filter_document(&and(Vec::<Filter>::new()), "_id").unwrap(), json!({}));
        assert_eq!(filter_document(&or(Vec::<Filter>::new()), "_id").unwrap(), json!({}));
        let nested = or(vec![
            Predicate::from(Filter::eq("a", 1)),
            and(Vec::<Filter>::new()).into(),
        ]);
        assert_eq!(
            filter_document(&nested, "_id").unwrap(),
            json!({"$or": [{"a": 1}, {}]})
        );
    }

    #[test]
    fn test_update_operators_rejected_in_filters() {
        let group = and(vec![Filter::new("a", Operator::Push, 1)]);
        assert!(matches!(filter_document(&group, "_id"), Err(Error::Query(_))));
    }

    #[test]
    fn test_update_document() {
        let data = prepare_update([
            ("name", Value::from("x")),
            ("visits__incr", Value::Int(1)),
            ("tags__push", Value::from("a")),
            ("tags__push", Value::from("b")),
            ("tags__push", Value::from("c")),
        ])
        .unwrap();
        assert_eq!(
            update_document(&data, "_id").unwrap(),
            json!({
                "$set": {"name": "x"},
                "$inc": {"visits": 1},
                "$push": {"tags": {"$each": ["a", "b", "c"]}}
            })
        );
        let key = prepare_update([("id", 1)]).unwrap();
        assert!(update_document(&key, "_id").is_err());
    }
}
