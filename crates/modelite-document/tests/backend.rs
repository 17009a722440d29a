// Integration tests for the document backend over a recording store

use modelite_core::{and, or, Backend, Error, FieldSpec, FieldType, Filter, ModelRef, Predicate, Query, Record, Value};
use modelite_document::{Document, DocumentBackend, DocumentConfig, DocumentStore, FindCommand, UpdateCommand};
use serde_json::{json, Value as Json};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct RecordingStore {
    finds: Mutex<Vec<FindCommand>>,
    updates: Mutex<Vec<UpdateCommand>>,
    deletes: Mutex<Vec<Json>>,
    replaced: Mutex<Vec<(Json, Document)>>,
    documents: Vec<Document>,
}

impl DocumentStore for RecordingStore {
    fn find(&self, command: &FindCommand) -> modelite_core::Result<Vec<Document>> {
        self.finds.lock().unwrap().push(command.clone());
        Ok(self.documents.clone())
    }

    fn count(&self, _collection: &str, _filter: &Json) -> modelite_core::Result<usize> {
        Ok(self.documents.len())
    }

    fn update_many(&self, command: &UpdateCommand) -> modelite_core::Result<usize> {
        self.updates.lock().unwrap().push(command.clone());
        Ok(self.documents.len())
    }

    fn delete_many(&self, _collection: &str, filter: &Json) -> modelite_core::Result<usize> {
        self.deletes.lock().unwrap().push(filter.clone());
        Ok(1)
    }

    fn insert_one(&self, _collection: &str, _document: Document) -> modelite_core::Result<Json> {
        Ok(json!({"$oid": "65a1f0c2"}))
    }

    fn replace_one(&self, _collection: &str, id: &Json, document: Document) -> modelite_core::Result<()> {
        self.replaced.lock().unwrap().push((id.clone(), document));
        Ok(())
    }

    fn collection_fields(&self, collection: &str) -> modelite_core::Result<Option<Vec<FieldSpec>>> {
        Ok(match collection {
            "users" => Some(vec![
                FieldSpec::new("name", FieldType::String),
                FieldSpec::new("age", FieldType::Int),
            ]),
            "events" => Some(Vec::new()),
            _ => None,
        })
    }
}

fn document(value: Json) -> Document {
    match value {
        Json::Object(map) => map,
        _ => panic!("not an object"),
    }
}

fn backend(documents: Vec<Document>) -> Arc<DocumentBackend<RecordingStore>> {
    let store = RecordingStore {
        documents,
        ..Default::default()
    };
    Arc::new(DocumentBackend::new(store, DocumentConfig::default()))
}

#[test]
fn test_schema_checks() {
    let backend = backend(vec![]);
    assert!(matches!(backend.ensure_model("ghosts"), Err(Error::ModelNotFound(_))));
    assert!(matches!(
        backend.ensure_schema("users", &[FieldSpec::new("email", FieldType::String)]),
        Err(Error::ModelSchema { .. })
    ));
    assert!(backend
        .ensure_schema("events", &[FieldSpec::new("anything", FieldType::Any)])
        .is_ok());
}

#[test]
fn test_find_command_and_id_mapping() {
    let backend = backend(vec![document(json!({"_id": "a1", "name": "Alice", "age": 31}))]);
    let query = Query::new(ModelRef::new("users"), backend.clone())
        .select(["name"])
        .filter_by([("age__gte", 18)])
        .unwrap()
        .order_by("age DESC")
        .unwrap()
        .offset(10)
        .limit(5);

    let rows = query.all().unwrap();
    assert_eq!(rows[0].id(), Some(&Value::from("a1")));
    assert_eq!(rows[0].get("name"), Some(&Value::from("Alice")));

    let finds = backend.store().finds.lock().unwrap();
    let command = &finds[0];
    assert_eq!(command.collection, "users");
    assert_eq!(command.filter, json!({"age": {"$gte": 18}}));
    assert_eq!(command.sort, vec![("age".to_string(), -1)]);
    assert_eq!(command.skip, Some(10));
    assert_eq!(command.limit, Some(5));
    assert_eq!(command.projection, Some(json!({"_id": 1, "name": 1})));
}

#[test]
fn test_update_ignores_window() {
    let backend = backend(vec![document(json!({"_id": 1})), document(json!({"_id": 2}))]);
    let query = Query::new(ModelRef::new("users"), backend.clone()).limit(1);
    let affected = query.update([("age__incr", 1)]).unwrap();
    assert_eq!(affected, 2);

    let updates = backend.store().updates.lock().unwrap();
    assert_eq!(updates[0].filter, json!({}));
    assert_eq!(updates[0].update, json!({"$inc": {"age": 1}}));
}

#[test]
fn test_add_and_remove() {
    let backend = backend(vec![]);
    let users = ModelRef::new("users");

    let inserted = backend.add(&users, Record::new().with("name", "Bob")).unwrap();
    assert_eq!(inserted.id(), Some(&Value::from("65a1f0c2")));

    backend
        .add(&users, Record::new().with("id", "k").with("name", "Kim"))
        .unwrap();
    {
        let replaced = backend.store().replaced.lock().unwrap();
        assert_eq!(replaced[0].0, json!("k"));
        assert_eq!(replaced[0].1.get("_id"), Some(&json!("k")));
    }

    assert!(backend.remove(&users, &inserted).unwrap());
    assert_eq!(
        backend.store().deletes.lock().unwrap()[0],
        json!({"_id": "65a1f0c2"})
    );
}

#[test]
fn test_find_by_id_uses_store_key() {
    let backend = backend(vec![document(json!({"_id": 7, "name": "x"}))]);
    let found = backend
        .find_by_id(&ModelRef::new("users"), &Value::Int(7))
        .unwrap()
        .unwrap();
    assert_eq!(found.id(), Some(&Value::Int(7)));
    assert_eq!(
        backend.store().finds.lock().unwrap()[0].filter,
        json!({"_id": 7})
    );
}

#[test]
fn test_empty_groups_send_match_all_filter() {
    let backend = backend(vec![
        document(json!({"_id": "a1", "name": "Alice"})),
        document(json!({"_id": "b2", "name": "Bob"})),
    ]);
    let users = Query::new(ModelRef::new("users"), backend.clone());

    assert_eq!(users.filter(or(Vec::<Filter>::new())).all().unwrap().len(), 2);
    users
        .filter(or(vec![
            Predicate::from(Filter::eq("name", "Carol")),
            and(Vec::<Filter>::new()).into(),
        ]))
        .all()
        .unwrap();

    let finds = backend.store().finds.lock().unwrap();
    assert_eq!(finds[0].filter, json!({}));
    assert_eq!(finds[1].filter, json!({"$or": [{"name": "Carol"}, {}]}));
}
