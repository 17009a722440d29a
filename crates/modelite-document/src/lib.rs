//! # Modelite Document
//!
//! Document store backend for Modelite. Queries are translated into JSON
//! filter and update documents (`$and`, `$or`, `$gt`, `$in`, `$set`, `$inc`,
//! `$push`, ...) and executed through a caller-provided [`DocumentStore`].
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of Modelite.**
//!
//! Users should depend on the main `modelite` crate instead, which provides
//! the stable public API.

use modelite_core::backend::{check_schema, require_id};
use modelite_core::query::Assignment;
use modelite_core::{Backend, Error, FieldSpec, ModelRef, Query, Record, Result, Value, PRIMARY_KEY};
use serde_json::{Map, Value as Json};
use tracing::debug;

pub mod config;
pub mod json;
pub mod store;
pub mod translate;

pub use config::DocumentConfig;
pub use json::Document;
pub use store::{DocumentStore, FindCommand, UpdateCommand};

/// Document backend over a [`DocumentStore`]
#[derive(Debug)]
pub struct DocumentBackend<S: DocumentStore> {
    store: S,
    config: DocumentConfig,
}

impl<S: DocumentStore> DocumentBackend<S> {
    pub fn new(store: S, config: DocumentConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn id_field(&self) -> &str {
        &self.config.id_field
    }

    fn fields(&self, collection: &str) -> Result<Vec<FieldSpec>> {
        self.store
            .collection_fields(collection)?
            .ok_or_else(|| Error::ModelNotFound(collection.to_string()))
    }

    fn id_filter(&self, id: &Value) -> Json {
        let mut filter = Map::new();
        filter.insert(self.id_field().to_string(), json::to_json(id));
        Json::Object(filter)
    }

    fn to_records(&self, documents: Vec<Document>) -> Result<Vec<Record>> {
        documents
            .iter()
            .map(|document| json::to_record(document, self.id_field()))
            .collect()
    }
}

impl<S: DocumentStore> Backend for DocumentBackend<S> {
    fn name(&self) -> &str {
        "document"
    }

    fn connect(&self) -> Result<()> {
        self.store.open()
    }

    fn close(&self) -> Result<()> {
        self.store.close()
    }

    fn ensure_model(&self, name: &str) -> Result<ModelRef> {
        self.fields(name)?;
        Ok(ModelRef::new(name))
    }

    /// Dynamic collections accept any field
    fn ensure_schema(&self, name: &str, fields: &[FieldSpec]) -> Result<()> {
        check_schema(name, &self.fields(name)?, fields)
    }

    fn inspect_fields(&self, model: &ModelRef) -> Result<Vec<FieldSpec>> {
        self.fields(model.name())
    }

    fn find_by_id(&self, model: &ModelRef, id: &Value) -> Result<Option<Record>> {
        let command = FindCommand {
            collection: model.name().to_string(),
            filter: self.id_filter(id),
            sort: Vec::new(),
            skip: None,
            limit: Some(1),
            projection: None,
        };
        Ok(self.to_records(self.store.find(&command)?)?.into_iter().next())
    }

    fn find_all(&self, query: &Query) -> Result<Vec<Record>> {
        let command = translate::find_command(query, self.id_field())?;
        debug!(collection = %command.collection, filter = %command.filter, "find");
        self.to_records(self.store.find(&command)?)
    }

    fn count(&self, query: &Query) -> Result<usize> {
        let filter = translate::filter_document(&query.predicate(), self.id_field())?;
        debug!(collection = query.model().name(), filter = %filter, "count");
        self.store.count(query.model().name(), &filter)
    }

    fn update(&self, query: &Query, data: &[Assignment]) -> Result<usize> {
        let command = translate::update_command(query, data, self.id_field())?;
        debug!(collection = %command.collection, update = %command.update, "update_many");
        self.store.update_many(&command)
    }

    fn delete(&self, query: &Query) -> Result<usize> {
        let filter = translate::filter_document(&query.predicate(), self.id_field())?;
        debug!(collection = query.model().name(), filter = %filter, "delete_many");
        self.store.delete_many(query.model().name(), &filter)
    }

    fn add(&self, model: &ModelRef, mut record: Record) -> Result<Record> {
        let document = json::to_document(&record, self.id_field());
        match record.id() {
            Some(id) => {
                let key = json::to_json(id);
                self.store.replace_one(model.name(), &key, document)?;
            }
            None => {
                let mut document = document;
                document.remove(self.id_field());
                let key = self.store.insert_one(model.name(), document)?;
                record.set(PRIMARY_KEY, json::from_json(&key)?);
            }
        }
        Ok(record)
    }

    fn remove(&self, model: &ModelRef, record: &Record) -> Result<bool> {
        let id = require_id(record, "remove")?;
        Ok(self.store.delete_many(model.name(), &self.id_filter(id))? > 0)
    }
}
