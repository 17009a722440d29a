use crate::json::Document;
use modelite_core::{FieldSpec, Result};
use serde::Serialize;
use serde_json::Value as Json;
use std::fmt;

/// Sort order of one key: `1` ascending, `-1` descending
pub type SortKey = (String, i32);

/// A find command: filter document, sort keys, skip, limit and projection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindCommand {
    pub collection: String,
    pub filter: Json,
    pub sort: Vec<SortKey>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    /// Included fields (`{"name": 1}`); `None` returns whole documents
    pub projection: Option<Json>,
}

/// An update applied to every document matching `filter`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateCommand {
    pub collection: String,
    pub filter: Json,
    pub update: Json,
}

/// Connection to a document store
pub trait DocumentStore: Send + Sync + fmt::Debug {
    fn find(&self, command: &FindCommand) -> Result<Vec<Document>>;

    fn count(&self, collection: &str, filter: &Json) -> Result<usize>;

    /// Returns the number of modified documents
    fn update_many(&self, command: &UpdateCommand) -> Result<usize>;

    /// Returns the number of deleted documents
    fn delete_many(&self, collection: &str, filter: &Json) -> Result<usize>;

    /// Insert a document and return its generated key
    fn insert_one(&self, collection: &str, document: Document) -> Result<Json>;

    /// Replace the document with key `id`, inserting it when missing
    fn replace_one(&self, collection: &str, id: &Json, document: Document) -> Result<()>;

    /// Declared fields of `collection` (empty for a dynamic collection),
    /// or `None` when no such collection is registered
    fn collection_fields(&self, collection: &str) -> Result<Option<Vec<FieldSpec>>>;

    fn open(&self) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
