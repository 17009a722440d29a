//! Backend contract.
//!
//! A backend translates abstract [`Query`] values into the native operations
//! of one storage engine. Every backend follows the same translation order:
//!
//! 1. start from the model's native query or cursor;
//! 2. translate the filter tree depth-first, combining children with the
//!    engine's AND/OR and mapping each leaf to a native predicate
//!    (unsupported operators fail with [`Error::Query`]);
//! 3. apply ordering, primary sort first;
//! 4. skip `offset` rows, then take `limit`;
//! 5. for updates, map `incr` to an atomic increment, `push` to an array
//!    append (or fail when the engine has none) and everything else to an
//!    assignment.
//!
//! `update` and `delete` apply to every row matching the filters and ignore
//! the query's limit and offset, while `find_all` honors them.

use crate::error::{Error, Result};
use crate::model::{FieldSpec, ModelRef, Record};
use crate::query::{Assignment, Query};
use crate::value::Value;
use std::fmt;

/// Storage backend trait.
///
/// Implementations own their connection or session and are responsible for
/// serializing access to it; queries hold no connection state.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Short backend name (`"embedded"`, `"sql"`, ...)
    fn name(&self) -> &str;

    /// Open the underlying connection
    fn connect(&self) -> Result<()> {
        Ok(())
    }

    /// Release the underlying connection
    fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Resolve a model by name, failing with [`Error::ModelNotFound`]
    fn ensure_model(&self, name: &str) -> Result<ModelRef>;

    /// Check that every declared field exists on the model,
    /// failing with [`Error::ModelSchema`] naming the first missing one
    fn ensure_schema(&self, name: &str, fields: &[FieldSpec]) -> Result<()>;

    /// Declared fields of a model, for form or admin generation
    fn inspect_fields(&self, model: &ModelRef) -> Result<Vec<FieldSpec>>;

    /// Find by primary key
    fn find_by_id(&self, model: &ModelRef, id: &Value) -> Result<Option<Record>>;

    /// All matching rows, honoring ordering, offset and limit
    fn find_all(&self, query: &Query) -> Result<Vec<Record>>;

    /// First matching row
    fn find_first(&self, query: &Query) -> Result<Option<Record>> {
        Ok(self.find_all(&query.limit(1))?.into_iter().next())
    }

    /// First matching row, failing with [`Error::NoResult`] when absent
    fn find_one(&self, query: &Query) -> Result<Record> {
        self.find_first(query)?.ok_or(Error::NoResult)
    }

    /// Number of rows matching the filters (ordering and window are ignored)
    fn count(&self, query: &Query) -> Result<usize>;

    /// Apply assignments to every row matching the filters
    fn update(&self, query: &Query, data: &[Assignment]) -> Result<usize>;

    /// Delete every row matching the filters
    fn delete(&self, query: &Query) -> Result<usize>;

    /// Insert or replace a single record, returning it with its primary key
    fn add(&self, model: &ModelRef, record: Record) -> Result<Record>;

    /// Remove a single record by primary key
    fn remove(&self, model: &ModelRef, record: &Record) -> Result<bool>;

    fn begin_transaction(&self) -> Result<()> {
        Ok(())
    }

    fn commit_transaction(&self) -> Result<()> {
        Ok(())
    }

    fn rollback_transaction(&self) -> Result<()> {
        Ok(())
    }
}

/// Primary key of `record`, or a query error naming the operation
pub fn require_id<'a>(record: &'a Record, operation: &str) -> Result<&'a Value> {
    record
        .id()
        .ok_or_else(|| Error::Query(format!("Cannot {} a record without primary key", operation)))
}

/// Validate declared fields against the model's known fields.
///
/// An empty `known` list denotes a schemaless model and always passes.
pub fn check_schema(model: &str, known: &[FieldSpec], declared: &[FieldSpec]) -> Result<()> {
    if known.is_empty() {
        return Ok(());
    }
    for field in declared {
        if !known.iter().any(|k| k.name == field.name) {
            return Err(Error::ModelSchema {
                model: model.to_string(),
                field: field.name.clone(),
            });
        }
    }
    Ok(())
}
