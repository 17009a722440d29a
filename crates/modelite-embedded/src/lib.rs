//! # Modelite Embedded
//!
//! In-process record store implementing the Modelite [`Backend`] contract.
//! Tables live in memory behind a lock and can be persisted to a
//! CRC-checked snapshot file.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of Modelite.**
//!
//! Users should depend on the main `modelite` crate instead, which provides
//! the stable public API.

use modelite_core::backend::{check_schema, require_id};
use modelite_core::query::{Assignment, Direction, OrderBy, Query};
use modelite_core::{
    Backend, Error, FieldSpec, FieldType, ModelRef, Record, Result, Value, PRIMARY_KEY,
};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

pub mod config;
pub mod predicate;
pub mod snapshot;
mod table;

pub use config::EmbeddedConfig;
pub use predicate::RowPredicate;
pub use table::Table;

use snapshot::Tables;

#[derive(Debug, Default)]
struct State {
    tables: Tables,
    /// Copies of `tables` taken by each open transaction, innermost last
    savepoints: Vec<Tables>,
}

/// Embedded backend
#[derive(Debug)]
pub struct EmbeddedBackend {
    config: EmbeddedConfig,
    state: RwLock<State>,
}

impl EmbeddedBackend {
    /// Create an empty store
    pub fn new(config: EmbeddedConfig) -> Self {
        Self {
            config,
            state: RwLock::new(State::default()),
        }
    }

    /// Empty, volatile store with explicit model creation
    pub fn in_memory() -> Self {
        Self::new(EmbeddedConfig::in_memory())
    }

    /// Create a store, loading the configured snapshot when it exists
    pub fn open(config: EmbeddedConfig) -> Result<Self> {
        let tables = match &config.snapshot_path {
            Some(path) => snapshot::read(path)?.unwrap_or_default(),
            None => Tables::new(),
        };
        if let Some(path) = &config.snapshot_path {
            info!(path = %path.display(), models = tables.len(), "opened embedded store");
        }
        Ok(Self {
            config,
            state: RwLock::new(State {
                tables,
                savepoints: Vec::new(),
            }),
        })
    }

    pub fn config(&self) -> &EmbeddedConfig {
        &self.config
    }

    /// Create a model. An empty field list makes it schemaless.
    pub fn create_model(&self, name: &str, fields: Vec<FieldSpec>) -> Result<ModelRef> {
        let mut state = self.write()?;
        if state.tables.contains_key(name) {
            return Err(Error::Query(format!("Model '{}' already exists", name)));
        }
        debug!(model = name, fields = fields.len(), "creating model");
        state.tables.insert(name.to_string(), Table::new(fields));
        Ok(ModelRef::new(name))
    }

    /// Drop a model and all its rows
    pub fn drop_model(&self, name: &str) -> Result<bool> {
        Ok(self.write()?.tables.remove(name).is_some())
    }

    pub fn model_names(&self) -> Result<Vec<String>> {
        Ok(self.read()?.tables.keys().cloned().collect())
    }

    /// Persist every table to the configured snapshot path
    pub fn save(&self) -> Result<()> {
        match &self.config.snapshot_path {
            Some(path) => self.save_snapshot(path),
            None => Err(Error::Config(
                "No snapshot path configured for the embedded store".to_string(),
            )),
        }
    }

    /// Persist every table to `path`.
    ///
    /// Uncommitted transactional changes are written as they currently are.
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let state = self.read()?;
        snapshot::write(path, &state.tables)?;
        info!(path = %path.display(), models = state.tables.len(), "saved snapshot");
        Ok(())
    }

    /// Depth of open transactions
    pub fn transaction_depth(&self) -> Result<usize> {
        Ok(self.read()?.savepoints.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| Error::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| Error::LockPoisoned)
    }

    fn table_mut<'a>(&self, state: &'a mut State, name: &str) -> Result<&'a mut Table> {
        if !state.tables.contains_key(name) {
            if !self.config.auto_create_models {
                return Err(Error::ModelNotFound(name.to_string()));
            }
            debug!(model = name, "auto-creating schemaless model");
            state.tables.insert(name.to_string(), Table::new(Vec::new()));
        }
        state
            .tables
            .get_mut(name)
            .ok_or_else(|| Error::ModelNotFound(name.to_string()))
    }
}

impl Default for EmbeddedBackend {
    fn default() -> Self {
        Self::in_memory()
    }
}

static NULL: Value = Value::Null;

fn lookup<'a>(state: &'a State, name: &str) -> Result<&'a Table> {
    state
        .tables
        .get(name)
        .ok_or_else(|| Error::ModelNotFound(name.to_string()))
}

fn compare_rows(a: &Record, b: &Record, ordering: &[OrderBy]) -> Ordering {
    for order in ordering {
        let left = a.get(&order.field).unwrap_or(&NULL);
        let right = b.get(&order.field).unwrap_or(&NULL);
        let cmp = match order.direction {
            Direction::Asc => left.sort_cmp(right),
            Direction::Desc => right.sort_cmp(left),
        };
        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    Ordering::Equal
}

impl Backend for EmbeddedBackend {
    fn name(&self) -> &str {
        "embedded"
    }

    fn close(&self) -> Result<()> {
        if self.config.snapshot_path.is_some() {
            self.save()?;
        }
        Ok(())
    }

    fn ensure_model(&self, name: &str) -> Result<ModelRef> {
        if self.read()?.tables.contains_key(name) {
            return Ok(ModelRef::new(name));
        }
        let mut state = self.write()?;
        self.table_mut(&mut state, name)?;
        Ok(ModelRef::new(name))
    }

    fn ensure_schema(&self, name: &str, fields: &[FieldSpec]) -> Result<()> {
        let state = self.read()?;
        check_schema(name, &lookup(&state, name)?.fields, fields)
    }

    /// Declared fields, or for a schemaless model the union of the fields
    /// present in its rows
    fn inspect_fields(&self, model: &ModelRef) -> Result<Vec<FieldSpec>> {
        let state = self.read()?;
        let table = lookup(&state, model.name())?;
        if !table.is_dynamic() {
            return Ok(table.fields.clone());
        }
        let names: BTreeSet<&String> = table.rows.iter().flat_map(|r| r.iter().map(|(k, _)| k)).collect();
        Ok(names
            .into_iter()
            .filter(|name| name.as_str() != PRIMARY_KEY)
            .map(|name| FieldSpec::new(name.clone(), FieldType::Any))
            .collect())
    }

    fn find_by_id(&self, model: &ModelRef, id: &Value) -> Result<Option<Record>> {
        let state = self.read()?;
        let table = lookup(&state, model.name())?;
        Ok(table.position(id).map(|idx| table.rows[idx].clone()))
    }

    fn find_all(&self, query: &Query) -> Result<Vec<Record>> {
        let predicate = RowPredicate::from_group(&query.predicate())?;
        let state = self.read()?;
        let table = lookup(&state, query.model().name())?;

        let mut rows: Vec<&Record> = table.rows.iter().filter(|r| predicate.matches(r)).collect();
        if !query.ordering().is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, query.ordering()));
        }

        let offset = query.offset_value().unwrap_or(0);
        let limit = query.limit_value().unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|r| r.project(query.selected_fields()))
            .collect())
    }

    fn count(&self, query: &Query) -> Result<usize> {
        let predicate = RowPredicate::from_group(&query.predicate())?;
        let state = self.read()?;
        let table = lookup(&state, query.model().name())?;
        Ok(table.rows.iter().filter(|r| predicate.matches(r)).count())
    }

    fn update(&self, query: &Query, data: &[Assignment]) -> Result<usize> {
        let predicate = RowPredicate::from_group(&query.predicate())?;
        let model = query.model().name();
        let mut state = self.write()?;
        let table = self.table_mut(&mut state, model)?;

        // Stage every change first so a failing row leaves the table untouched
        let mut staged = Vec::new();
        for (idx, row) in table.rows.iter().enumerate() {
            if predicate.matches(row) {
                let mut next = row.clone();
                table::apply(&mut next, data)?;
                table.validate(model, &next)?;
                staged.push((idx, next));
            }
        }
        let affected = staged.len();
        for (idx, row) in staged {
            table.rows[idx] = row;
        }
        debug!(model, affected, "updated rows");
        Ok(affected)
    }

    fn delete(&self, query: &Query) -> Result<usize> {
        let predicate = RowPredicate::from_group(&query.predicate())?;
        let model = query.model().name();
        let mut state = self.write()?;
        let table = self.table_mut(&mut state, model)?;
        let before = table.rows.len();
        table.rows.retain(|r| !predicate.matches(r));
        let affected = before - table.rows.len();
        debug!(model, affected, "deleted rows");
        Ok(affected)
    }

    fn add(&self, model: &ModelRef, record: Record) -> Result<Record> {
        let mut state = self.write()?;
        self.table_mut(&mut state, model.name())?
            .upsert(model.name(), record)
    }

    fn remove(&self, model: &ModelRef, record: &Record) -> Result<bool> {
        let id = require_id(record, "remove")?;
        let mut state = self.write()?;
        let table = self.table_mut(&mut state, model.name())?;
        match table.position(id) {
            Some(idx) => {
                table.rows.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn begin_transaction(&self) -> Result<()> {
        let mut state = self.write()?;
        let copy = state.tables.clone();
        state.savepoints.push(copy);
        debug!(depth = state.savepoints.len(), "begin transaction");
        Ok(())
    }

    fn commit_transaction(&self) -> Result<()> {
        let mut state = self.write()?;
        state
            .savepoints
            .pop()
            .ok_or_else(|| Error::Transaction("No active transaction to commit".to_string()))?;
        debug!(depth = state.savepoints.len(), "commit transaction");
        Ok(())
    }

    fn rollback_transaction(&self) -> Result<()> {
        let mut state = self.write()?;
        let saved = state
            .savepoints
            .pop()
            .ok_or_else(|| Error::Transaction("No active transaction to roll back".to_string()))?;
        state.tables = saved;
        debug!(depth = state.savepoints.len(), "rollback transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn backend() -> Arc<EmbeddedBackend> {
        let backend = EmbeddedBackend::in_memory();
        backend
            .create_model(
                "User",
                vec![
                    FieldSpec::new("name", FieldType::String),
                    FieldSpec::new("age", FieldType::Int),
                ],
            )
            .unwrap();
        Arc::new(backend)
    }

    #[test]
    fn test_unknown_model() {
        let backend = EmbeddedBackend::in_memory();
        assert!(matches!(backend.ensure_model("Ghost"), Err(Error::ModelNotFound(_))));
    }

    #[test]
    fn test_auto_create() {
        let backend = EmbeddedBackend::new(EmbeddedConfig::in_memory().with_auto_create(true));
        let model = backend.ensure_model("Event").unwrap();
        backend.add(&model, Record::new().with("kind", "click")).unwrap();
        let fields = backend.inspect_fields(&model).unwrap();
        assert_eq!(fields, vec![FieldSpec::new("kind", FieldType::Any)]);
    }

    #[test]
    fn test_create_twice_fails() {
        let backend = backend();
        assert!(backend.create_model("User", vec![]).is_err());
    }

    #[test]
    fn test_schema_check() {
        let backend = backend();
        assert!(backend
            .ensure_schema("User", &[FieldSpec::new("age", FieldType::Int)])
            .is_ok());
        assert!(matches!(
            backend.ensure_schema("User", &[FieldSpec::new("email", FieldType::String)]),
            Err(Error::ModelSchema { .. })
        ));
    }

    #[test]
    fn test_update_is_all_or_nothing() {
        let backend = backend();
        let model = ModelRef::new("User");
        backend.add(&model, Record::new().with("name", "a").with("age", 1)).unwrap();
        backend.add(&model, Record::new().with("name", "b")).unwrap();

        let query = Query::new(model.clone(), backend.clone());
        assert!(query.update([("name__incr", 1)]).is_err());
        let names: Vec<Value> = query
            .all()
            .unwrap()
            .into_iter()
            .filter_map(|r| r.get("name").cloned())
            .collect();
        assert_eq!(names, vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_commit_without_transaction() {
        let backend = backend();
        assert!(matches!(backend.commit_transaction(), Err(Error::Transaction(_))));
        assert!(matches!(backend.rollback_transaction(), Err(Error::Transaction(_))));
    }

    #[test]
    fn test_save_requires_path() {
        assert!(matches!(backend().save(), Err(Error::Config(_))));
    }
}
