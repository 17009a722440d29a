//! # Modelite SQL
//!
//! Relational backend for Modelite. Queries are translated into
//! parameterized [`SqlStatement`]s and executed through a caller-provided
//! [`SqlConnection`], so any engine with a Rust driver can be plugged in.
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
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use tracing::debug;

pub mod config;
pub mod connection;
pub mod statement;
pub mod translate;

pub use config::{Placeholder, SqlConfig};
pub use connection::SqlConnection;
pub use statement::SqlStatement;
pub use translate::Translator;

/// Relational backend over a [`SqlConnection`]
#[derive(Debug)]
pub struct SqlBackend<C: SqlConnection> {
    connection: C,
    translator: Translator,
    /// Columns of every model resolved so far
    columns: RwLock<HashMap<String, Vec<FieldSpec>>>,
    /// Open transaction depth; nested levels use savepoints
    depth: Mutex<usize>,
}

impl<C: SqlConnection> SqlBackend<C> {
    pub fn new(connection: C, config: SqlConfig) -> Self {
        Self {
            connection,
            translator: Translator::new(config.placeholder),
            columns: RwLock::new(HashMap::new()),
            depth: Mutex::new(0),
        }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    fn columns(&self, table: &str) -> Result<Vec<FieldSpec>> {
        if let Some(columns) = self
            .columns
            .read()
            .map_err(|_| Error::LockPoisoned)?
            .get(table)
        {
            return Ok(columns.clone());
        }
        let columns = self
            .connection
            .table_columns(table)?
            .ok_or_else(|| Error::ModelNotFound(table.to_string()))?;
        self.columns
            .write()
            .map_err(|_| Error::LockPoisoned)?
            .insert(table.to_string(), columns.clone());
        Ok(columns)
    }

    fn execute(&self, statement: &SqlStatement) -> Result<usize> {
        debug!(sql = %statement.sql, params = statement.params.len(), "execute");
        self.connection.execute(statement)
    }

    fn fetch(&self, statement: &SqlStatement) -> Result<Vec<Record>> {
        debug!(sql = %statement.sql, params = statement.params.len(), "fetch");
        self.connection.fetch(statement)
    }
}

impl<C: SqlConnection> Backend for SqlBackend<C> {
    fn name(&self) -> &str {
        "sql"
    }

    fn connect(&self) -> Result<()> {
        self.connection.open()
    }

    fn close(&self) -> Result<()> {
        self.connection.close()
    }

    fn ensure_model(&self, name: &str) -> Result<ModelRef> {
        self.columns(name)?;
        Ok(ModelRef::new(name))
    }

    fn ensure_schema(&self, name: &str, fields: &[FieldSpec]) -> Result<()> {
        check_schema(name, &self.columns(name)?, fields)
    }

    fn inspect_fields(&self, model: &ModelRef) -> Result<Vec<FieldSpec>> {
        self.columns(model.name())
    }

    fn find_by_id(&self, model: &ModelRef, id: &Value) -> Result<Option<Record>> {
        let statement = self.translator.select_by_id(model.name(), id);
        Ok(self.fetch(&statement)?.into_iter().next())
    }

    fn find_all(&self, query: &Query) -> Result<Vec<Record>> {
        self.fetch(&self.translator.select(query)?)
    }

    fn count(&self, query: &Query) -> Result<usize> {
        let rows = self.fetch(&self.translator.count(query)?)?;
        let count = rows
            .first()
            .and_then(|row| row.get(translate::COUNT_COLUMN))
            .and_then(Value::as_int)
            .ok_or_else(|| Error::Backend("COUNT(*) returned no integer".to_string()))?;
        usize::try_from(count).map_err(|_| Error::Backend(format!("Invalid row count {}", count)))
    }

    fn update(&self, query: &Query, data: &[Assignment]) -> Result<usize> {
        self.execute(&self.translator.update(query, data)?)
    }

    fn delete(&self, query: &Query) -> Result<usize> {
        self.execute(&self.translator.delete(query)?)
    }

    /// Update the row with the record's primary key, or insert it when there
    /// is no key or no such row
    fn add(&self, model: &ModelRef, mut record: Record) -> Result<Record> {
        let table = model.name();
        if let Some(id) = record.id() {
            if let Some(statement) = self.translator.update_by_id(table, id, &record) {
                if self.execute(&statement)? > 0 {
                    return Ok(record);
                }
            } else if self.find_by_id(model, id)?.is_some() {
                return Ok(record);
            }
        }
        let statement = self.translator.insert(table, &record);
        debug!(sql = %statement.sql, params = statement.params.len(), "insert");
        let id = self.connection.insert(&statement)?;
        if record.id().is_none() {
            record.set(PRIMARY_KEY, id);
        }
        Ok(record)
    }

    fn remove(&self, model: &ModelRef, record: &Record) -> Result<bool> {
        let id = require_id(record, "remove")?;
        Ok(self.execute(&self.translator.delete_by_id(model.name(), id))? > 0)
    }

    fn begin_transaction(&self) -> Result<()> {
        let mut depth = self.depth.lock().map_err(|_| Error::LockPoisoned)?;
        let sql = match *depth {
            0 => "BEGIN".to_string(),
            n => format!("SAVEPOINT sp_{}", n),
        };
        self.execute(&SqlStatement::raw(sql))?;
        *depth += 1;
        Ok(())
    }

    fn commit_transaction(&self) -> Result<()> {
        let mut depth = self.depth.lock().map_err(|_| Error::LockPoisoned)?;
        let sql = match *depth {
            0 => return Err(Error::Transaction("No active transaction to commit".to_string())),
            1 => "COMMIT".to_string(),
            n => format!("RELEASE SAVEPOINT sp_{}", n - 1),
        };
        self.execute(&SqlStatement::raw(sql))?;
        *depth -= 1;
        Ok(())
    }

    fn rollback_transaction(&self) -> Result<()> {
        let mut depth = self.depth.lock().map_err(|_| Error::LockPoisoned)?;
        let sql = match *depth {
            0 => return Err(Error::Transaction("No active transaction to roll back".to_string())),
            1 => "ROLLBACK".to_string(),
            n => format!("ROLLBACK TO SAVEPOINT sp_{}", n - 1),
        };
        self.execute(&SqlStatement::raw(sql))?;
        *depth -= 1;
        Ok(())
    }
}
