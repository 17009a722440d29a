use crate::statement::SqlStatement;
use modelite_core::{FieldSpec, Record, Result, Value};
use std::fmt;

/// Connection to a relational engine.
///
/// The backend only produces statements; executing them, mapping rows to
/// [`Record`]s and reporting engine failures as `Error::Backend` is the
/// connection's job.
pub trait SqlConnection: Send + Sync + fmt::Debug {
    /// Run a query and return its rows
    fn fetch(&self, statement: &SqlStatement) -> Result<Vec<Record>>;

    /// Run a statement and return the number of affected rows
    fn execute(&self, statement: &SqlStatement) -> Result<usize>;

    /// Run an `INSERT` and return the primary key of the new row
    fn insert(&self, statement: &SqlStatement) -> Result<Value>;

    /// Columns of `table`, or `None` when the table does not exist
    fn table_columns(&self, table: &str) -> Result<Option<Vec<FieldSpec>>>;

    fn open(&self) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
