//! Query → SQL translation.
//!
//! Filters become a `WHERE` clause with bound parameters, ordering becomes
//! `ORDER BY`, and the window becomes `LIMIT`/`OFFSET`. Identifiers are
//! always double-quoted.

use crate::config::Placeholder;
use crate::statement::{escape_like, SqlStatement, StatementBuilder, LIKE_ESCAPE};
use modelite_core::query::{Assignment, Combinator, Direction, Filter, FilterGroup, Operator, Predicate, UpdateOp};
use modelite_core::{Error, Query, Record, Result, Value, PRIMARY_KEY};

const BACKEND: &str = "sql";

/// Column alias of `count` statements
pub const COUNT_COLUMN: &str = "count";

/// Row limit written when only an offset is set. SQLite and MySQL reject
/// `OFFSET` without `LIMIT`; this is the largest value both accept.
pub const UNBOUNDED_LIMIT: i64 = i64::MAX;

/// Stateless statement factory
#[derive(Debug, Clone, Copy, Default)]
pub struct Translator {
    placeholder: Placeholder,
}

impl Translator {
    pub fn new(placeholder: Placeholder) -> Self {
        Self { placeholder }
    }

    fn builder(&self) -> StatementBuilder {
        StatementBuilder::new(self.placeholder)
    }

    /// `SELECT` honoring projection, filters, ordering and window
    pub fn select(&self, query: &Query) -> Result<SqlStatement> {
        let mut b = self.builder();
        b.push("SELECT ");
        let fields = query.selected_fields();
        if fields.is_empty() {
            b.push("*");
        } else {
            b.ident(PRIMARY_KEY);
            for field in fields.iter().filter(|f| f.as_str() != PRIMARY_KEY) {
                b.push(", ").ident(field);
            }
        }
        b.push(" FROM ").ident(query.model().name());
        where_clause(&mut b, &query.predicate())?;

        if !query.ordering().is_empty() {
            b.push(" ORDER BY ");
            for (i, order) in query.ordering().iter().enumerate() {
                if i > 0 {
                    b.push(", ");
                }
                b.ident(&order.field);
                b.push(match order.direction {
                    Direction::Asc => " ASC",
                    Direction::Desc => " DESC",
                });
            }
        }
        match (query.limit_value(), query.offset_value()) {
            (Some(limit), offset) => {
                b.push(&format!(" LIMIT {}", limit));
                if let Some(offset) = offset {
                    b.push(&format!(" OFFSET {}", offset));
                }
            }
            (None, Some(offset)) => {
                b.push(&format!(" LIMIT {} OFFSET {}", UNBOUNDED_LIMIT, offset));
            }
            (None, None) => {}
        }
        Ok(b.finish())
    }

    /// `SELECT COUNT(*)` over the filters only
    pub fn count(&self, query: &Query) -> Result<SqlStatement> {
        let mut b = self.builder();
        b.push("SELECT COUNT(*) AS ")
            .ident(COUNT_COLUMN)
            .push(" FROM ")
            .ident(query.model().name());
        where_clause(&mut b, &query.predicate())?;
        Ok(b.finish())
    }

    /// `UPDATE` of every filtered row; limit and offset do not apply
    pub fn update(&self, query: &Query, data: &[Assignment]) -> Result<SqlStatement> {
        if data.is_empty() {
            return Err(Error::Query("Update without any assignment".to_string()));
        }
        let mut b = self.builder();
        b.push("UPDATE ").ident(query.model().name()).push(" SET ");
        for (i, assignment) in data.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.ident(&assignment.field).push(" = ");
            match assignment.op {
                UpdateOp::Set => {
                    b.bind(assignment.value.clone());
                }
                UpdateOp::Incr => {
                    b.ident(&assignment.field).push(" + ").bind(assignment.value.clone());
                }
                UpdateOp::Push => return Err(Error::unsupported_operator(Operator::Push, BACKEND)),
            }
        }
        where_clause(&mut b, &query.predicate())?;
        Ok(b.finish())
    }

    /// `DELETE` of every filtered row
    pub fn delete(&self, query: &Query) -> Result<SqlStatement> {
        let mut b = self.builder();
        b.push("DELETE FROM ").ident(query.model().name());
        where_clause(&mut b, &query.predicate())?;
        Ok(b.finish())
    }

    pub fn select_by_id(&self, table: &str, id: &Value) -> SqlStatement {
        let mut b = self.builder();
        b.push("SELECT * FROM ")
            .ident(table)
            .push(" WHERE ")
            .ident(PRIMARY_KEY)
            .push(" = ")
            .bind(id.clone())
            .push(" LIMIT 1");
        b.finish()
    }

    pub fn insert(&self, table: &str, record: &Record) -> SqlStatement {
        let mut b = self.builder();
        b.push("INSERT INTO ").ident(table);
        if record.is_empty() {
            b.push(" DEFAULT VALUES");
            return b.finish();
        }
        b.push(" (");
        for (i, (field, _)) in record.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.ident(field);
        }
        b.push(") VALUES (");
        for (i, (_, value)) in record.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.bind(value.clone());
        }
        b.push(")");
        b.finish()
    }

    /// `UPDATE` of every non-key column of the row identified by `id`
    pub fn update_by_id(&self, table: &str, id: &Value, record: &Record) -> Option<SqlStatement> {
        let columns: Vec<_> = record.iter().filter(|(f, _)| f.as_str() != PRIMARY_KEY).collect();
        if columns.is_empty() {
            return None;
        }
        let mut b = self.builder();
        b.push("UPDATE ").ident(table).push(" SET ");
        for (i, (field, value)) in columns.into_iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.ident(field).push(" = ").bind(value.clone());
        }
        b.push(" WHERE ").ident(PRIMARY_KEY).push(" = ").bind(id.clone());
        Some(b.finish())
    }

    pub fn delete_by_id(&self, table: &str, id: &Value) -> SqlStatement {
        let mut b = self.builder();
        b.push("DELETE FROM ")
            .ident(table)
            .push(" WHERE ")
            .ident(PRIMARY_KEY)
            .push(" = ")
            .bind(id.clone());
        b.finish()
    }
}

fn where_clause(b: &mut StatementBuilder, group: &FilterGroup) -> Result<()> {
    if group.matches_everything() {
        return Ok(());
    }
    b.push(" WHERE ");
    write_group(b, group, false)
}

// Only called on groups that do not match everything, so always-true
// children can be dropped from an AND and never occur in an OR.
fn write_group(b: &mut StatementBuilder, group: &FilterGroup, nested: bool) -> Result<()> {
    let joiner = match group.combinator() {
        Combinator::And => " AND ",
        Combinator::Or => " OR ",
    };
    let children: Vec<&Predicate> = group
        .children()
        .iter()
        .filter(|child| !matches!(child, Predicate::Group(g) if g.matches_everything()))
        .collect();
    let wrap = nested && children.len() > 1;
    if wrap {
        b.push("(");
    }
    for (i, child) in children.into_iter().enumerate() {
        if i > 0 {
            b.push(joiner);
        }
        match child {
            Predicate::Filter(filter) => write_filter(b, filter)?,
            Predicate::Group(inner) => write_group(b, inner, true)?,
        }
    }
    if wrap {
        b.push(")");
    }
    Ok(())
}

fn write_filter(b: &mut StatementBuilder, filter: &Filter) -> Result<()> {
    let field = filter.field();
    let value = filter.value();
    match filter.operator() {
        Operator::Eq if value.is_null() => {
            b.ident(field).push(" IS NULL");
        }
        Operator::Ne if value.is_null() => {
            b.ident(field).push(" IS NOT NULL");
        }
        op @ (Operator::Eq | Operator::Ne | Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte) => {
            b.ident(field).push(" ").push(op.symbol()).push(" ").bind(value.clone());
        }
        op @ (Operator::In | Operator::Nin) => {
            let candidates = match value {
                Value::List(items) => items.clone(),
                other => vec![other.clone()],
            };
            let negated = op == Operator::Nin;
            if candidates.is_empty() {
                b.push(if negated { "1 = 1" } else { "1 = 0" });
                return Ok(());
            }
            b.ident(field).push(if negated { " NOT IN (" } else { " IN (" });
            for (i, candidate) in candidates.into_iter().enumerate() {
                if i > 0 {
                    b.push(", ");
                }
                b.bind(candidate);
            }
            b.push(")");
        }
        Operator::Contains => {
            let needle = value.as_str().ok_or_else(|| {
                Error::Query(format!(
                    "The sql backend only supports 'contains' on strings, got {} for '{}'",
                    value.type_name(),
                    field
                ))
            })?;
            b.ident(field)
                .push(" LIKE ")
                .bind(Value::String(format!("%{}%", escape_like(needle))))
                .push(&format!(" ESCAPE '{}'", LIKE_ESCAPE));
        }
        op @ (Operator::Incr | Operator::Push) => return Err(Error::unsupported_operator(op, BACKEND)),
    }
    Ok(())
}
