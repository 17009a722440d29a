/// Immutable query builder
///
/// A [`Query`] accumulates projection, filters, ordering and the
/// offset/limit window. Every builder method takes `&self` and returns a new
/// query, so a base query can be shared and specialized freely. Execution
/// methods delegate to the backend the query was created with.
use super::filter::{and, Filter, FilterGroup, Predicate};
use super::order::{Direction, OrderBy, OrderSpec};
use super::update::prepare_update;
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::model::{ModelRef, Record};
use crate::value::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Declarative query over one model
#[derive(Clone)]
pub struct Query {
    model: ModelRef,
    backend: Arc<dyn Backend>,
    fields: BTreeSet<String>,
    filters: Vec<Predicate>,
    order_by: Vec<OrderBy>,
    offset: Option<usize>,
    limit: Option<usize>,
}

impl Query {
    /// Create an unfiltered query over `model`, executed by `backend`
    pub fn new(model: ModelRef, backend: Arc<dyn Backend>) -> Self {
        Self {
            model,
            backend,
            fields: BTreeSet::new(),
            filters: Vec::new(),
            order_by: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    /// Model the query reads
    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    /// Backend executing the query
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Projection; empty means every field
    pub fn selected_fields(&self) -> &BTreeSet<String> {
        &self.fields
    }

    /// Top-level predicates, implicitly combined with AND
    pub fn filters(&self) -> &[Predicate] {
        &self.filters
    }

    /// The whole predicate as a single AND group
    pub fn predicate(&self) -> FilterGroup {
        and(self.filters.iter().cloned())
    }

    /// Ordering clauses in priority order
    pub fn ordering(&self) -> &[OrderBy] {
        &self.order_by
    }

    /// Rows skipped before the first result
    pub fn offset_value(&self) -> Option<usize> {
        self.offset
    }

    /// Maximum number of results
    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    /// Restrict the projection to `fields`
    pub fn select<I, S>(&self, fields: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut q = self.clone();
        q.fields = fields.into_iter().map(Into::into).collect();
        q
    }

    /// Append a filter or filter group
    pub fn filter(&self, predicate: impl Into<Predicate>) -> Query {
        let mut q = self.clone();
        q.filters.push(predicate.into());
        q
    }

    /// Append several predicates, verbatim and in order
    pub fn filter_all<I, P>(&self, predicates: I) -> Query
    where
        I: IntoIterator<Item = P>,
        P: Into<Predicate>,
    {
        let mut q = self.clone();
        q.filters.extend(predicates.into_iter().map(Into::into));
        q
    }

    /// Append `(field__op, value)` pairs from the filter DSL.
    ///
    /// ```
    /// # fn demo(q: modelite_core::query::Query) -> modelite_core::Result<()> {
    /// let adults = q.filter_by([("age__gte", 18)])?;
    /// assert_eq!(adults.filters().len(), q.filters().len() + 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn filter_by<I, K, V>(&self, pairs: I) -> Result<Query>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut q = self.clone();
        for (token, value) in pairs {
            q.filters.push(Filter::parse(token.as_ref(), value)?.into());
        }
        Ok(q)
    }

    /// Append ordering clauses, or clear them with `None`.
    ///
    /// Accepts `"name"`, `"name DESC"`, `"a, b DESC"`, `(field, Direction)`
    /// tuples and lists of them. Clearing returns a new query with no
    /// ordering.
    pub fn order_by(&self, spec: impl Into<OrderSpec>) -> Result<Query> {
        let mut q = self.clone();
        match spec.into().resolve()? {
            Some(pairs) => q.order_by.extend(pairs),
            None => q.order_by.clear(),
        }
        Ok(q)
    }

    /// Same as `order_by(None)`
    pub fn clear_order(&self) -> Query {
        let mut q = self.clone();
        q.order_by.clear();
        q
    }

    /// Append one ordering clause
    pub fn order_by_dir(&self, field: impl Into<String>, direction: Direction) -> Query {
        let mut q = self.clone();
        q.order_by.push(OrderBy::new(field, direction));
        q
    }

    /// Skip `offset` rows; `None` resets
    pub fn offset(&self, offset: impl Into<Option<usize>>) -> Query {
        let mut q = self.clone();
        q.offset = offset.into();
        q
    }

    /// Take at most `limit` rows; `None` resets
    pub fn limit(&self, limit: impl Into<Option<usize>>) -> Query {
        let mut q = self.clone();
        q.limit = limit.into();
        q
    }

    /// Find by primary key
    pub fn get(&self, pk: impl Into<Value>) -> Result<Option<Record>> {
        self.backend.find_by_id(&self.model, &pk.into())
    }

    /// Find by primary key, failing with [`Error::NotFound`] when absent
    pub fn get_or_404(&self, pk: impl Into<Value>) -> Result<Record> {
        self.get(pk)?.ok_or(Error::NotFound)
    }

    /// Every matching row, honoring ordering and window
    pub fn all(&self) -> Result<Vec<Record>> {
        debug!(model = %self.model, query = %self, "find_all");
        self.backend.find_all(self)
    }

    /// First matching row, if any
    pub fn first(&self) -> Result<Option<Record>> {
        debug!(model = %self.model, query = %self, "find_first");
        self.backend.find_first(self)
    }

    /// First match, failing with [`Error::NotFound`] when there is none
    pub fn first_or_404(&self) -> Result<Record> {
        self.first()?.ok_or(Error::NotFound)
    }

    /// First match, failing with [`Error::NoResult`] when there is none
    pub fn one(&self) -> Result<Record> {
        debug!(model = %self.model, query = %self, "find_one");
        self.backend.find_one(self)
    }

    /// Number of matching rows, ignoring ordering and window
    pub fn count(&self) -> Result<usize> {
        debug!(model = %self.model, query = %self, "count");
        self.backend.count(self)
    }

    /// Whether at least one row matches
    pub fn exists(&self) -> Result<bool> {
        Ok(self.count()? > 0)
    }

    /// Apply `data` to every row matching the filters.
    ///
    /// Limit and offset are ignored: the whole filtered set is updated.
    /// Returns the number of affected rows.
    pub fn update<I, K, V>(&self, data: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let assignments = prepare_update(data)?;
        debug!(model = %self.model, query = %self, changes = assignments.len(), "update");
        self.backend.update(self, &assignments)
    }

    /// Delete every row matching the filters, ignoring limit and offset
    pub fn delete(&self) -> Result<usize> {
        debug!(model = %self.model, query = %self, "delete");
        self.backend.delete(self)
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("model", &self.model.name())
            .field("backend", &self.backend.name())
            .field("fields", &self.fields)
            .field("filters", &self.filters)
            .field("order_by", &self.order_by)
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .finish()
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: impl Iterator<Item = T>) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "]")
}

fn write_opt(f: &mut fmt::Formatter<'_>, value: Option<usize>) -> fmt::Result {
    match value {
        Some(v) => write!(f, "{}", v),
        None => write!(f, "None"),
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Query(fields=")?;
        write_list(f, self.fields.iter())?;
        write!(f, ", filters=")?;
        write_list(f, self.filters.iter())?;
        write!(f, ", order_by=")?;
        write_list(f, self.order_by.iter())?;
        write!(f, ", limit=")?;
        write_opt(f, self.limit)?;
        write!(f, ", offset=")?;
        write_opt(f, self.offset)?;
        write!(f, ")")
    }
}
