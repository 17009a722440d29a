//! Configuration of the models layer.

use crate::{Error, Result, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Backend reference used when none is configured
pub const DEFAULT_BACKEND: &str = "embedded";

/// Page size used when a pagination request does not name one
pub const DEFAULT_PER_PAGE: usize = 10;

/// Operand of a scope filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeValue {
    /// A fixed value
    Value(Value),
    /// A variable of the request context, looked up when the scope is applied
    Var(String),
}

/// One `field__op = value` filter of a named scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeFilter {
    /// Filter DSL token (`"status"`, `"age__gte"`, ...)
    pub field: String,
    pub value: ScopeValue,
}

impl ScopeFilter {
    pub fn value(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: ScopeValue::Value(value.into()),
        }
    }

    /// Filter bound to context variable `var`
    pub fn var(field: impl Into<String>, var: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: ScopeValue::Var(var.into()),
        }
    }

    /// Resolve the operand against the request variables
    pub fn resolve(&self, vars: &BTreeMap<String, Value>) -> Result<Value> {
        match &self.value {
            ScopeValue::Value(value) => Ok(value.clone()),
            ScopeValue::Var(name) => vars
                .get(name)
                .cloned()
                .ok_or_else(|| Error::Query(format!("Missing context variable '{}'", name))),
        }
    }
}

/// Options of [`Models`](crate::Models)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Backend reference resolved through
    /// [`BackendFactories`](crate::BackendFactories): `module::Name` or a
    /// bare module name
    pub backend: String,
    pub pagination_per_page: usize,
    /// Named scopes usable with `scoped_query`
    pub scopes: BTreeMap<String, Vec<ScopeFilter>>,
    /// Backend specific options, passed to the backend factory
    pub options: BTreeMap<String, String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            pagination_per_page: DEFAULT_PER_PAGE,
            scopes: BTreeMap::new(),
            options: BTreeMap::new(),
        }
    }
}

impl ModelsConfig {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            ..Self::default()
        }
    }

    pub fn with_per_page(mut self, per_page: usize) -> Self {
        self.pagination_per_page = per_page;
        self
    }

    pub fn with_scope(mut self, name: impl Into<String>, filters: Vec<ScopeFilter>) -> Self {
        self.scopes.insert(name.into(), filters);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Raw option value
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Option parsed into `T`; `None` when absent
    pub fn parsed_option<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.option(key)
            .map(|raw| {
                raw.parse()
                    .map_err(|_| Error::Config(format!("Invalid value '{}' for option '{}'", raw, key)))
            })
            .transpose()
    }
}
