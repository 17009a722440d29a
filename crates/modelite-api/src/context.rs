//! Per-request state threaded explicitly through the models layer.

use crate::transaction::{TransactionGate, UnitOfWork};
use crate::{Backend, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// State of one logical request: model scopes, variables used by named
/// scopes, and the request's unit of work.
#[derive(Debug)]
pub struct RequestContext {
    scopes: BTreeMap<String, BTreeMap<String, Value>>,
    vars: BTreeMap<String, Value>,
    unit_of_work: UnitOfWork,
}

impl RequestContext {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_gate(backend, Arc::new(TransactionGate::new()))
    }

    /// Context whose unit of work takes turns with the others sharing `gate`
    pub fn with_gate(backend: Arc<dyn Backend>, gate: Arc<TransactionGate>) -> Self {
        Self {
            scopes: BTreeMap::new(),
            vars: BTreeMap::new(),
            unit_of_work: UnitOfWork::with_gate(backend, gate),
        }
    }

    /// Restrict every scoped query on `model` with `filters`.
    ///
    /// Filters accumulate across calls; a token defined again replaces its
    /// previous value.
    pub fn define_scope<I, K, V>(&mut self, model: &str, filters: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let scope = self.scopes.entry(model.to_string()).or_default();
        for (token, value) in filters {
            scope.insert(token.into(), value.into());
        }
    }

    /// Filters defined for `model`, in token order
    pub fn scope(&self, model: &str) -> impl Iterator<Item = (&str, &Value)> {
        self.scopes
            .get(model)
            .into_iter()
            .flat_map(|filters| filters.iter().map(|(token, value)| (token.as_str(), value)))
    }

    pub fn clear_scope(&mut self, model: &str) {
        self.scopes.remove(model);
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn vars(&self) -> &BTreeMap<String, Value> {
        &self.vars
    }

    pub fn unit_of_work(&mut self) -> &mut UnitOfWork {
        &mut self.unit_of_work
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EmbeddedBackend;

    #[test]
    fn test_define_scope_merges() {
        let mut ctx = RequestContext::new(Arc::new(EmbeddedBackend::in_memory()));
        ctx.define_scope("Post", [("published", true)]);
        ctx.define_scope("Post", [("published", false)]);
        ctx.define_scope("Post", [("author", 3)]);

        let filters: Vec<(&str, &Value)> = ctx.scope("Post").collect();
        assert_eq!(
            filters,
            vec![("author", &Value::Int(3)), ("published", &Value::Bool(false))]
        );
        assert_eq!(ctx.scope("User").count(), 0);

        ctx.clear_scope("Post");
        assert_eq!(ctx.scope("Post").count(), 0);
    }
}
