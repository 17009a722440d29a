//! Model registry.
//!
//! An explicit name → [`ModelRef`] map owned by the application context.
//! Several independent registries can coexist (one per test, per tenant...).

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::model::{FieldSpec, ModelRef};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Cache of models resolved through a backend
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: RwLock<HashMap<String, ModelRef>>,
}

impl ModelRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name`, asking the backend on first use, then validate
    /// `fields` against the model schema when any are declared.
    pub fn ensure(&self, backend: &dyn Backend, name: &str, fields: &[FieldSpec]) -> Result<ModelRef> {
        let cached = self.get(name)?;
        let model = match cached {
            Some(model) => model,
            None => {
                let model = backend.ensure_model(name)?;
                debug!(model = name, backend = backend.name(), "registered model");
                let mut models = self.models.write().map_err(|_| Error::LockPoisoned)?;
                models.entry(name.to_string()).or_insert(model).clone()
            }
        };
        if !fields.is_empty() {
            backend.ensure_schema(name, fields)?;
        }
        Ok(model)
    }

    /// Register a model handle under `name`, replacing any previous one
    pub fn insert(&self, name: impl Into<String>, model: ModelRef) -> Result<()> {
        let mut models = self.models.write().map_err(|_| Error::LockPoisoned)?;
        models.insert(name.into(), model);
        Ok(())
    }

    /// Cached handle for `name`, without asking the backend
    pub fn get(&self, name: &str) -> Result<Option<ModelRef>> {
        let models = self.models.read().map_err(|_| Error::LockPoisoned)?;
        Ok(models.get(name).cloned())
    }

    /// Whether `name` has been resolved already
    pub fn contains(&self, name: &str) -> bool {
        self.models
            .read()
            .map(|models| models.contains_key(name))
            .unwrap_or(false)
    }

    /// Registered model names, sorted
    pub fn names(&self) -> Result<Vec<String>> {
        let models = self.models.read().map_err(|_| Error::LockPoisoned)?;
        let mut names: Vec<String> = models.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
