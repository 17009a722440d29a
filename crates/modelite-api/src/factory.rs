//! Backend factory registry.
//!
//! A backend is referenced from [`ModelsConfig::backend`] either directly as
//! `module::Name`, or by its module alone, in which case the module must
//! provide exactly one backend. Resolution happens once, when
//! [`Models`](crate::Models) is built, so a misconfigured backend fails at
//! startup instead of on the first query.

use crate::config::ModelsConfig;
use crate::{Backend, Error, Result};
use modelite_document::{DocumentBackend, DocumentConfig, DocumentStore};
use modelite_embedded::{EmbeddedBackend, EmbeddedConfig};
use modelite_sql::{Placeholder, SqlBackend, SqlConfig, SqlConnection};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Builds a backend from the models configuration
pub type BackendFactory = Arc<dyn Fn(&ModelsConfig) -> Result<Arc<dyn Backend>> + Send + Sync>;

/// Registry of backend factories keyed by `(module, name)`
#[derive(Clone)]
pub struct BackendFactories {
    factories: BTreeMap<(String, String), BackendFactory>,
}

impl BackendFactories {
    /// Registry providing the embedded backend (`embedded::EmbeddedBackend`)
    pub fn new() -> Self {
        let mut factories = Self::empty();
        factories.register("embedded", "EmbeddedBackend", |config| {
            Ok(Arc::new(embedded_backend(config)?) as Arc<dyn Backend>)
        });
        factories
    }

    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register `factory` as `module::name`, replacing any previous one
    pub fn register<F>(&mut self, module: &str, name: &str, factory: F) -> &mut Self
    where
        F: Fn(&ModelsConfig) -> Result<Arc<dyn Backend>> + Send + Sync + 'static,
    {
        self.factories
            .insert((module.to_string(), name.to_string()), Arc::new(factory));
        self
    }

    /// Register a relational backend as `module::SqlBackend`.
    ///
    /// `connect` opens the engine connection; the `placeholder` option
    /// (`question_mark` or `numbered`) selects the parameter style.
    pub fn register_sql<C, F>(&mut self, module: &str, connect: F) -> &mut Self
    where
        C: SqlConnection + 'static,
        F: Fn(&ModelsConfig) -> Result<C> + Send + Sync + 'static,
    {
        self.register(module, "SqlBackend", move |config| {
            let placeholder = match config.option("placeholder") {
                None | Some("question_mark") => Placeholder::QuestionMark,
                Some("numbered") => Placeholder::Numbered,
                Some(other) => {
                    return Err(Error::Config(format!("Unknown placeholder style '{}'", other)))
                }
            };
            let backend = SqlBackend::new(connect(config)?, SqlConfig { placeholder });
            Ok(Arc::new(backend) as Arc<dyn Backend>)
        })
    }

    /// Register a document backend as `module::DocumentBackend`.
    ///
    /// The `id_field` option overrides the store's primary key field.
    pub fn register_document<S, F>(&mut self, module: &str, connect: F) -> &mut Self
    where
        S: DocumentStore + 'static,
        F: Fn(&ModelsConfig) -> Result<S> + Send + Sync + 'static,
    {
        self.register(module, "DocumentBackend", move |config| {
            let mut options = DocumentConfig::default();
            if let Some(id_field) = config.option("id_field") {
                options.id_field = id_field.to_string();
            }
            let backend = DocumentBackend::new(connect(config)?, options);
            Ok(Arc::new(backend) as Arc<dyn Backend>)
        })
    }

    /// Find the factory referenced by `reference`, returning its full name
    pub fn resolve(&self, reference: &str) -> Result<(String, BackendFactory)> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(Error::Config("No backend configured".to_string()));
        }

        if let Some((module, name)) = reference.rsplit_once("::") {
            return self
                .factories
                .get(&(module.to_string(), name.to_string()))
                .map(|factory| (reference.to_string(), factory.clone()))
                .ok_or_else(|| Error::Config(format!("Unknown backend '{}'", reference)));
        }

        let mut found = self
            .factories
            .iter()
            .filter(|((module, _), _)| module == reference);
        match (found.next(), found.next()) {
            (None, _) => Err(Error::Config(format!(
                "Cannot find a backend in module '{}'",
                reference
            ))),
            (Some(((module, name), factory)), None) => {
                Ok((format!("{}::{}", module, name), factory.clone()))
            }
            (Some(_), Some(_)) => Err(Error::Config(format!(
                "Backend module '{}' references several backends",
                reference
            ))),
        }
    }

    /// Resolve the configured backend and build it
    pub fn build(&self, config: &ModelsConfig) -> Result<Arc<dyn Backend>> {
        let (name, factory) = self.resolve(&config.backend)?;
        debug!(backend = %name, "building backend");
        factory(config)
    }

    /// Registered `module::name` references, sorted
    pub fn names(&self) -> Vec<String> {
        self.factories
            .keys()
            .map(|(module, name)| format!("{}::{}", module, name))
            .collect()
    }
}

impl Default for BackendFactories {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BackendFactories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendFactories")
            .field("factories", &self.names())
            .finish()
    }
}

/// Embedded store built from the `auto_create_models` and `snapshot_path` options
fn embedded_backend(config: &ModelsConfig) -> Result<EmbeddedBackend> {
    let options = EmbeddedConfig {
        auto_create_models: config.parsed_option("auto_create_models")?.unwrap_or(false),
        snapshot_path: config.option("snapshot_path").map(PathBuf::from),
    };
    EmbeddedBackend::open(options)
}
