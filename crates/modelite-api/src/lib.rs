//! # Modelite
//!
//! A database-agnostic object-query layer. Application code builds
//! declarative, immutable queries against named models; a pluggable
//! [`Backend`] translates them into the native operations of an embedded
//! store, a relational engine or a document store.
//!
//! ## Quick Start
//!
//! ```rust
//! use modelite::{BackendFactories, Models, ModelsConfig, QueryOptions, Record, Value};
//!
//! fn main() -> modelite::Result<()> {
//!     let config = ModelsConfig::new("embedded").with_option("auto_create_models", "true");
//!     let models = Models::from_config(config, &BackendFactories::new())?;
//!
//!     for (name, age) in [("Alice", 31), ("Bob", 17), ("Carol", 45)] {
//!         models.save("User", Record::new().with("name", name).with("age", age))?;
//!     }
//!
//!     let adults = models
//!         .query("User")?
//!         .filter_by([("age__gte", 18)])?
//!         .order_by("age DESC")?;
//!     assert_eq!(adults.count()?, 2);
//!     assert_eq!(adults.first()?.and_then(|u| u.get("name").cloned()), Some(Value::from("Carol")));
//!
//!     let ctx = models.context();
//!     let options = QueryOptions::new().order_by("name").paginate(1, Some(2));
//!     let (page, pagination) = models.find_all("User", &ctx, &options)?;
//!     assert_eq!(page.len(), 2);
//!     assert_eq!(pagination.map(|p| p.nb_pages()), Some(2));
//!     Ok(())
//! }
//! ```
//!
//! ## Backends
//!
//! - [`EmbeddedBackend`]: in-process tables with snapshot persistence
//! - [`SqlBackend`]: parameterized SQL over a [`SqlConnection`]
//! - [`DocumentBackend`]: JSON filter documents over a [`DocumentStore`]
//!
//! Backends are selected by name through [`BackendFactories`].
//!
//! ## Requests and transactions
//!
//! Per-request state (model scopes, scope variables, the transaction stack)
//! is held by an explicit [`RequestContext`]; its [`UnitOfWork`] runs
//! delayed calls once the outermost transaction commits.

#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod factory;
pub mod logging;
pub mod models;
pub mod transaction;

// Re-export core types
pub use modelite_core::pagination::{PageIter, PageWindow};
pub use modelite_core::query::{Assignment, OrderBy, UpdateOp};
pub use modelite_core::{
    and, or, Backend, Direction, Error, FieldSpec, FieldType, Filter, FilterGroup, ModelRef,
    ModelRegistry, Operator, Pagination, Predicate, Query, Record, Result, Value, PRIMARY_KEY,
};

// Backends
pub use modelite_document::{
    Document, DocumentBackend, DocumentConfig, DocumentStore, FindCommand, UpdateCommand,
};
pub use modelite_embedded::{EmbeddedBackend, EmbeddedConfig};
pub use modelite_sql::{Placeholder, SqlBackend, SqlConfig, SqlConnection, SqlStatement};

pub use config::{ModelsConfig, ScopeFilter, ScopeValue};
pub use context::RequestContext;
pub use factory::{BackendFactories, BackendFactory};
pub use models::{slugify, Models, PageRequest, QueryOptions};
pub use transaction::{DelayedCall, TransactionGate, UnitOfWork};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
