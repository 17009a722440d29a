//! # Modelite Core
//!
//! Core types for the Modelite object-query layer: the filter DSL and its
//! predicate algebra, the immutable query builder, pagination arithmetic and
//! the [`Backend`] contract every storage engine adapter implements.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of Modelite.**
//!
//! Users should depend on the main `modelite` crate instead, which provides
//! the stable public API.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
#[allow(missing_docs)]
pub mod model;
pub mod pagination;
pub mod query;
pub mod registry;
#[allow(missing_docs)]
pub mod value;


pub use backend::Backend;
pub use error::{Error, Result};
pub use model::{FieldSpec, FieldType, ModelRef, Record, PRIMARY_KEY};
pub use pagination::{PageIter, PageWindow, Pagination};
pub use query::{and, or, Direction, Filter, FilterGroup, Operator, Predicate, Query};
pub use registry::ModelRegistry;
pub use value::Value;
