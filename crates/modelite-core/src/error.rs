//! Error types for Modelite.

use thiserror::Error;

/// The main error type for Modelite operations.
///
/// Every crate of the workspace reports failures through this enum so that
/// callers can match on the taxonomy regardless of the active backend.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested model name is not registered with the backend
    #[error("Model '{0}' not found")]
    ModelNotFound(String),

    /// A declared field does not exist on the underlying model
    #[error("Missing field '{field}' in model '{model}'")]
    ModelSchema {
        /// Model being validated
        model: String,
        /// Field that could not be found
        field: String,
    },

    /// A filter suffix names an operator outside the known set
    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),

    /// Malformed query, or an operator/feature the active backend cannot express
    #[error("Query error: {0}")]
    Query(String),

    /// `one()` matched no row
    #[error("No result found")]
    NoResult,

    /// Requested page lies outside `[1, nb_pages]`
    #[error("Page {page} is out of bounds (1..={nb_pages})")]
    PageOutOfBound {
        /// Requested page
        page: usize,
        /// Number of available pages
        nb_pages: usize,
    },

    /// A lookup whose absence is an expected, user-facing outcome
    #[error("Not found")]
    NotFound,

    /// A uniqueness check found matching records
    #[error("{0}")]
    AlreadyExists(String),

    /// Invalid configuration (unknown backend, ambiguous discovery...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transaction lifecycle misuse or failure
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Failure reported by the underlying storage engine
    #[error("Backend error: {0}")]
    Backend(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Persisted data failed an integrity check
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// A lock was poisoned (internal error)
    #[error("Lock poisoned")]
    LockPoisoned,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for an unsupported-operator error raised during translation.
    pub fn unsupported_operator(operator: impl std::fmt::Display, backend: &str) -> Self {
        Error::Query(format!(
            "Operator '{}' is not supported by the {} backend",
            operator, backend
        ))
    }

    /// Returns true for the two "absence" outcomes (`NotFound`, `NoResult`).
    pub fn is_absence(&self) -> bool {
        matches!(self, Error::NotFound | Error::NoResult)
    }
}

/// A specialized `Result` type for Modelite operations.
pub type Result<T> = std::result::Result<T, Error>;
