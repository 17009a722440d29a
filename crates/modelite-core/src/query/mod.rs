//! Query abstraction
//!
//! Filter DSL, predicate algebra, ordering, update normalization and the
//! immutable query builder.

/// Query builder
pub mod builder;
/// Filters and filter groups
pub mod filter;
/// Operator set and `field__op` normalizer
#[allow(missing_docs)]
pub mod operator;
/// Ordering clauses
#[allow(missing_docs)]
pub mod order;
/// Update data normalization
#[allow(missing_docs)]
pub mod update;

// Re-export main types
pub use builder::Query;
pub use filter::{and, or, Combinator, Filter, FilterGroup, Predicate};
pub use operator::{split_field_operator, Comparator, Operator, OPERATOR_SEPARATOR};
pub use order::{parse_order_spec, Direction, OrderBy, OrderSpec};
pub use update::{prepare_update, Assignment, UpdateOp};
