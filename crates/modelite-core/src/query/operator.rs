/// Filter operators and the `field__op` suffix normalizer
///
/// Field tokens may carry an operator suffix separated by a double
/// underscore (`age__gte`, `tags__contains`, `score__incr`). Tokens without a
/// suffix use the equality operator.
use crate::error::{Error, Result};
use crate::value::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Separator between a field name and its operator suffix
pub const OPERATOR_SEPARATOR: &str = "__";

/// Filter and update operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Nin,
    Contains,
    /// Update only: atomic increment
    Incr,
    /// Update only: append to an array field
    Push,
}

/// Native comparison function for the comparison operators
pub type Comparator = fn(&Value, &Value) -> bool;

impl Operator {
    /// Every operator, in DSL order
    pub const ALL: [Operator; 11] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Lte,
        Operator::Gt,
        Operator::Gte,
        Operator::In,
        Operator::Nin,
        Operator::Contains,
        Operator::Incr,
        Operator::Push,
    ];

    /// DSL suffix of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::In => "in",
            Operator::Nin => "nin",
            Operator::Contains => "contains",
            Operator::Incr => "incr",
            Operator::Push => "push",
        }
    }

    /// Symbol used when printing filters
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::In => "IN",
            Operator::Nin => "NOT IN",
            Operator::Contains => "CONTAINS",
            Operator::Incr => "+=",
            Operator::Push => "PUSH",
        }
    }

    /// `incr` and `push` are meaningless in a read predicate
    pub fn is_update_only(&self) -> bool {
        matches!(self, Operator::Incr | Operator::Push)
    }

    /// Native comparator for `eq, ne, lt, lte, gt, gte`.
    ///
    /// `in`, `nin`, `contains`, `incr` and `push` have no native comparator and
    /// must be handled by backend-specific translation.
    pub fn comparator(&self) -> Option<Comparator> {
        match self {
            Operator::Eq => Some(cmp_eq),
            Operator::Ne => Some(cmp_ne),
            Operator::Lt => Some(cmp_lt),
            Operator::Lte => Some(cmp_lte),
            Operator::Gt => Some(cmp_gt),
            Operator::Gte => Some(cmp_gte),
            _ => None,
        }
    }
}

fn cmp_eq(a: &Value, b: &Value) -> bool {
    a.loosely_eq(b)
}

fn cmp_ne(a: &Value, b: &Value) -> bool {
    !a.loosely_eq(b)
}

fn cmp_lt(a: &Value, b: &Value) -> bool {
    a.compare(b) == Some(Ordering::Less)
}

fn cmp_lte(a: &Value, b: &Value) -> bool {
    matches!(a.compare(b), Some(Ordering::Less | Ordering::Equal))
}

fn cmp_gt(a: &Value, b: &Value) -> bool {
    a.compare(b) == Some(Ordering::Greater)
}

fn cmp_gte(a: &Value, b: &Value) -> bool {
    matches!(a.compare(b), Some(Ordering::Greater | Ordering::Equal))
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| Error::UnknownOperator(s.to_string()))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Split a field token into `(field, operator)`.
///
/// The operator suffix follows the last separator; a token without separator
/// uses [`Operator::Eq`]. Unknown suffixes fail with
/// [`Error::UnknownOperator`].
///
/// ```
/// use modelite_core::query::{split_field_operator, Operator};
///
/// assert_eq!(split_field_operator("age__gte").unwrap(), ("age", Operator::Gte));
/// assert_eq!(split_field_operator("name").unwrap(), ("name", Operator::Eq));
/// assert!(split_field_operator("age__bogus").is_err());
/// ```
pub fn split_field_operator(token: &str) -> Result<(&str, Operator)> {
    match token.rsplit_once(OPERATOR_SEPARATOR) {
        Some((field, suffix)) => {
            if field.is_empty() {
                return Err(Error::Query(format!(
                    "Missing field name in filter token '{}'",
                    token
                )));
            }
            Ok((field, suffix.parse()?))
        }
        None => Ok((token, Operator::Eq)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_operator_round_trips() {
        for op in Operator::ALL {
            let token = format!("field{}{}", OPERATOR_SEPARATOR, op);
            assert_eq!(split_field_operator(&token).unwrap(), ("field", op));
        }
    }

    #[test]
    fn test_bare_field_defaults_to_eq() {
        assert_eq!(split_field_operator("name").unwrap(), ("name", Operator::Eq));
    }

    #[test]
    fn test_unknown_operator_rejected() {
        match split_field_operator("field__bogus") {
            Err(Error::UnknownOperator(op)) => assert_eq!(op, "bogus"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_nested_field_keeps_prefix() {
        assert_eq!(
            split_field_operator("author__name__ne").unwrap(),
            ("author__name", Operator::Ne)
        );
    }

    #[test]
    fn test_missing_field_name() {
        assert!(matches!(split_field_operator("__eq"), Err(Error::Query(_))));
    }

    #[test]
    fn test_comparators() {
        let gte = Operator::Gte.comparator().unwrap();
        assert!(gte(&Value::Int(18), &Value::Int(18)));
        assert!(!gte(&Value::Int(17), &Value::Int(18)));
        assert!(Operator::In.comparator().is_none());
        assert!(Operator::Push.comparator().is_none());
        assert!(Operator::Push.is_update_only());
    }
}
