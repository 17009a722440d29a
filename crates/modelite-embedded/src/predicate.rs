// Native predicate tree of the embedded store
//
// Built once per query from the abstract filter tree, then evaluated against
// every row of the table.

use modelite_core::query::{Combinator, Comparator, Filter, FilterGroup, Operator, Predicate};
use modelite_core::{Error, Record, Result, Value};
use std::fmt;

const BACKEND: &str = "embedded";

/// Row-level predicate
#[derive(Clone)]
pub enum RowPredicate {
    /// Every child matches (an empty list matches everything)
    All(Vec<RowPredicate>),
    /// At least one child matches
    Any(Vec<RowPredicate>),
    Compare {
        field: String,
        operator: Operator,
        comparator: Comparator,
        value: Value,
    },
    /// Membership in a list of candidates, negated for `nin`
    In {
        field: String,
        candidates: Vec<Value>,
        negated: bool,
    },
    /// Substring for strings, element membership for lists
    Contains { field: String, needle: Value },
}

impl RowPredicate {
    /// Translate a filter group depth-first. An empty group of either
    /// combinator matches every row.
    pub fn from_group(group: &FilterGroup) -> Result<Self> {
        let children = group
            .children()
            .iter()
            .map(Self::from_predicate)
            .collect::<Result<Vec<_>>>()?;
        Ok(match group.combinator() {
            Combinator::Or if !children.is_empty() => RowPredicate::Any(children),
            _ => RowPredicate::All(children),
        })
    }

    fn from_predicate(predicate: &Predicate) -> Result<Self> {
        match predicate {
            Predicate::Filter(filter) => Self::from_filter(filter),
            Predicate::Group(group) => Self::from_group(group),
        }
    }

    /// Translate a single leaf
    pub fn from_filter(filter: &Filter) -> Result<Self> {
        let field = filter.field().to_string();
        let operator = filter.operator();
        if let Some(comparator) = operator.comparator() {
            return Ok(RowPredicate::Compare {
                field,
                operator,
                comparator,
                value: filter.value().clone(),
            });
        }
        match operator {
            Operator::In | Operator::Nin => Ok(RowPredicate::In {
                field,
                candidates: candidates(filter.value()),
                negated: operator == Operator::Nin,
            }),
            Operator::Contains => Ok(RowPredicate::Contains {
                field,
                needle: filter.value().clone(),
            }),
            other => Err(Error::unsupported_operator(other, BACKEND)),
        }
    }

    /// Whether `record` satisfies the predicate. Missing fields read as `Null`.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            RowPredicate::All(children) => children.iter().all(|c| c.matches(record)),
            RowPredicate::Any(children) => children.iter().any(|c| c.matches(record)),
            RowPredicate::Compare {
                field,
                comparator,
                value,
                ..
            } => comparator(read(record, field), value),
            RowPredicate::In {
                field,
                candidates,
                negated,
            } => {
                let actual = read(record, field);
                candidates.iter().any(|c| actual.loosely_eq(c)) != *negated
            }
            RowPredicate::Contains { field, needle } => match (read(record, field), needle) {
                (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
                (Value::List(items), needle) => items.iter().any(|item| item.loosely_eq(needle)),
                _ => false,
            },
        }
    }
}

static NULL: Value = Value::Null;

fn read<'a>(record: &'a Record, field: &str) -> &'a Value {
    record.get(field).unwrap_or(&NULL)
}

// A scalar `in` operand is a one-element list
fn candidates(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.clone(),
        other => vec![other.clone()],
    }
}

impl fmt::Debug for RowPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowPredicate::All(children) => f.debug_tuple("All").field(children).finish(),
            RowPredicate::Any(children) => f.debug_tuple("Any").field(children).finish(),
            RowPredicate::Compare {
                field,
                operator,
                value,
                ..
            } => write!(f, "{} {} {}", field, operator.symbol(), value),
            RowPredicate::In {
                field,
                candidates,
                negated,
            } => write!(
                f,
                "{} {}IN {:?}",
                field,
                if *negated { "NOT " } else { "" },
                candidates
            ),
            RowPredicate::Contains { field, needle } => write!(f, "{} CONTAINS {}", field, needle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelite_core::{and, or};

    fn row() -> Record {
        Record::new()
            .with("id", 1)
            .with("name", "Alice")
            .with("age", 31)
            .with("tags", vec!["admin", "staff"])
    }

    #[test]
    fn test_comparisons() {
        let record = row();
        let cases = [
            (Filter::new("age", Operator::Gt, 30), true),
            (Filter::new("age", Operator::Lte, 30), false),
            (Filter::new("age", Operator::Eq, 31.0), true),
            (Filter::new("name", Operator::Ne, "Bob"), true),
            (Filter::new("missing", Operator::Eq, Value::Null), true),
            (Filter::new("name", Operator::Lt, 5), false),
        ];
        for (filter, expected) in cases {
            let predicate = RowPredicate::from_filter(&filter).unwrap();
            assert_eq!(predicate.matches(&record), expected, "{}", filter);
        }
    }

    #[test]
    fn test_membership_and_contains() {
        let record = row();
        let check = |filter: Filter| RowPredicate::from_filter(&filter).unwrap().matches(&record);
        assert!(check(Filter::new("age", Operator::In, vec![30, 31])));
        assert!(check(Filter::new("age", Operator::In, 31)));
        assert!(!check(Filter::new("age", Operator::Nin, vec![31])));
        assert!(check(Filter::new("name", Operator::Contains, "lic")));
        assert!(check(Filter::new("tags", Operator::Contains, "staff")));
        assert!(!check(Filter::new("age", Operator::Contains, 3)));
    }

    #[test]
    fn test_update_operators_rejected() {
        let err = RowPredicate::from_filter(&Filter::new("age", Operator::Incr, 1)).unwrap_err();
        assert!(matches!(err, Error::Query(_)));
    }

    #[test]
    fn test_nested_groups() {
        let group = and(vec![
            Predicate::from(Filter::new("age", Operator::Gte, 18)),
            or(vec![Filter::eq("name", "Bob"), Filter::eq("name", "Alice")]).into(),
        ]);
        assert!(RowPredicate::from_group(&group).unwrap().matches(&row()));
    }

    #[test]
    fn test_empty_groups_match_everything() {
        let empty_or = RowPredicate::from_group(&or(Vec::<Filter>::new())).unwrap();
        assert!(empty_or.matches(&row()));
        let nested = or(vec![
            Predicate::from(Filter::eq("name", "Bob")),
            and(Vec::<Filter>::new()).into(),
        ]);
        assert!(RowPredicate::from_group(&nested).unwrap().matches(&row()));
    }
}
