/// Filter predicates and their AND/OR algebra
///
/// A query's predicate is a tree: leaves are [`Filter`] triples and inner
/// nodes are [`FilterGroup`]s tagged with a [`Combinator`]. Backends walk
/// this tree to build their native predicate.
use super::operator::{split_field_operator, Operator};
use crate::error::Result;
use crate::value::Value;
use std::fmt;

/// Atomic predicate `(field, operator, value)`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    field: String,
    operator: Operator,
    value: Value,
}

impl Filter {
    /// Filter on `field` with an already normalized operator
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Equality filter
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    /// Build a filter from a DSL token such as `age__gte`.
    pub fn parse(token: &str, value: impl Into<Value>) -> Result<Self> {
        let (field, operator) = split_field_operator(token)?;
        Ok(Self::new(field, operator, value))
    }

    /// Field the filter applies to
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Normalized operator
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Operand compared against the field
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator.symbol(), self.value)
    }
}

/// Boolean combinator of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Every child must match
    And,
    /// At least one child must match
    Or,
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::And => write!(f, "AND"),
            Combinator::Or => write!(f, "OR"),
        }
    }
}

/// A node of the predicate tree
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Leaf `(field, operator, value)` triple
    Filter(Filter),
    /// Nested AND/OR group
    Group(FilterGroup),
}

impl From<Filter> for Predicate {
    fn from(filter: Filter) -> Self {
        Predicate::Filter(filter)
    }
}

impl From<FilterGroup> for Predicate {
    fn from(group: FilterGroup) -> Self {
        Predicate::Group(group)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Filter(filter) => write!(f, "{}", filter),
            Predicate::Group(group) => write!(f, "({})", group),
        }
    }
}

/// Ordered children combined with AND or OR.
///
/// Built only through [`and`] and [`or`]; never mutated afterwards. An empty
/// group matches everything.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGroup {
    combinator: Combinator,
    children: Vec<Predicate>,
}

impl FilterGroup {
    /// How the children are combined
    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    /// Children in insertion order
    pub fn children(&self) -> &[Predicate] {
        &self.children
    }

    /// Whether the group has no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether the group holds for every row regardless of its leaves: it is
    /// empty, an AND of such groups, or an OR containing one.
    pub fn matches_everything(&self) -> bool {
        let trivial = |child: &Predicate| matches!(child, Predicate::Group(g) if g.matches_everything());
        match self.combinator {
            _ if self.children.is_empty() => true,
            Combinator::And => self.children.iter().all(trivial),
            Combinator::Or => self.children.iter().any(trivial),
        }
    }

    /// Leaf filters in depth-first order
    pub fn leaves(&self) -> Vec<&Filter> {
        let mut out = Vec::new();
        collect_leaves(&self.children, &mut out);
        out
    }
}

fn collect_leaves<'a>(children: &'a [Predicate], out: &mut Vec<&'a Filter>) {
    for child in children {
        match child {
            Predicate::Filter(filter) => out.push(filter),
            Predicate::Group(group) => collect_leaves(&group.children, out),
        }
    }
}

impl fmt::Display for FilterGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", self.combinator)?;
            }
            write!(f, "{}", child)?;
        }
        Ok(())
    }
}

/// Combine predicates with AND
pub fn and<I, P>(predicates: I) -> FilterGroup
where
    I: IntoIterator<Item = P>,
    P: Into<Predicate>,
{
    FilterGroup {
        combinator: Combinator::And,
        children: predicates.into_iter().map(Into::into).collect(),
    }
}

/// Combine predicates with OR
pub fn or<I, P>(predicates: I) -> FilterGroup
where
    I: IntoIterator<Item = P>,
    P: Into<Predicate>,
{
    FilterGroup {
        combinator: Combinator::Or,
        children: predicates.into_iter().map(Into::into).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parse() {
        let filter = Filter::parse("age__gte", 18).unwrap();
        assert_eq!(filter, Filter::new("age", Operator::Gte, 18));
        assert_eq!(filter.to_string(), "age >= 18");
    }

    #[test]
    fn test_group_display() {
        let group = and(vec![
            Predicate::from(or(vec![Filter::eq("x", 1), Filter::eq("x", 2)])),
            Filter::new("y", Operator::Ne, "z").into(),
        ]);
        assert_eq!(group.to_string(), "(x = 1 OR x = 2) AND y != 'z'");
    }

    #[test]
    fn test_leaves_are_depth_first() {
        let group = or(vec![
            Predicate::from(Filter::eq("a", 1)),
            and(vec![Filter::eq("b", 2), Filter::eq("c", 3)]).into(),
        ]);
        let fields: Vec<&str> = group.leaves().iter().map(|f| f.field()).collect();
        assert_eq!(fields, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_group() {
        let group = and(Vec::<Filter>::new());
        assert!(group.is_empty());
        assert_eq!(group.to_string(), "");
        assert!(or(Vec::<Filter>::new()).matches_everything());
    }

    #[test]
    fn test_matches_everything_through_nesting() {
        let empty = || Predicate::from(or(Vec::<Filter>::new()));
        assert!(and(vec![empty(), and(Vec::<Filter>::new()).into()]).matches_everything());
        assert!(or(vec![Predicate::from(Filter::eq("a", 1)), empty()]).matches_everything());
        assert!(!and(vec![Predicate::from(Filter::eq("a", 1)), empty()]).matches_everything());
        assert!(!or(vec![Filter::eq("a", 1)]).matches_everything());
    }
}
