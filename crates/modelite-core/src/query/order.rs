/// Ordering clauses and the order-by spec parser
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            _ => Err(Error::Query(format!("Invalid sort direction '{}'", s))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
        }
    }
}

/// One `(field, direction)` ordering pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, Direction::Desc)
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction)
    }
}

/// Argument accepted by `Query::order_by`.
///
/// `OrderSpec::Clear` (from `None`) resets the ordering. Text specs are a
/// comma-separated list of fields, each optionally followed by `ASC`/`DESC`.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderSpec {
    Clear,
    Text(String),
    Pairs(Vec<OrderBy>),
}

impl OrderSpec {
    /// Resolve into ordering pairs; `None` means "clear".
    pub fn resolve(self) -> Result<Option<Vec<OrderBy>>> {
        match self {
            OrderSpec::Clear => Ok(None),
            OrderSpec::Pairs(pairs) => Ok(Some(pairs)),
            OrderSpec::Text(text) => parse_order_spec(&text).map(Some),
        }
    }
}

/// Parse `"name"`, `"name DESC"` or `"a, b DESC"` into ordering pairs.
pub fn parse_order_spec(spec: &str) -> Result<Vec<OrderBy>> {
    let mut out = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(Error::Query(format!("Empty field in order spec '{}'", spec)));
        }
        let order = match part.rsplit_once(char::is_whitespace) {
            Some((field, direction)) => OrderBy::new(field.trim(), direction.parse()?),
            None => OrderBy::asc(part),
        };
        out.push(order);
    }
    Ok(out)
}

impl From<&str> for OrderSpec {
    fn from(spec: &str) -> Self {
        OrderSpec::Text(spec.to_string())
    }
}

impl From<String> for OrderSpec {
    fn from(spec: String) -> Self {
        OrderSpec::Text(spec)
    }
}

impl From<Option<&str>> for OrderSpec {
    fn from(spec: Option<&str>) -> Self {
        spec.map(OrderSpec::from).unwrap_or(OrderSpec::Clear)
    }
}

impl From<(&str, Direction)> for OrderSpec {
    fn from((field, direction): (&str, Direction)) -> Self {
        OrderSpec::Pairs(vec![OrderBy::new(field, direction)])
    }
}

impl From<Vec<(&str, Direction)>> for OrderSpec {
    fn from(pairs: Vec<(&str, Direction)>) -> Self {
        OrderSpec::Pairs(
            pairs
                .into_iter()
                .map(|(field, direction)| OrderBy::new(field, direction))
                .collect(),
        )
    }
}

impl From<OrderBy> for OrderSpec {
    fn from(order: OrderBy) -> Self {
        OrderSpec::Pairs(vec![order])
    }
}

impl From<Vec<OrderBy>> for OrderSpec {
    fn from(pairs: Vec<OrderBy>) -> Self {
        OrderSpec::Pairs(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_field_defaults_to_asc() {
        assert_eq!(parse_order_spec("name").unwrap(), vec![OrderBy::asc("name")]);
    }

    #[test]
    fn test_inline_direction() {
        assert_eq!(parse_order_spec("name desc").unwrap(), vec![OrderBy::desc("name")]);
    }

    #[test]
    fn test_comma_separated() {
        assert_eq!(
            parse_order_spec("last_name, age DESC").unwrap(),
            vec![OrderBy::asc("last_name"), OrderBy::desc("age")]
        );
    }

    #[test]
    fn test_invalid_direction() {
        assert!(matches!(parse_order_spec("name sideways"), Err(Error::Query(_))));
        assert!(parse_order_spec("a,,b").is_err());
    }

    #[test]
    fn test_none_clears() {
        assert_eq!(OrderSpec::from(None::<&str>).resolve().unwrap(), None);
    }
}
