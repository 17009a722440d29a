/// Normalization of update data
///
/// Update data uses the same `field__op` DSL as filters. Only three forms are
/// meaningful: a bare field (assignment), `field__incr` and `field__push`.
use super::operator::{split_field_operator, Operator};
use crate::error::{Error, Result};
use crate::value::Value;
use std::fmt;

/// Kind of change applied to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    /// Direct assignment
    Set,
    /// Atomic numeric increment
    Incr,
    /// Append to an array field
    Push,
}

/// A normalized field change
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub field: String,
    pub op: UpdateOp,
    pub value: Value,
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            UpdateOp::Set => write!(f, "{} = {}", self.field, self.value),
            UpdateOp::Incr => write!(f, "{} += {}", self.field, self.value),
            UpdateOp::Push => write!(f, "{} <- {}", self.field, self.value),
        }
    }
}

/// Normalize `(field__op, value)` pairs into assignments.
///
/// Read operators (`lt`, `in`, ...) have no meaning in update data and are
/// rejected with [`Error::Query`].
pub fn prepare_update<I, K, V>(data: I) -> Result<Vec<Assignment>>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    data.into_iter()
        .map(|(token, value)| {
            let (field, operator) = split_field_operator(token.as_ref())?;
            let op = match operator {
                Operator::Eq => UpdateOp::Set,
                Operator::Incr => UpdateOp::Incr,
                Operator::Push => UpdateOp::Push,
                other => {
                    return Err(Error::Query(format!(
                        "Operator '{}' cannot be used in update data (field '{}')",
                        other, field
                    )))
                }
            };
            Ok(Assignment {
                field: field.to_string(),
                op,
                value: value.into(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_update() {
        let assignments =
            prepare_update(vec![("name", Value::from("x")), ("score__incr", Value::Int(1))])
                .unwrap();
        assert_eq!(assignments[0].op, UpdateOp::Set);
        assert_eq!(assignments[1].field, "score");
        assert_eq!(assignments[1].op, UpdateOp::Incr);
        assert_eq!(assignments[1].to_string(), "score += 1");
    }

    #[test]
    fn test_read_operator_rejected() {
        assert!(matches!(
            prepare_update(vec![("age__gt", 3)]),
            Err(Error::Query(_))
        ));
        assert!(matches!(
            prepare_update(vec![("age__nope", 3)]),
            Err(Error::UnknownOperator(_))
        ));
    }
}
