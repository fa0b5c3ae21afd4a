use crate::common::Result;
use crate::storage::tuple::Tuple;
use crate::types::field::Field;
use serde::{Deserialize, Serialize};

/// A comparison operator. `Like` is substring containment and only
/// meaningful on text; any comparison across mismatched types is false.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEq,
    GreaterThan,
    GreaterThanOrEq,
    Like,
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Op::Equals => "=",
            Op::NotEquals => "<>",
            Op::LessThan => "<",
            Op::LessThanOrEq => "<=",
            Op::GreaterThan => ">",
            Op::GreaterThanOrEq => ">=",
            Op::Like => "like",
        };
        write!(f, "{symbol}")
    }
}

impl Op {
    pub fn compare(&self, lhs: &Field, rhs: &Field) -> bool {
        match self {
            Op::Equals => lhs == rhs,
            Op::NotEquals => lhs != rhs,
            Op::Like => match (lhs, rhs) {
                (Field::Text(value), Field::Text(pattern)) => value.contains(pattern.as_str()),
                _ => false,
            },
            ordered => {
                if lhs.get_type() != rhs.get_type() {
                    return false;
                }
                match ordered {
                    Op::LessThan => lhs < rhs,
                    Op::LessThanOrEq => lhs <= rhs,
                    Op::GreaterThan => lhs > rhs,
                    Op::GreaterThanOrEq => lhs >= rhs,
                    _ => unreachable!("equality ops handled above"),
                }
            }
        }
    }
}

/// Compares one field of a tuple against a constant.
#[derive(Clone, Debug)]
pub struct Predicate {
    field: usize,
    op: Op,
    operand: Field,
}

impl Predicate {
    pub fn new(field: usize, op: Op, operand: Field) -> Predicate {
        Predicate { field, op, operand }
    }

    pub fn filter(&self, tuple: &Tuple) -> Result<bool> {
        Ok(self.op.compare(tuple.get_field(self.field)?, &self.operand))
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "f{} {} {}", self.field, self.op, self.operand)
    }
}

/// Compares one field of a left tuple against one field of a right tuple.
#[derive(Clone, Debug)]
pub struct JoinPredicate {
    left_field: usize,
    op: Op,
    right_field: usize,
}

impl JoinPredicate {
    pub fn new(left_field: usize, op: Op, right_field: usize) -> JoinPredicate {
        JoinPredicate {
            left_field,
            op,
            right_field,
        }
    }

    pub fn filter(&self, left: &Tuple, right: &Tuple) -> Result<bool> {
        Ok(self.op.compare(
            left.get_field(self.left_field)?,
            right.get_field(self.right_field)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_comparisons() {
        let (three, five) = (Field::Integer(3), Field::Integer(5));
        assert!(Op::LessThan.compare(&three, &five));
        assert!(Op::LessThanOrEq.compare(&three, &three));
        assert!(Op::GreaterThan.compare(&five, &three));
        assert!(Op::GreaterThanOrEq.compare(&five, &five));
        assert!(Op::Equals.compare(&three, &three));
        assert!(Op::NotEquals.compare(&three, &five));
        assert!(!Op::Equals.compare(&three, &five));
    }

    #[test]
    fn test_like_is_containment() {
        assert!(Op::Like.compare(&Field::from("database"), &Field::from("base")));
        assert!(Op::Like.compare(&Field::from("database"), &Field::from("")));
        assert!(!Op::Like.compare(&Field::from("base"), &Field::from("database")));
        assert!(!Op::Like.compare(&Field::Integer(1), &Field::Integer(1)));
    }

    #[test]
    fn test_mismatched_types_do_not_order() {
        assert!(!Op::LessThan.compare(&Field::Integer(1), &Field::from("a")));
        assert!(!Op::GreaterThan.compare(&Field::from("a"), &Field::Integer(1)));
        assert!(Op::NotEquals.compare(&Field::Integer(1), &Field::from("1")));
    }

    #[test]
    fn test_predicate_filter() {
        let tuple = Tuple::new(vec![Field::Integer(7), Field::from("seven")]);
        assert!(Predicate::new(0, Op::GreaterThan, Field::Integer(5))
            .filter(&tuple)
            .unwrap());
        assert!(!Predicate::new(0, Op::LessThan, Field::Integer(5))
            .filter(&tuple)
            .unwrap());
        assert!(Predicate::new(1, Op::Like, Field::from("eve"))
            .filter(&tuple)
            .unwrap());
        // out-of-range field index is an input error
        assert!(Predicate::new(9, Op::Equals, Field::Integer(0))
            .filter(&tuple)
            .is_err());
    }

    #[test]
    fn test_join_predicate_filter() {
        let left = Tuple::new(vec![Field::Integer(1), Field::Integer(2)]);
        let right = Tuple::new(vec![Field::Integer(2)]);
        assert!(JoinPredicate::new(1, Op::Equals, 0).filter(&left, &right).unwrap());
        assert!(!JoinPredicate::new(0, Op::Equals, 0).filter(&left, &right).unwrap());
    }
}
