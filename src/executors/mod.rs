use anyhow::Result;

use crate::catalog::schema::Schema;
use crate::tuple::value::{CompareOp, Value};
use crate::tuple::Tuple;

pub mod aggregate_executor;
pub mod delete_executor;
pub mod filter_executor;
pub mod insert_executor;
pub mod nested_loop_join_executor;
pub mod seq_scan_executor;

/// The pull-based operator contract. Exhausted operators return `None`;
/// failures, including a `TransactionAborted` bubbling up from the buffer
/// pool, travel through the `Result` and must be passed on unchanged.
pub trait Executor {
    fn schema(&self) -> &Schema;
    fn next(&mut self) -> Option<Result<Tuple>>;
    fn rewind(&mut self) -> Result<()>;
}

/// Compares one field of a tuple against a constant.
pub struct Predicate {
    field_index: usize,
    op: CompareOp,
    operand: Value,
}

impl Predicate {
    pub fn new(field_index: usize, op: CompareOp, operand: Value) -> Self {
        Self {
            field_index,
            op,
            operand,
        }
    }

    pub fn matches(&self, tuple: &Tuple) -> bool {
        tuple.value(self.field_index).compare(self.op, &self.operand)
    }
}

/// Compares a field of one tuple against a field of another; used by the
/// join operator.
pub struct JoinPredicate {
    left_field: usize,
    op: CompareOp,
    right_field: usize,
}

impl JoinPredicate {
    pub fn new(left_field: usize, op: CompareOp, right_field: usize) -> Self {
        Self {
            left_field,
            op,
            right_field,
        }
    }

    pub fn matches(&self, left: &Tuple, right: &Tuple) -> bool {
        left.value(self.left_field)
            .compare(self.op, right.value(self.right_field))
    }
}

#[cfg(test)]
mod tests {
    use super::{JoinPredicate, Predicate};
    use crate::tuple::value::{CompareOp, Value};
    use crate::tuple::Tuple;

    #[test]
    fn predicate_compares_field_against_constant() {
        let predicate = Predicate::new(1, CompareOp::GreaterThan, Value::Integer(10));

        let matching = Tuple::new(vec![Value::Integer(1), Value::Integer(11)]);
        let failing = Tuple::new(vec![Value::Integer(1), Value::Integer(10)]);
        assert!(predicate.matches(&matching));
        assert!(!predicate.matches(&failing));
    }

    #[test]
    fn join_predicate_compares_fields_of_two_tuples() {
        let predicate = JoinPredicate::new(0, CompareOp::Equals, 1);

        let left = Tuple::new(vec![Value::Integer(5)]);
        let right = Tuple::new(vec![Value::text("x"), Value::Integer(5)]);
        assert!(predicate.matches(&left, &right));

        let right = Tuple::new(vec![Value::text("x"), Value::Integer(6)]);
        assert!(!predicate.matches(&left, &right));
    }
}
