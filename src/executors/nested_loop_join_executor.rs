use anyhow::Result;

use super::{Executor, JoinPredicate};
use crate::catalog::schema::Schema;
use crate::tuple::Tuple;

/// Joins two children with a nested loop: for every tuple of the left child
/// the right child is rewound and scanned in full. Output tuples are the
/// concatenation of the matching pair, so the schema is the concatenation of
/// the children's schemas.
pub struct NestedLoopJoinExecutor<'a> {
    left_child: Box<dyn Executor + 'a>,
    right_child: Box<dyn Executor + 'a>,
    predicate: JoinPredicate,
    left_tuple: Option<Tuple>,
    schema: Schema,
}

impl<'a> NestedLoopJoinExecutor<'a> {
    pub fn new(
        left_child: Box<dyn Executor + 'a>,
        right_child: Box<dyn Executor + 'a>,
        predicate: JoinPredicate,
    ) -> Self {
        let schema = left_child.schema().merge(right_child.schema());
        Self {
            left_child,
            right_child,
            predicate,
            left_tuple: None,
            schema,
        }
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        if self.left_tuple.is_none() {
            self.left_tuple = self.left_child.next().transpose()?;
            self.right_child.rewind()?;
        }
        while let Some(ref left_tuple) = self.left_tuple {
            while let Some(right_tuple) = self.right_child.next().transpose()? {
                if self.predicate.matches(left_tuple, &right_tuple) {
                    let mut values = left_tuple.values.clone();
                    values.extend(right_tuple.values);
                    return Ok(Some(Tuple::new(values)));
                }
            }

            self.left_tuple = self.left_child.next().transpose()?;
            self.right_child.rewind()?;
        }
        Ok(None)
    }
}

impl<'a> Executor for NestedLoopJoinExecutor<'a> {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn next(&mut self) -> Option<Result<Tuple>> {
        self.next().transpose()
    }

    fn rewind(&mut self) -> Result<()> {
        self.left_tuple = None;
        self.left_child.rewind()?;
        self.right_child.rewind()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::NestedLoopJoinExecutor;
    use crate::catalog::schema::{ColumnDefinition, Schema, TypeId};
    use crate::executors::{Executor, JoinPredicate};
    use crate::test_helpers::StubExecutor;
    use crate::tuple::value::{CompareOp, Value};
    use crate::tuple::Tuple;

    fn numbers() -> StubExecutor {
        let schema = Schema::new(vec![
            ColumnDefinition::new(TypeId::Integer, "id"),
            ColumnDefinition::new(TypeId::Integer, "number"),
        ]);
        let tuples = [(1, 1), (2, 2), (3, 3), (4, 4)]
            .iter()
            .map(|(id, number)| Tuple::new(vec![Value::Integer(*id), Value::Integer(*number)]))
            .collect();
        StubExecutor::new(schema, tuples)
    }

    fn strings() -> StubExecutor {
        let schema = Schema::new(vec![
            ColumnDefinition::new(TypeId::Integer, "id"),
            ColumnDefinition::new(TypeId::Text, "string"),
        ]);
        let tuples = [(1, "foo"), (2, "bar"), (3, "baz")]
            .iter()
            .map(|(id, string)| Tuple::new(vec![Value::Integer(*id), Value::text(*string)]))
            .collect();
        StubExecutor::new(schema, tuples)
    }

    fn drain(join: &mut NestedLoopJoinExecutor) -> Result<Vec<Tuple>> {
        let mut result = Vec::new();
        while let Some(tuple) = Executor::next(join).transpose()? {
            result.push(tuple);
        }
        Ok(result)
    }

    #[test]
    fn equi_join_matches_by_id() -> Result<()> {
        let predicate = JoinPredicate::new(0, CompareOp::Equals, 0);
        let mut join =
            NestedLoopJoinExecutor::new(Box::new(numbers()), Box::new(strings()), predicate);

        assert_eq!(join.schema().column_count(), 4);

        let mut result = drain(&mut join)?;
        result.sort_by_key(|tuple| tuple.as_i32(0));

        let expected = vec![
            Tuple::new(vec![
                Value::Integer(1),
                Value::Integer(1),
                Value::Integer(1),
                Value::text("foo"),
            ]),
            Tuple::new(vec![
                Value::Integer(2),
                Value::Integer(2),
                Value::Integer(2),
                Value::text("bar"),
            ]),
            Tuple::new(vec![
                Value::Integer(3),
                Value::Integer(3),
                Value::Integer(3),
                Value::text("baz"),
            ]),
        ];
        assert_eq!(result, expected);
        Ok(())
    }

    #[test]
    fn inequality_join_produces_the_cross_pairs() -> Result<()> {
        let predicate = JoinPredicate::new(0, CompareOp::GreaterThan, 0);
        let mut join =
            NestedLoopJoinExecutor::new(Box::new(numbers()), Box::new(strings()), predicate);

        let result = drain(&mut join)?;
        // pairs with numbers.id > strings.id: (2,1) (3,1) (3,2) (4,1) (4,2) (4,3)
        assert_eq!(result.len(), 6);
        for tuple in &result {
            assert!(tuple.as_i32(0) > tuple.as_i32(2));
        }
        Ok(())
    }

    #[test]
    fn rewind_replays_the_whole_join() -> Result<()> {
        let predicate = JoinPredicate::new(0, CompareOp::Equals, 0);
        let mut join =
            NestedLoopJoinExecutor::new(Box::new(numbers()), Box::new(strings()), predicate);

        let first = drain(&mut join)?;
        join.rewind()?;
        let second = drain(&mut join)?;
        assert_eq!(first, second);
        Ok(())
    }
}
