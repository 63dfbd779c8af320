use std::collections::HashMap;

use anyhow::Result;

use super::Executor;
use crate::catalog::schema::{ColumnDefinition, Schema, TypeId};
use crate::error::DbError;
use crate::tuple::value::Value;
use crate::tuple::Tuple;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

/// Running state for one group. Integer statistics are tracked for every
/// integer input; a text input only bumps the count, which is the single
/// aggregate defined for text columns.
#[derive(Default)]
struct Accumulator {
    sum: i32,
    count: i32,
    min: i32,
    max: i32,
}

impl Accumulator {
    fn add(&mut self, value: &Value) {
        if let Value::Integer(v) = value {
            if self.count == 0 {
                self.min = *v;
                self.max = *v;
            } else {
                self.min = self.min.min(*v);
                self.max = self.max.max(*v);
            }
            self.sum += *v;
        }
        self.count += 1;
    }

    fn result(&self, op: AggregateOp) -> i32 {
        match op {
            AggregateOp::Min => self.min,
            AggregateOp::Max => self.max,
            AggregateOp::Sum => self.sum,
            // integer average truncates toward zero
            AggregateOp::Avg => self.sum / self.count,
            AggregateOp::Count => self.count,
        }
    }
}

/// Computes one aggregate over one column of the child, optionally grouped
/// by another column. The child is drained on the first call to `next`;
/// results are `(group, aggregate)` pairs, or a single `(aggregate)` tuple
/// without grouping.
pub struct AggregateExecutor<'a> {
    child: Box<dyn Executor + 'a>,
    agg_field: usize,
    group_by: Option<usize>,
    op: AggregateOp,
    schema: Schema,
    results: Option<Vec<Tuple>>,
    pos: usize,
}

impl<'a> std::fmt::Debug for AggregateExecutor<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateExecutor")
            .field("agg_field", &self.agg_field)
            .field("group_by", &self.group_by)
            .field("op", &self.op)
            .field("schema", &self.schema)
            .field("results", &self.results)
            .field("pos", &self.pos)
            .finish()
    }
}

impl<'a> AggregateExecutor<'a> {
    pub fn new(
        child: Box<dyn Executor + 'a>,
        agg_field: usize,
        group_by: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self> {
        let child_schema = child.schema();
        if agg_field >= child_schema.column_count() {
            return Err(DbError::IllegalArgument(format!(
                "aggregate column index {} is out of range",
                agg_field
            ))
            .into());
        }
        if let Some(group_by) = group_by {
            if group_by >= child_schema.column_count() {
                return Err(DbError::IllegalArgument(format!(
                    "group-by column index {} is out of range",
                    group_by
                ))
                .into());
            }
        }

        let agg_column = child_schema.column(agg_field);
        if agg_column.type_id() == TypeId::Text && op != AggregateOp::Count {
            return Err(DbError::IllegalArgument(format!(
                "aggregate {:?} is not defined for text columns",
                op
            ))
            .into());
        }

        let agg_result = ColumnDefinition::new(TypeId::Integer, agg_column.column_name());
        let schema = match group_by {
            Some(group_by) => Schema::new(vec![child_schema.column(group_by).clone(), agg_result]),
            None => Schema::new(vec![agg_result]),
        };

        Ok(Self {
            child,
            agg_field,
            group_by,
            op,
            schema,
            results: None,
            pos: 0,
        })
    }

    fn aggregate_child(&mut self) -> Result<Vec<Tuple>> {
        let mut groups: HashMap<Option<Value>, Accumulator> = HashMap::new();
        while let Some(tuple) = self.child.next().transpose()? {
            let key = self.group_by.map(|idx| tuple.value(idx).clone());
            groups
                .entry(key)
                .or_default()
                .add(tuple.value(self.agg_field));
        }

        if self.group_by.is_none() && groups.is_empty() && self.op == AggregateOp::Count {
            // counting an empty input still has a defined answer
            return Ok(vec![Tuple::new(vec![Value::Integer(0)])]);
        }

        let results = groups
            .into_iter()
            .map(|(key, accumulator)| {
                let agg = Value::Integer(accumulator.result(self.op));
                match key {
                    Some(group) => Tuple::new(vec![group, agg]),
                    None => Tuple::new(vec![agg]),
                }
            })
            .collect();
        Ok(results)
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        if self.results.is_none() {
            self.results = Some(self.aggregate_child()?);
        }
        let results = self.results.as_ref().unwrap();
        let tuple = results.get(self.pos).cloned();
        if tuple.is_some() {
            self.pos += 1;
        }
        Ok(tuple)
    }
}

impl<'a> Executor for AggregateExecutor<'a> {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn next(&mut self) -> Option<Result<Tuple>> {
        self.next().transpose()
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{AggregateExecutor, AggregateOp};
    use crate::catalog::schema::{ColumnDefinition, Schema, TypeId};
    use crate::error::DbError;
    use crate::executors::Executor;
    use crate::test_helpers::StubExecutor;
    use crate::tuple::value::Value;
    use crate::tuple::Tuple;

    fn grouped_source() -> StubExecutor {
        let schema = Schema::new(vec![
            ColumnDefinition::new(TypeId::Integer, "grp"),
            ColumnDefinition::new(TypeId::Integer, "val"),
        ]);
        let tuples = [(1, 10), (1, 20), (2, 5), (2, 5), (2, 20)]
            .iter()
            .map(|(grp, val)| Tuple::new(vec![Value::Integer(*grp), Value::Integer(*val)]))
            .collect();
        StubExecutor::new(schema, tuples)
    }

    fn drain_pairs(executor: &mut AggregateExecutor) -> Result<Vec<(i32, i32)>> {
        let mut result = Vec::new();
        while let Some(tuple) = Executor::next(executor).transpose()? {
            result.push((tuple.as_i32(0), tuple.as_i32(1)));
        }
        result.sort();
        Ok(result)
    }

    #[test]
    fn grouped_average_truncates_per_group() -> Result<()> {
        let mut agg =
            AggregateExecutor::new(Box::new(grouped_source()), 1, Some(0), AggregateOp::Avg)?;
        assert_eq!(drain_pairs(&mut agg)?, vec![(1, 15), (2, 10)]);
        Ok(())
    }

    #[test]
    fn grouped_min_max_sum_count() -> Result<()> {
        let mut min =
            AggregateExecutor::new(Box::new(grouped_source()), 1, Some(0), AggregateOp::Min)?;
        assert_eq!(drain_pairs(&mut min)?, vec![(1, 10), (2, 5)]);

        let mut max =
            AggregateExecutor::new(Box::new(grouped_source()), 1, Some(0), AggregateOp::Max)?;
        assert_eq!(drain_pairs(&mut max)?, vec![(1, 20), (2, 20)]);

        let mut sum =
            AggregateExecutor::new(Box::new(grouped_source()), 1, Some(0), AggregateOp::Sum)?;
        assert_eq!(drain_pairs(&mut sum)?, vec![(1, 30), (2, 30)]);

        let mut count =
            AggregateExecutor::new(Box::new(grouped_source()), 1, Some(0), AggregateOp::Count)?;
        assert_eq!(drain_pairs(&mut count)?, vec![(1, 2), (2, 3)]);
        Ok(())
    }

    #[test]
    fn ungrouped_aggregate_yields_a_single_tuple() -> Result<()> {
        let mut agg = AggregateExecutor::new(Box::new(grouped_source()), 1, None, AggregateOp::Sum)?;
        let result = Executor::next(&mut agg).transpose()?.unwrap();
        assert_eq!(result.values().len(), 1);
        assert_eq!(result.as_i32(0), 60);
        assert!(Executor::next(&mut agg).is_none());
        Ok(())
    }

    #[test]
    fn rewind_replays_the_computed_results() -> Result<()> {
        let mut agg =
            AggregateExecutor::new(Box::new(grouped_source()), 1, Some(0), AggregateOp::Avg)?;
        let first = drain_pairs(&mut agg)?;
        agg.rewind()?;
        assert_eq!(drain_pairs(&mut agg)?, first);
        Ok(())
    }

    #[test]
    fn text_columns_only_support_count() -> Result<()> {
        let schema = Schema::new(vec![ColumnDefinition::new(TypeId::Text, "name")]);
        let tuples = ["foo", "bar", "baz"]
            .iter()
            .map(|name| Tuple::new(vec![Value::text(*name)]))
            .collect::<Vec<_>>();

        let source = StubExecutor::new(schema.clone(), tuples.clone());
        let mut count = AggregateExecutor::new(Box::new(source), 0, None, AggregateOp::Count)?;
        let result = Executor::next(&mut count).transpose()?.unwrap();
        assert_eq!(result.as_i32(0), 3);

        let source = StubExecutor::new(schema, tuples);
        let err = AggregateExecutor::new(Box::new(source), 0, None, AggregateOp::Max).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DbError>(),
            Some(DbError::IllegalArgument(_))
        ));
        Ok(())
    }

    #[test]
    fn counting_an_empty_input_yields_zero() -> Result<()> {
        let schema = Schema::new(vec![ColumnDefinition::new(TypeId::Integer, "val")]);
        let source = StubExecutor::new(schema, vec![]);
        let mut count = AggregateExecutor::new(Box::new(source), 0, None, AggregateOp::Count)?;
        let result = Executor::next(&mut count).transpose()?.unwrap();
        assert_eq!(result.as_i32(0), 0);
        Ok(())
    }
}
