use anyhow::Result;

use super::{Executor, Predicate};
use crate::catalog::schema::Schema;
use crate::tuple::Tuple;

/// Passes through the child's tuples that satisfy the predicate.
pub struct FilterExecutor<'a> {
    child: Box<dyn Executor + 'a>,
    predicate: Predicate,
}

impl<'a> FilterExecutor<'a> {
    pub fn new(child: Box<dyn Executor + 'a>, predicate: Predicate) -> Self {
        Self { child, predicate }
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        while let Some(tuple) = self.child.next().transpose()? {
            if self.predicate.matches(&tuple) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }
}

impl<'a> Executor for FilterExecutor<'a> {
    fn schema(&self) -> &Schema {
        self.child.schema()
    }

    fn next(&mut self) -> Option<Result<Tuple>> {
        self.next().transpose()
    }

    fn rewind(&mut self) -> Result<()> {
        self.child.rewind()
    }
}
