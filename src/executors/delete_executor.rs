use anyhow::Result;
use lazy_static::lazy_static;

use super::Executor;
use crate::buffer::buffer_pool::BufferPool;
use crate::catalog::schema::{ColumnDefinition, Schema, TypeId};
use crate::concurrency::TransactionId;
use crate::tuple::value::Value;
use crate::tuple::Tuple;

lazy_static! {
    static ref DELETE_EXECUTOR_SCHEMA: Schema = Schema::new(vec![ColumnDefinition::new(
        TypeId::Integer,
        "deleted"
    )]);
}

/// Drains its child and deletes every yielded tuple from its table through
/// the buffer pool, then produces a single tuple holding the delete count.
/// The child must yield tuples that still carry their record ids, e.g. a
/// scan (optionally filtered) over the target table.
pub struct DeleteExecutor<'a> {
    pool: &'a BufferPool,
    tid: TransactionId,
    child: Box<dyn Executor + 'a>,
    done: bool,
}

impl<'a> DeleteExecutor<'a> {
    pub fn new(pool: &'a BufferPool, tid: TransactionId, child: Box<dyn Executor + 'a>) -> Self {
        Self {
            pool,
            tid,
            child,
            done: false,
        }
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        if self.done {
            Ok(None)
        } else {
            self.done = true;
            let mut tuples_deleted = 0;
            while let Some(tuple) = self.child.next().transpose()? {
                self.pool.delete_tuple(self.tid, &tuple)?;
                tuples_deleted += 1;
            }
            Ok(Some(Tuple::new(vec![Value::Integer(tuples_deleted)])))
        }
    }
}

impl<'a> Executor for DeleteExecutor<'a> {
    fn schema(&self) -> &Schema {
        &DELETE_EXECUTOR_SCHEMA
    }

    fn next(&mut self) -> Option<Result<Tuple>> {
        self.next().transpose()
    }

    fn rewind(&mut self) -> Result<()> {
        unreachable!()
    }
}
