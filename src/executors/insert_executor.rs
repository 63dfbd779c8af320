use anyhow::Result;
use lazy_static::lazy_static;

use super::Executor;
use crate::buffer::buffer_pool::BufferPool;
use crate::catalog::schema::{ColumnDefinition, Schema, TypeId};
use crate::common::TableId;
use crate::concurrency::TransactionId;
use crate::tuple::value::Value;
use crate::tuple::Tuple;

lazy_static! {
    static ref INSERT_EXECUTOR_SCHEMA: Schema = Schema::new(vec![ColumnDefinition::new(
        TypeId::Integer,
        "inserted"
    )]);
}

/// Drains its child and inserts every tuple into the target table through
/// the buffer pool, then produces a single tuple holding the insert count.
pub struct InsertExecutor<'a> {
    pool: &'a BufferPool,
    table_id: TableId,
    tid: TransactionId,
    child: Box<dyn Executor + 'a>,
    done: bool,
}

impl<'a> InsertExecutor<'a> {
    pub fn new(
        pool: &'a BufferPool,
        table_id: TableId,
        tid: TransactionId,
        child: Box<dyn Executor + 'a>,
    ) -> Self {
        Self {
            pool,
            table_id,
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
            let mut tuples_inserted = 0;
            while let Some(mut tuple) = self.child.next().transpose()? {
                self.pool.insert_tuple(self.tid, self.table_id, &mut tuple)?;
                tuples_inserted += 1;
            }
            Ok(Some(Tuple::new(vec![Value::Integer(tuples_inserted)])))
        }
    }
}

impl<'a> Executor for InsertExecutor<'a> {
    fn schema(&self) -> &Schema {
        &INSERT_EXECUTOR_SCHEMA
    }

    fn next(&mut self) -> Option<Result<Tuple>> {
        self.next().transpose()
    }

    fn rewind(&mut self) -> Result<()> {
        unreachable!()
    }
}
