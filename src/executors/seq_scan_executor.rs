use anyhow::Result;

use super::Executor;
use crate::buffer::buffer_pool::BufferPool;
use crate::catalog::schema::Schema;
use crate::concurrency::TransactionId;
use crate::storage::heap_file::{HeapFile, HeapFileIterator};
use crate::tuple::Tuple;

/// Scans a heap file under a transaction, page by page in shared mode.
pub struct SeqScanExecutor<'a> {
    file: &'a HeapFile,
    table_iter: HeapFileIterator<'a>,
}

impl<'a> SeqScanExecutor<'a> {
    pub fn new(file: &'a HeapFile, tid: TransactionId, pool: &'a BufferPool) -> Self {
        Self {
            file,
            table_iter: file.iter(tid, pool),
        }
    }
}

impl<'a> Executor for SeqScanExecutor<'a> {
    fn schema(&self) -> &Schema {
        self.file.schema()
    }

    fn next(&mut self) -> Option<Result<Tuple>> {
        self.table_iter.next()
    }

    fn rewind(&mut self) -> Result<()> {
        self.table_iter.rewind();
        Ok(())
    }
}
