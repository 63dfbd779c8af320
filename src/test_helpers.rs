use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use crate::buffer::buffer_pool::BufferPool;
use crate::catalog::schema::Schema;
use crate::catalog::Catalog;
use crate::common::{TableId, DEFAULT_POOL_SIZE};
use crate::concurrency::TransactionId;
use crate::executors::Executor;
use crate::storage::heap_file::HeapFile;
use crate::tuple::Tuple;

/// A catalog and buffer pool over a temporary data directory, wired the way
/// an embedding application would do it.
pub struct TestDb {
    pub catalog: Arc<Catalog>,
    pub pool: Arc<BufferPool>,
    data_dir: TempDir,
}

impl TestDb {
    pub fn new() -> Self {
        Self::with_pool_size(DEFAULT_POOL_SIZE)
    }

    pub fn with_pool_size(pool_size: usize) -> Self {
        let data_dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(Catalog::new());
        let pool = Arc::new(BufferPool::new(Arc::clone(&catalog), pool_size));
        Self {
            catalog,
            pool,
            data_dir,
        }
    }

    pub fn data_path(&self) -> &Path {
        self.data_dir.path()
    }

    /// Creates an empty heap file in the data directory and registers it.
    pub fn create_table(&self, name: &str, schema: Schema) -> Result<TableId> {
        let file = Arc::new(HeapFile::open(self.data_dir.path().join(name), schema)?);
        Ok(self.catalog.add_table(name, file, ""))
    }

    pub fn file(&self, table_id: TableId) -> Arc<HeapFile> {
        self.catalog.file(table_id).unwrap()
    }

    pub fn begin(&self) -> TransactionId {
        TransactionId::new()
    }
}

/// An executor that yields a fixed list of tuples; the leaf used by operator
/// tests that don't want to stage a table first.
pub struct StubExecutor {
    schema: Schema,
    tuples: Vec<Tuple>,
    pos: usize,
}

impl StubExecutor {
    pub fn new(schema: Schema, tuples: Vec<Tuple>) -> Self {
        Self {
            schema,
            tuples,
            pos: 0,
        }
    }
}

impl Executor for StubExecutor {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn next(&mut self) -> Option<Result<Tuple>> {
        let tuple = self.tuples.get(self.pos)?.clone();
        self.pos += 1;
        Some(Ok(tuple))
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }
}
