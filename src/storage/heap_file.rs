use std::collections::hash_map::DefaultHasher;
use std::fs::OpenOptions;
use std::hash::{Hash, Hasher};
use std::os::unix::prelude::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Error, Result};

use crate::buffer::buffer_pool::BufferPool;
use crate::catalog::schema::Schema;
use crate::common::{PageId, PageNo, TableId, PAGE_SIZE};
use crate::concurrency::lock_manager::LockMode;
use crate::concurrency::TransactionId;
use crate::error::DbError;
use crate::storage::heap_page::HeapPage;
use crate::storage::PageRef;
use crate::tuple::Tuple;

/// A table stored on disk as an unordered array of heap pages. All page
/// traffic on behalf of a transaction goes through the buffer pool, which is
/// why the mutating operations take it as an argument; the file itself only
/// performs raw page I/O.
pub struct HeapFile {
    file: std::fs::File,
    id: TableId,
    schema: Schema,
    /// Serializes file growth so two transactions cannot allocate the same
    /// page number.
    extend_lock: Mutex<()>,
}

fn table_id_for_path(path: &Path) -> TableId {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish() as TableId
}

impl HeapFile {
    /// Opens (or creates) the heap file at `path`.
    pub fn open(path: impl Into<PathBuf>, schema: Schema) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .with_context(|| format!("Could not open heap file {}", path.display()))?;

        let size = file
            .metadata()
            .with_context(|| format!("Could not read size of heap file {}", path.display()))?
            .len();
        if size % PAGE_SIZE as u64 != 0 {
            return Err(Error::msg(format!(
                "Heap file {} has size {} which is not divisible by the page size {}",
                path.display(),
                size,
                PAGE_SIZE
            )));
        }

        let absolute = path
            .canonicalize()
            .with_context(|| format!("Could not resolve path {}", path.display()))?;

        Ok(Self {
            file,
            id: table_id_for_path(&absolute),
            schema,
            extend_lock: Mutex::new(()),
        })
    }

    /// The table id, derived from the file path. Every page of this file
    /// carries it as the first half of its `PageId`.
    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn num_pages(&self) -> Result<PageNo> {
        let size = self
            .file
            .metadata()
            .with_context(|| format!("Could not read size of heap file for table {}", self.id))?
            .len();
        Ok((size / PAGE_SIZE as u64) as PageNo)
    }

    /// Reads one page from disk, bypassing the buffer pool.
    pub fn read_page(&self, pid: PageId) -> Result<HeapPage> {
        if pid.0 != self.id || pid.1 >= self.num_pages()? {
            return Err(DbError::PageOutOfRange(pid).into());
        }
        let mut buffer = vec![0u8; PAGE_SIZE];
        let offset = pid.1 as u64 * PAGE_SIZE as u64;
        self.file
            .read_exact_at(&mut buffer, offset)
            .with_context(|| format!("Could not read page {} of table {}", pid.1, self.id))?;
        Ok(HeapPage::parse(pid, self.schema.clone(), &buffer))
    }

    /// Writes one page image to disk and syncs it, so the data is durable
    /// once this returns.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let pid = page.pid();
        let offset = pid.1 as u64 * PAGE_SIZE as u64;
        self.file
            .write_all_at(&page.serialize(), offset)
            .with_context(|| format!("Failed to write page {} of table {}", pid.1, self.id))?;
        self.file
            .sync_all()
            .with_context(|| format!("Failed to sync page {} of table {}", pid.1, self.id))?;
        Ok(())
    }

    /// Finds a page with a free slot, or grows the file by one page, and
    /// inserts the tuple there. Returns the pages that were modified.
    ///
    /// Probed pages are taken in exclusive mode but released again when full:
    /// the probe reads nothing except the free-slot count, and that hint is
    /// re-verified by whoever locks the page next.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        tuple: &mut Tuple,
        pool: &BufferPool,
    ) -> Result<Vec<PageRef>> {
        loop {
            for page_no in 0..self.num_pages()? {
                let pid = (self.id, page_no);
                let page = pool.get_page(tid, pid, LockMode::Exclusive)?;
                let has_space = page.read().unwrap().empty_slot_count() > 0;
                if has_space {
                    page.write().unwrap().insert(tuple)?;
                    return Ok(vec![page]);
                }
                pool.release_page(tid, pid);
            }

            // Every existing page is full. Extend the file with an empty
            // page image; the tuple itself lands only in the pooled copy, so
            // an abort leaves nothing but an empty page behind.
            let pid = {
                let _guard = self.extend_lock.lock().unwrap();
                let page_no = self.num_pages()?;
                let empty = HeapPage::new_empty((self.id, page_no), self.schema.clone());
                self.write_page(&empty)?;
                (self.id, page_no)
            };

            let page = pool.get_page(tid, pid, LockMode::Exclusive)?;
            let mut guard = page.write().unwrap();
            if guard.empty_slot_count() > 0 {
                guard.insert(tuple)?;
                drop(guard);
                return Ok(vec![page]);
            }
            // another transaction filled the fresh page before we locked it
            drop(guard);
            pool.release_page(tid, pid);
        }
    }

    /// Deletes the tuple from the page named by its record id. Returns the
    /// modified page.
    pub fn delete_tuple(
        &self,
        tid: TransactionId,
        tuple: &Tuple,
        pool: &BufferPool,
    ) -> Result<Vec<PageRef>> {
        let record_id = tuple.record_id().ok_or_else(|| {
            DbError::IllegalArgument("cannot delete a tuple that has no record id".to_owned())
        })?;
        let (pid, _) = record_id;
        if pid.0 != self.id {
            return Err(DbError::TupleNotFound(record_id).into());
        }

        let page = pool.get_page(tid, pid, LockMode::Exclusive)?;
        page.write().unwrap().delete(tuple)?;
        Ok(vec![page])
    }

    /// A scan over every live tuple, page by page in shared mode.
    pub fn iter<'a>(&'a self, tid: TransactionId, pool: &'a BufferPool) -> HeapFileIterator<'a> {
        HeapFileIterator {
            file: self,
            pool,
            tid,
            next_page_no: 0,
            current_page: Vec::new().into_iter(),
        }
    }
}

/// Yields the tuples of a heap file in page order, slot order within a page.
/// Pages are fetched through the buffer pool one at a time; `rewind` starts
/// over from page zero and re-reads.
pub struct HeapFileIterator<'a> {
    file: &'a HeapFile,
    pool: &'a BufferPool,
    tid: TransactionId,
    next_page_no: PageNo,
    current_page: std::vec::IntoIter<Tuple>,
}

impl<'a> HeapFileIterator<'a> {
    fn fetch_next_tuple(&mut self) -> Result<Option<Tuple>> {
        loop {
            if let Some(tuple) = self.current_page.next() {
                return Ok(Some(tuple));
            }
            if self.next_page_no >= self.file.num_pages()? {
                return Ok(None);
            }
            let pid = (self.file.id(), self.next_page_no);
            let page = self.pool.get_page(self.tid, pid, LockMode::Shared)?;
            self.next_page_no += 1;
            let tuples: Vec<Tuple> = page.read().unwrap().iter_tuples().cloned().collect();
            self.current_page = tuples.into_iter();
        }
    }

    pub fn rewind(&mut self) {
        self.next_page_no = 0;
        self.current_page = Vec::new().into_iter();
    }
}

impl<'a> Iterator for HeapFileIterator<'a> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        self.fetch_next_tuple().transpose()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use crate::catalog::schema::{ColumnDefinition, Schema, TypeId};
    use crate::error::DbError;
    use crate::storage::heap_page::slots_per_page;
    use crate::test_helpers::TestDb;
    use crate::tuple::value::Value;
    use crate::tuple::Tuple;

    fn two_int_schema() -> Schema {
        Schema::new(vec![
            ColumnDefinition::new(TypeId::Integer, "a"),
            ColumnDefinition::new(TypeId::Integer, "b"),
        ])
    }

    #[test]
    fn insert_and_scan_across_pages() -> Result<()> {
        let db = TestDb::new();
        let table_id = db.create_table("numbers", two_int_schema())?;
        let file = db.file(table_id);

        // three pages worth of tuples
        let tuple_count = 2 * slots_per_page(8) + 5;
        let tid = db.begin();
        for i in 0..tuple_count {
            let mut tuple = Tuple::new(vec![Value::Integer(i as i32), Value::Integer(0)]);
            file.insert_tuple(tid, &mut tuple, &db.pool)?;
        }
        db.pool.transaction_complete(tid, true)?;
        assert_eq!(file.num_pages()?, 3);

        let tid = db.begin();
        let mut seen: Vec<i32> = file
            .iter(tid, &db.pool)
            .map(|tuple| tuple.map(|t| t.as_i32(0)))
            .collect::<Result<_>>()?;
        db.pool.transaction_complete(tid, true)?;

        seen.sort();
        let expected: Vec<i32> = (0..tuple_count as i32).collect();
        assert_eq!(seen, expected);
        Ok(())
    }

    #[test]
    fn deleted_tuples_disappear_from_scans() -> Result<()> {
        let db = TestDb::new();
        let table_id = db.create_table("numbers", two_int_schema())?;
        let file = db.file(table_id);

        let tid = db.begin();
        let mut keep = Tuple::new(vec![Value::Integer(1), Value::Integer(10)]);
        let mut doomed = Tuple::new(vec![Value::Integer(2), Value::Integer(20)]);
        file.insert_tuple(tid, &mut keep, &db.pool)?;
        file.insert_tuple(tid, &mut doomed, &db.pool)?;
        db.pool.transaction_complete(tid, true)?;

        let tid = db.begin();
        file.delete_tuple(tid, &doomed, &db.pool)?;
        db.pool.transaction_complete(tid, true)?;

        let tid = db.begin();
        let remaining: Vec<Tuple> = file
            .iter(tid, &db.pool)
            .collect::<Result<_>>()?;
        db.pool.transaction_complete(tid, true)?;

        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].as_i32(0), 1);
        Ok(())
    }

    #[test]
    fn rewind_rereads_from_the_first_page() -> Result<()> {
        let db = TestDb::new();
        let table_id = db.create_table("numbers", two_int_schema())?;
        let file = db.file(table_id);

        let tid = db.begin();
        for i in 0..10 {
            let mut tuple = Tuple::new(vec![Value::Integer(i), Value::Integer(i)]);
            file.insert_tuple(tid, &mut tuple, &db.pool)?;
        }
        db.pool.transaction_complete(tid, true)?;

        let tid = db.begin();
        let mut iter = file.iter(tid, &db.pool);
        let first_pass = iter.by_ref().collect::<Result<Vec<_>>>()?;
        iter.rewind();
        let second_pass = iter.collect::<Result<Vec<_>>>()?;
        db.pool.transaction_complete(tid, true)?;

        assert_eq!(first_pass, second_pass);
        Ok(())
    }

    #[test]
    fn read_page_past_the_end_fails() -> Result<()> {
        let db = TestDb::new();
        let table_id = db.create_table("numbers", two_int_schema())?;
        let file = db.file(table_id);

        let err = file.read_page((table_id, 17)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DbError>(),
            Some(&DbError::PageOutOfRange((table_id, 17)))
        );
        Ok(())
    }

    #[test]
    fn deleting_a_foreign_tuple_fails() -> Result<()> {
        let db = TestDb::new();
        let table_id = db.create_table("numbers", two_int_schema())?;
        let file = db.file(table_id);

        let mut foreign = Tuple::new(vec![Value::Integer(1), Value::Integer(1)]);
        foreign.set_record_id(Some(((table_id + 1, 0), 0)));

        let tid = db.begin();
        let result = file.delete_tuple(tid, &foreign, &db.pool);
        db.pool.transaction_complete(tid, false)?;
        assert!(result.is_err());
        Ok(())
    }
}
