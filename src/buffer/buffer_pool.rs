use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use anyhow::Result;
use rand::Rng;

use crate::catalog::Catalog;
use crate::common::{PageId, TableId};
use crate::concurrency::lock_manager::{LockManager, LockMode};
use crate::concurrency::TransactionId;
use crate::error::DbError;
use crate::storage::PageRef;
use crate::tuple::Tuple;

/// A bounded cache of heap pages and the sole entry point for page access by
/// transactions. Fetching a page first acquires the page lock, so isolation
/// falls out of every access going through here; commit and abort are
/// orchestrated against the cached copies (FORCE at commit, dirty pages are
/// never evicted or stolen before that).
pub struct BufferPool {
    capacity: usize,
    catalog: Arc<Catalog>,
    lock_manager: LockManager,
    pages: Mutex<HashMap<PageId, PageRef>>,
}

impl BufferPool {
    pub fn new(catalog: Arc<Catalog>, capacity: usize) -> Self {
        Self {
            capacity,
            catalog,
            lock_manager: LockManager::new(),
            pages: Mutex::new(HashMap::new()),
        }
    }

    /// Fetches the page with the given access mode on behalf of `tid`,
    /// reading it from disk if it is not resident. Blocks while another
    /// transaction holds a conflicting lock; if the wait ends in a presumed
    /// deadlock the call fails with `TransactionAborted` and the caller must
    /// finish the transaction with `transaction_complete(tid, false)`.
    pub fn get_page(&self, tid: TransactionId, pid: PageId, mode: LockMode) -> Result<PageRef> {
        if let Err(err) = self.lock_manager.acquire(tid, pid, mode) {
            return Err(err.context(DbError::TransactionAborted(tid)));
        }

        {
            let pages = self.pages.lock().unwrap();
            if let Some(page) = pages.get(&pid) {
                return Ok(Arc::clone(page));
            }
        }

        // Not resident: read outside the map mutex, then re-check before
        // installing, since a concurrent reader may have loaded it first.
        let loaded = Arc::new(RwLock::new(self.catalog.file(pid.0)?.read_page(pid)?));

        let mut pages = self.pages.lock().unwrap();
        if let Some(page) = pages.get(&pid) {
            return Ok(Arc::clone(page));
        }
        if pages.len() >= self.capacity {
            self.evict(&mut pages)?;
        }
        pages.insert(pid, Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Drops `tid`'s lock on `pid` before the transaction ends. This breaks
    /// strict 2PL and is therefore not public: the only legitimate caller is
    /// the heap file free-slot probe, which reads nothing it keeps.
    pub(crate) fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release(tid, pid);
    }

    /// True if `tid` holds a lock of any mode on `pid`.
    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds_lock(tid, pid)
    }

    /// Inserts the tuple into the table's heap file, marking every touched
    /// page dirty and making sure it is resident.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        tuple: &mut Tuple,
    ) -> Result<()> {
        let file = self.catalog.file(table_id)?;
        let dirty_pages = file.insert_tuple(tid, tuple, self)?;

        let mut pages = self.pages.lock().unwrap();
        for page in dirty_pages {
            let pid = {
                let mut guard = page.write().unwrap();
                guard.mark_dirty(Some(tid));
                guard.pid()
            };
            if !pages.contains_key(&pid) {
                if pages.len() >= self.capacity {
                    self.evict(&mut pages)?;
                }
                pages.insert(pid, page);
            }
        }
        Ok(())
    }

    /// Deletes the tuple (located through its record id) from its heap file
    /// and marks the touched page dirty.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let record_id = tuple.record_id().ok_or_else(|| {
            DbError::IllegalArgument("cannot delete a tuple that has no record id".to_owned())
        })?;
        let file = self.catalog.file(record_id.0 .0)?;
        let dirty_pages = file.delete_tuple(tid, tuple, self)?;
        for page in dirty_pages {
            page.write().unwrap().mark_dirty(Some(tid));
        }
        Ok(())
    }

    /// Ends the transaction. On commit every page it dirtied is written
    /// through to its file before any lock is released; on abort those pages
    /// are dropped from the pool so later reads see the on-disk state. A
    /// failed flush degrades into an abort and reports the flush error.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        let result = if commit { self.flush_pages(tid) } else { Ok(()) };
        if !commit || result.is_err() {
            self.discard_pages(tid);
        }
        self.lock_manager.release_all(tid);
        result
    }

    /// Writes every dirty page back to disk, regardless of which transaction
    /// dirtied it. Administrative escape hatch: the normal commit path only
    /// flushes the committing transaction's own pages.
    pub fn flush_all_pages(&self) -> Result<()> {
        let resident: Vec<PageRef> = {
            let pages = self.pages.lock().unwrap();
            pages.values().cloned().collect()
        };
        for page in resident {
            let mut guard = page.write().unwrap();
            if guard.is_dirty().is_some() {
                self.catalog.file(guard.pid().0)?.write_page(&guard)?;
                guard.mark_dirty(None);
            }
        }
        Ok(())
    }

    fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        let dirtied: Vec<PageRef> = {
            let pages = self.pages.lock().unwrap();
            pages
                .values()
                .filter(|page| page.read().unwrap().is_dirty() == Some(tid))
                .cloned()
                .collect()
        };
        for page in dirtied {
            let mut guard = page.write().unwrap();
            self.catalog.file(guard.pid().0)?.write_page(&guard)?;
            guard.mark_dirty(None);
        }
        Ok(())
    }

    fn discard_pages(&self, tid: TransactionId) {
        let mut pages = self.pages.lock().unwrap();
        pages.retain(|_, page| page.read().unwrap().is_dirty() != Some(tid));
    }

    /// Removes one clean page from the pool. Starts from a random victim; if
    /// that one is dirty, falls back to any clean page. Dirty pages are never
    /// written here, so if everything is dirty the eviction fails.
    fn evict(&self, pages: &mut HashMap<PageId, PageRef>) -> Result<()> {
        let victim = *pages
            .keys()
            .nth(rand::thread_rng().gen_range(0..pages.len()))
            .unwrap();

        let victim = if pages[&victim].read().unwrap().is_dirty().is_some() {
            let clean = pages
                .iter()
                .find(|(_, page)| page.read().unwrap().is_dirty().is_none())
                .map(|(pid, _)| *pid);
            match clean {
                Some(pid) => pid,
                None => return Err(DbError::BufferFull.into()),
            }
        } else {
            victim
        };

        // a clean page matches its on-disk image, dropping it loses nothing
        pages.remove(&victim);
        Ok(())
    }

    #[cfg(test)]
    fn resident_page_count(&self) -> usize {
        self.pages.lock().unwrap().len()
    }
}
