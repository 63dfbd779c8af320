use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;

use crate::buffer::buffer_pool::BufferPool;

pub mod lock_manager;

static NEXT_TID: AtomicU64 = AtomicU64::new(0);

/// Identifies a transaction. Ids are allocated from a process-wide counter
/// and never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn new() -> Self {
        Self(NEXT_TID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// A transaction handle tying an id to the buffer pool it runs against.
/// Committing or aborting consumes the handle; dropping an unfinished
/// transaction aborts it.
pub struct Transaction<'a> {
    tid: TransactionId,
    pool: &'a BufferPool,
    ended: bool,
}

impl<'a> Transaction<'a> {
    pub fn start(pool: &'a BufferPool) -> Self {
        Self {
            tid: TransactionId::new(),
            pool,
            ended: false,
        }
    }

    pub fn tid(&self) -> TransactionId {
        self.tid
    }

    pub fn commit(mut self) -> Result<()> {
        self.complete(true)
    }

    pub fn abort(mut self) -> Result<()> {
        self.complete(false)
    }

    fn complete(&mut self, commit: bool) -> Result<()> {
        self.ended = true;
        self.pool.transaction_complete(self.tid, commit)
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.ended {
            let _ = self.pool.transaction_complete(self.tid, false);
        }
    }
}
