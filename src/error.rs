use thiserror::Error;

use crate::common::{PageId, RecordId, TableId};
use crate::concurrency::TransactionId;

/// The failure kinds callers may need to branch on. Everything is propagated
/// as `anyhow::Error`; use `err.downcast_ref::<DbError>()` to inspect the
/// kind.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DbError {
    /// The current transaction must roll back. The caller owning the
    /// transaction is responsible for `transaction_complete(tid, abort)`.
    #[error("transaction {0} aborted")]
    TransactionAborted(TransactionId),

    /// Raised inside the lock manager when a transaction has retried a lock
    /// for too long; translated to `TransactionAborted` by the buffer pool.
    #[error("transaction {0} timed out waiting for a lock on page {1:?}")]
    Deadlock(TransactionId, PageId),

    /// Every resident page is dirty, so nothing can be evicted without
    /// writing uncommitted data.
    #[error("buffer pool is full and every resident page is dirty")]
    BufferFull,

    #[error("tuple does not match the schema of table {0}")]
    SchemaMismatch(TableId),

    #[error("no empty slot on page {0:?}")]
    PageFull(PageId),

    #[error("no tuple at {0:?}")]
    TupleNotFound(RecordId),

    #[error("page {0:?} is beyond the end of its file")]
    PageOutOfRange(PageId),

    #[error("{0}")]
    IllegalArgument(String),
}
