pub type TableId = i32;
pub type PageNo = u32;
pub type PageId = (TableId, PageNo);
pub type SlotId = u16;
pub type RecordId = (PageId, SlotId);

/// Bytes per page, including the slot occupancy header.
pub const PAGE_SIZE: usize = 4096;

/// Fixed on-disk payload width of a text field, excluding the length prefix.
pub const TEXT_LEN: usize = 128;

/// Default capacity of the buffer pool, in pages.
pub const DEFAULT_POOL_SIZE: usize = 50;

/// How long a transaction sleeps between lock acquisition attempts.
pub const LOCK_WAIT_MS: u64 = 10;

/// Consecutive futile lock attempts after which a transaction is presumed
/// deadlocked and aborted.
pub const MAX_LOCK_RETRIES: u32 = 100;

/// Number of buckets in per-column histograms.
pub const NUM_HIST_BINS: usize = 100;
