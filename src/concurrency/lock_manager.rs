use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::common::{PageId, LOCK_WAIT_MS, MAX_LOCK_RETRIES};
use crate::concurrency::TransactionId;
use crate::error::DbError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Default)]
struct PageLockState {
    shared: HashSet<TransactionId>,
    exclusive: Option<TransactionId>,
}

impl PageLockState {
    /// Whether `tid` may take the lock in `mode` right now.
    ///
    /// Shared is compatible with everything except an exclusive hold by
    /// someone else. Exclusive requires that no other transaction holds
    /// anything; a transaction that is the sole shared holder may upgrade.
    fn can_grant(&self, tid: TransactionId, mode: LockMode) -> bool {
        match mode {
            LockMode::Shared => self.exclusive.map_or(true, |holder| holder == tid),
            LockMode::Exclusive => {
                let other_reader = self.shared.iter().any(|&holder| holder != tid);
                let other_writer = self.exclusive.is_some_and(|holder| holder != tid);
                !other_reader && !other_writer
            }
        }
    }

    fn remove(&mut self, tid: TransactionId) {
        self.shared.remove(&tid);
        if self.exclusive == Some(tid) {
            self.exclusive = None;
        }
    }

    fn is_free(&self) -> bool {
        self.shared.is_empty() && self.exclusive.is_none()
    }

    fn holds(&self, tid: TransactionId) -> bool {
        self.shared.contains(&tid) || self.exclusive == Some(tid)
    }
}

/// Page-level strict 2PL. Conflicting requests are not queued; the requester
/// polls in `LOCK_WAIT_MS` steps. A transaction whose consecutive futile
/// attempts exceed `MAX_LOCK_RETRIES` is presumed to sit in a deadlock cycle
/// and gets a `Deadlock` error, which its owner must treat as an abort.
pub struct LockManager {
    lock_table: DashMap<PageId, PageLockState>,
    wait_counts: DashMap<TransactionId, u32>,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            lock_table: DashMap::new(),
            wait_counts: DashMap::new(),
        }
    }

    /// Blocks until the lock is granted or the retry budget runs out.
    pub fn acquire(&self, tid: TransactionId, pid: PageId, mode: LockMode) -> Result<()> {
        loop {
            if self.try_acquire(tid, pid, mode) {
                self.wait_counts.remove(&tid);
                return Ok(());
            }

            let futile_attempts = {
                let mut count = self.wait_counts.entry(tid).or_insert(0);
                *count += 1;
                *count
            };
            if futile_attempts > MAX_LOCK_RETRIES {
                self.wait_counts.remove(&tid);
                return Err(DbError::Deadlock(tid, pid).into());
            }

            thread::sleep(Duration::from_millis(LOCK_WAIT_MS));
        }
    }

    fn try_acquire(&self, tid: TransactionId, pid: PageId, mode: LockMode) -> bool {
        let mut state = self.lock_table.entry(pid).or_default();
        if !state.can_grant(tid, mode) {
            return false;
        }
        match mode {
            LockMode::Shared => {
                state.shared.insert(tid);
            }
            LockMode::Exclusive => {
                state.exclusive = Some(tid);
            }
        }
        true
    }

    /// Drops whatever `tid` holds on `pid`. Blocked requesters notice on
    /// their next poll.
    pub fn release(&self, tid: TransactionId, pid: PageId) {
        if let Entry::Occupied(mut entry) = self.lock_table.entry(pid) {
            let state = entry.get_mut();
            state.remove(tid);
            if state.is_free() {
                entry.remove();
            }
        }
    }

    /// Drops every lock held by `tid`.
    pub fn release_all(&self, tid: TransactionId) {
        self.lock_table.retain(|_, state| {
            state.remove(tid);
            !state.is_free()
        });
        self.wait_counts.remove(&tid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_table
            .get(&pid)
            .map_or(false, |state| state.holds(tid))
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
