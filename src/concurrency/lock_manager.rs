use crate::common::Result;
use crate::concurrency::TransactionId;
use crate::config::config::{LOCK_TIMEOUT_BASE_MS, LOCK_TIMEOUT_JITTER_MS};
use crate::errinput;
use crate::storage::page::PageId;
use log::{debug, error, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// The access a caller requests on a page. Read-only access maps to a
/// shared lock, read-write access to an exclusive lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

/// The lock holders of one page. At most one exclusive holder, and an
/// exclusive holder excludes all shared holders (and vice versa).
#[derive(Debug, Default)]
struct LockState {
    shared: HashSet<TransactionId>,
    exclusive: Option<TransactionId>,
}

impl LockState {
    fn is_free(&self) -> bool {
        self.shared.is_empty() && self.exclusive.is_none()
    }

    fn holds(&self, tid: TransactionId) -> bool {
        self.exclusive == Some(tid) || self.shared.contains(&tid)
    }
}

/// One page's lock slot: its holder state plus the condition variable
/// waiters park on until a release makes the page grantable again.
#[derive(Debug, Default)]
struct PageLock {
    state: Mutex<LockState>,
    released: Condvar,
}

/// Strict two-phase page-level lock manager.
///
/// Shared/exclusive locks with upgrade when the requester is the sole
/// shared holder. Conflicting requests wait on the page's condition
/// variable with a bounded, per-transaction-jittered timeout; a waiter
/// that times out reports failure and the buffer pool turns that into a
/// transaction abort. No waits-for graph is maintained, so the timeout is
/// also the deadlock breaker.
pub struct LockManager {
    locks: Mutex<HashMap<PageId, Arc<PageLock>>>,
    held: Mutex<HashMap<TransactionId, HashSet<PageId>>>,
    base_timeout: Duration,
}

impl LockManager {
    pub fn new() -> LockManager {
        LockManager::with_timeout(Duration::from_millis(LOCK_TIMEOUT_BASE_MS))
    }

    pub fn with_timeout(base_timeout: Duration) -> LockManager {
        LockManager {
            locks: Mutex::new(HashMap::new()),
            held: Mutex::new(HashMap::new()),
            base_timeout,
        }
    }

    /// Acquires the lock implied by `perm`, returning false on timeout.
    pub fn acquire(&self, tid: TransactionId, pid: PageId, perm: Permission) -> bool {
        match perm {
            Permission::ReadOnly => self.acquire_shared(tid, pid),
            Permission::ReadWrite => self.acquire_exclusive(tid, pid),
        }
    }

    /// Acquires a shared lock on the page. Re-entrant: a transaction that
    /// already holds any lock on the page succeeds immediately.
    pub fn acquire_shared(&self, tid: TransactionId, pid: PageId) -> bool {
        let lock = self.page_lock(pid);
        let deadline = Instant::now() + self.timeout_for(tid);
        let mut state = lock.state.lock().unwrap();

        loop {
            match state.exclusive {
                None => {
                    state.shared.insert(tid);
                    drop(state);
                    self.record_held(tid, pid);
                    return true;
                }
                Some(holder) if holder == tid => return true,
                Some(_) => {
                    let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                        debug!("{tid} timed out waiting for shared lock on {pid}");
                        return false;
                    };
                    let (guard, _) = lock.released.wait_timeout(state, remaining).unwrap();
                    state = guard;
                }
            }
        }
    }

    /// Acquires an exclusive lock on the page, upgrading a shared lock
    /// when the transaction is its sole holder.
    pub fn acquire_exclusive(&self, tid: TransactionId, pid: PageId) -> bool {
        let lock = self.page_lock(pid);
        let deadline = Instant::now() + self.timeout_for(tid);
        let mut state = lock.state.lock().unwrap();

        loop {
            let sole_shared_holder =
                state.shared.is_empty() || (state.shared.len() == 1 && state.shared.contains(&tid));
            match state.exclusive {
                Some(holder) if holder == tid => return true,
                None if sole_shared_holder => {
                    state.shared.remove(&tid);
                    state.exclusive = Some(tid);
                    drop(state);
                    self.record_held(tid, pid);
                    return true;
                }
                _ => {
                    let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                        debug!("{tid} timed out waiting for exclusive lock on {pid}");
                        return false;
                    };
                    let (guard, _) = lock.released.wait_timeout(state, remaining).unwrap();
                    state = guard;
                }
            }
        }
    }

    /// Releases the transaction's lock on the page, waking any waiters.
    /// Errs if the transaction does not hold a lock on the page.
    pub fn release(&self, tid: TransactionId, pid: PageId) -> Result<()> {
        let lock = self.page_lock(pid);
        {
            let mut state = lock.state.lock().unwrap();
            if state.exclusive == Some(tid) {
                state.exclusive = None;
            } else if !state.shared.remove(&tid) {
                return errinput!("{tid} does not hold a lock on {pid}");
            }
            if state.is_free() {
                debug!("{pid} lock freed by {tid}");
            }
        }
        lock.released.notify_all();

        let mut held = self.held.lock().unwrap();
        if let Some(pages) = held.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                held.remove(&tid);
            }
        }
        Ok(())
    }

    /// Releases every lock the transaction holds. Always runs to
    /// completion: individual release failures are logged and skipped.
    pub fn unlock_all(&self, tid: TransactionId) {
        let pages = match self.held.lock().unwrap().remove(&tid) {
            Some(pages) => pages,
            None => return,
        };
        for pid in pages {
            let lock = self.page_lock(pid);
            {
                let mut state = lock.state.lock().unwrap();
                if state.exclusive == Some(tid) {
                    state.exclusive = None;
                } else if !state.shared.remove(&tid) {
                    error!("{tid} recorded as holding {pid} but holds no lock");
                    continue;
                }
            }
            lock.released.notify_all();
        }
        debug!("{tid} released all locks");
    }

    /// Whether the transaction holds any lock on the page.
    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        match self.existing_page_lock(pid) {
            Some(lock) => lock.state.lock().unwrap().holds(tid),
            None => false,
        }
    }

    /// Whether the transaction holds the exclusive lock on the page.
    pub fn holds_exclusive(&self, tid: TransactionId, pid: PageId) -> bool {
        match self.existing_page_lock(pid) {
            Some(lock) => lock.state.lock().unwrap().exclusive == Some(tid),
            None => false,
        }
    }

    /// Whether any transaction holds the page exclusively.
    pub fn is_write_locked(&self, pid: PageId) -> bool {
        match self.existing_page_lock(pid) {
            Some(lock) => lock.state.lock().unwrap().exclusive.is_some(),
            None => false,
        }
    }

    /// The pages the transaction currently holds locks on.
    pub fn held_pages(&self, tid: TransactionId) -> Vec<PageId> {
        self.held
            .lock()
            .unwrap()
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The lock timeout for a transaction: the base timeout plus a jitter
    /// derived from the transaction id, so a pair of symmetric waiters
    /// reaches its deadlines at different times.
    fn timeout_for(&self, tid: TransactionId) -> Duration {
        let jitter = StdRng::seed_from_u64(tid.id()).gen_range(0..LOCK_TIMEOUT_JITTER_MS);
        self.base_timeout + Duration::from_millis(jitter)
    }

    /// The page's lock slot, created on first use. Slots are never removed
    /// while the manager lives: waiters keep references to them, and a
    /// removed-and-recreated slot would split holders across two mutexes.
    fn page_lock(&self, pid: PageId) -> Arc<PageLock> {
        let mut locks = self.locks.lock().unwrap();
        Arc::clone(locks.entry(pid).or_default())
    }

    fn existing_page_lock(&self, pid: PageId) -> Option<Arc<PageLock>> {
        self.locks.lock().unwrap().get(&pid).map(Arc::clone)
    }

    fn record_held(&self, tid: TransactionId, pid: PageId) {
        self.held
            .lock()
            .unwrap()
            .entry(tid)
            .or_default()
            .insert(pid);
    }
}

impl Default for LockManager {
    fn default() -> Self {
        LockManager::new()
    }
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let held = self.held.lock().unwrap_or_else(|e| {
            warn!("lock manager held-index poisoned while formatting");
            e.into_inner()
        });
        f.debug_struct("LockManager")
            .field("held", &*held)
            .field("base_timeout", &self.base_timeout)
            .finish()
    }
}
