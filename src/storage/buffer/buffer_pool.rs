use crate::common::constants::{MISSING_RID_MSG, NO_CLEAN_PAGE_MSG};
use crate::common::{Error, Result};
use crate::concurrency::{LockManager, Permission, TransactionId};
use crate::errinput;
use crate::storage::page::{HeapPageHandle, PageId};
use crate::storage::tuple::Tuple;
use crate::storage::Catalog;
use log::{debug, error};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// The in-memory page cache, with page ids kept in insertion order for the
/// FIFO eviction scan.
#[derive(Debug, Default)]
struct PageCache {
    pages: HashMap<PageId, HeapPageHandle>,
    order: VecDeque<PageId>,
}

impl PageCache {
    fn insert(&mut self, pid: PageId, handle: HeapPageHandle) {
        self.pages.insert(pid, handle);
        self.order.push_back(pid);
    }

    fn remove(&mut self, pid: PageId) -> Option<HeapPageHandle> {
        self.order.retain(|p| *p != pid);
        self.pages.remove(&pid)
    }
}

/// The single cache of pages in memory and the only path from operators to
/// the file layer.
///
/// Every `get_page` consults the lock manager before touching the cache
/// (always in that order, so the pool's cache lock never inverts against a
/// page-lock wait). Dirty pages stay in memory until their transaction
/// commits (NO STEAL): eviction only ever selects clean pages, and a cache
/// full of dirty pages is a hard error rather than an early write-back.
pub struct BufferPool {
    capacity: usize,
    catalog: Arc<Catalog>,
    lock_manager: LockManager,
    cache: RwLock<PageCache>,
}

impl BufferPool {
    pub fn new(capacity: usize, catalog: Arc<Catalog>) -> BufferPool {
        BufferPool {
            capacity,
            catalog,
            lock_manager: LockManager::new(),
            cache: RwLock::new(PageCache::default()),
        }
    }

    /// As `new`, with an explicit base lock timeout.
    pub fn with_lock_timeout(
        capacity: usize,
        catalog: Arc<Catalog>,
        lock_timeout: Duration,
    ) -> BufferPool {
        BufferPool {
            capacity,
            catalog,
            lock_manager: LockManager::with_timeout(lock_timeout),
            cache: RwLock::new(PageCache::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Fetches a page on behalf of a transaction, locking it first:
    /// read-only access takes the page's shared lock, read-write its
    /// exclusive lock. A lock-wait timeout aborts the transaction.
    ///
    /// Cache hits return the cached handle; misses read through the heap
    /// file, evicting a clean page first when the cache is full.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permission,
    ) -> Result<HeapPageHandle> {
        if !self.lock_manager.acquire(tid, pid, perm) {
            debug!("{tid} failed to lock {pid} for {perm:?}, aborting");
            return Err(Error::Abort);
        }

        {
            let cache = self.cache.read()?;
            if let Some(handle) = cache.pages.get(&pid) {
                return Ok(Arc::clone(handle));
            }
        }

        let mut cache = self.cache.write()?;
        // another thread may have loaded the page while we waited
        if let Some(handle) = cache.pages.get(&pid) {
            return Ok(Arc::clone(handle));
        }
        if cache.pages.len() >= self.capacity {
            self.evict_one(tid, &mut cache)?;
        }
        let file = self.catalog.get_file(pid.table_id())?;
        let handle: HeapPageHandle = Arc::new(RwLock::new(file.read_page(pid)?));
        cache.insert(pid, Arc::clone(&handle));
        Ok(handle)
    }

    /// Evicts one page chosen by FIFO scan over insertion order. A page
    /// qualifies if it is clean and not write-locked by another
    /// transaction. Clean pages match their on-disk image, so eviction is
    /// removal without write-back.
    fn evict_one(&self, tid: TransactionId, cache: &mut PageCache) -> Result<()> {
        let victim = cache.order.iter().copied().find(|pid| {
            let Some(handle) = cache.pages.get(pid) else {
                return false;
            };
            let clean = handle.read().map(|p| p.is_dirty().is_none()).unwrap_or(false);
            clean
                && (!self.lock_manager.is_write_locked(*pid)
                    || self.lock_manager.holds_lock(tid, *pid))
        });
        match victim {
            Some(pid) => {
                cache.remove(pid);
                debug!("evicted clean page {pid}");
                Ok(())
            }
            None => Err(Error::InvalidState(NO_CLEAN_PAGE_MSG.to_string())),
        }
    }

    /// Inserts a tuple into the table, marking every page the heap file
    /// dirtied and keeping those pages cached.
    pub fn insert_tuple(&self, tid: TransactionId, table_id: i32, tuple: Tuple) -> Result<()> {
        let file = self.catalog.get_file(table_id)?;
        let dirtied = file.insert_tuple(tid, tuple, self)?;
        for handle in dirtied {
            handle.write()?.mark_dirty(true, tid);
            self.ensure_cached(tid, &handle)?;
        }
        Ok(())
    }

    /// Deletes the tuple its record id names, marking the page dirty.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let rid = tuple
            .rid()
            .ok_or_else(|| Error::InvalidInput(MISSING_RID_MSG.to_string()))?;
        let file = self.catalog.get_file(rid.page_id().table_id())?;
        let handle = file.delete_tuple(tid, tuple, self)?;
        handle.write()?.mark_dirty(true, tid);
        self.ensure_cached(tid, &handle)?;
        Ok(())
    }

    /// Completes a transaction. On commit every page it dirtied is flushed
    /// before any exclusive lock is released; on abort those pages revert
    /// to their pre-transaction image and leave the cache. Shared-only
    /// locks are released up front in both cases, and lock release always
    /// runs to completion even when a flush or restore fails.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        debug!("{tid} completing, commit={commit}");

        // pages the transaction only read can be unlocked immediately
        for pid in self.lock_manager.held_pages(tid) {
            if !self.lock_manager.holds_exclusive(tid, pid) {
                if let Err(e) = self.lock_manager.release(tid, pid) {
                    error!("releasing shared lock on {pid} for {tid}: {e}");
                }
            }
        }

        let mut first_error = None;
        if commit {
            let dirtied = self.pages_dirtied_by(tid)?;
            for (pid, handle) in dirtied {
                if let Err(e) = self.flush_handle(&handle) {
                    error!("flushing {pid} for committing {tid}: {e}");
                    first_error.get_or_insert(e);
                }
            }
        } else {
            let mut cache = self.cache.write()?;
            let dirtied: Vec<PageId> = cache
                .pages
                .iter()
                .filter(|(_, handle)| {
                    handle.read().map(|p| p.is_dirty() == Some(tid)).unwrap_or(false)
                })
                .map(|(pid, _)| *pid)
                .collect();
            for pid in dirtied {
                if let Some(handle) = cache.remove(pid) {
                    debug!("discarding dirty page {pid} on abort of {tid}");
                    let restored = handle
                        .write()
                        .map_err(Error::from)
                        .and_then(|mut page| page.restore_before_image());
                    if let Err(e) = restored {
                        error!("restoring before-image of {pid} for {tid}: {e}");
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        self.lock_manager.unlock_all(tid);
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Writes the cached page through to its heap file and clears its
    /// dirty marker.
    pub fn flush_page(&self, pid: PageId) -> Result<()> {
        let handle = {
            let cache = self.cache.read()?;
            cache.pages.get(&pid).map(Arc::clone)
        };
        match handle {
            Some(handle) => self.flush_handle(&handle),
            None => errinput!("page {pid} is not cached"),
        }
    }

    /// Flushes every dirty page in the cache, regardless of owner. Used at
    /// shutdown, after all transactions have completed.
    pub fn flush_all_pages(&self) -> Result<()> {
        let handles: Vec<HeapPageHandle> = {
            let cache = self.cache.read()?;
            cache.pages.values().map(Arc::clone).collect()
        };
        for handle in handles {
            self.flush_handle(&handle)?;
        }
        Ok(())
    }

    fn flush_handle(&self, handle: &HeapPageHandle) -> Result<()> {
        let mut page = handle.write()?;
        let file = self.catalog.get_file(page.get_id().table_id())?;
        file.write_page(&page)?;
        if let Some(tid) = page.is_dirty() {
            page.mark_dirty(false, tid);
        }
        page.set_before_image();
        Ok(())
    }

    fn pages_dirtied_by(&self, tid: TransactionId) -> Result<Vec<(PageId, HeapPageHandle)>> {
        let cache = self.cache.read()?;
        Ok(cache
            .pages
            .iter()
            .filter(|(_, handle)| {
                handle.read().map(|p| p.is_dirty() == Some(tid)).unwrap_or(false)
            })
            .map(|(pid, handle)| (*pid, Arc::clone(handle)))
            .collect())
    }

    /// Inserts a page the heap file dirtied if it is somehow absent,
    /// evicting first when full.
    fn ensure_cached(&self, tid: TransactionId, handle: &HeapPageHandle) -> Result<()> {
        let pid = handle.read()?.get_id();
        let mut cache = self.cache.write()?;
        if cache.pages.contains_key(&pid) {
            return Ok(());
        }
        if cache.pages.len() >= self.capacity {
            self.evict_one(tid, &mut cache)?;
        }
        cache.insert(pid, Arc::clone(handle));
        Ok(())
    }

    /// Whether the transaction holds a lock on the page.
    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds_lock(tid, pid)
    }

    /// Releases a single page lock early. Only correct for pages the
    /// transaction merely inspected (the heap file's free-slot scan);
    /// everything else stays locked until `transaction_complete`.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) -> Result<()> {
        self.lock_manager.release(tid, pid)
    }

    /// Number of pages currently cached.
    pub fn cached_page_count(&self) -> usize {
        self.cache.read().map(|c| c.pages.len()).unwrap_or(0)
    }

    /// Whether the page is currently cached.
    pub fn is_cached(&self, pid: PageId) -> bool {
        self.cache.read().map(|c| c.pages.contains_key(&pid)).unwrap_or(false)
    }
}
