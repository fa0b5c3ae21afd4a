use crate::common::constants::{MISSING_RID_MSG, SHORT_READ_MSG, WRONG_TABLE_MSG};
use crate::common::{Error, Result};
use crate::concurrency::{Permission, TransactionId};
use crate::config::config::MINNOW_DB_PAGE_SIZE_BYTES;
use crate::errinput;
use crate::storage::buffer::BufferPool;
use crate::storage::page::{HeapPage, HeapPageHandle, PageId};
use crate::storage::tuple::Tuple;
use crate::types::Schema;
use log::debug;
use std::collections::hash_map::DefaultHasher;
use std::fs::{File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A heap file: an unordered persistent array of pages backed by a single
/// on-disk file, page `n` at byte offset `n * page_size`.
///
/// The file never touches pages directly during tuple operations; every
/// page it reads or mutates on behalf of a transaction is obtained through
/// the buffer pool, so locking and the dirty-page lifecycle stay in force.
/// Raw `read_page`/`write_page` I/O is reserved for the pool itself.
#[derive(Debug)]
pub struct HeapFile {
    path: PathBuf,
    schema: Arc<Schema>,
    id: i32,
    file: Mutex<File>,
}

impl HeapFile {
    /// Opens (creating if absent) the heap file at `path`. The table id is
    /// a stable hash of the absolute path, so the same file resolves to
    /// the same id across restarts.
    pub fn new(path: &Path, schema: Schema) -> Result<HeapFile> {
        if schema.col_count() == 0 {
            return errinput!("heap file schema must have at least one column");
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let path = path.canonicalize()?;

        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        let id = hasher.finish() as i32;

        debug!("opened heap file {} as table {id}", path.display());
        Ok(HeapFile {
            path,
            schema: Arc::new(schema),
            id,
            file: Mutex::new(file),
        })
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Number of whole pages in the file; trailing partial bytes are
    /// ignored.
    pub fn num_pages(&self) -> Result<u32> {
        let file = self.file.lock()?;
        Ok((file.metadata()?.len() / MINNOW_DB_PAGE_SIZE_BYTES as u64) as u32)
    }

    /// Reads one page from disk. Only the buffer pool should call this;
    /// everything above the pool must go through `BufferPool::get_page`.
    pub fn read_page(&self, pid: PageId) -> Result<HeapPage> {
        if pid.table_id() != self.id {
            return Err(Error::InvalidInput(WRONG_TABLE_MSG.to_string()));
        }
        let offset = pid.page_no() as u64 * MINNOW_DB_PAGE_SIZE_BYTES as u64;
        let mut buffer = vec![0u8; MINNOW_DB_PAGE_SIZE_BYTES];
        {
            let mut file = self.file.lock()?;
            if offset + MINNOW_DB_PAGE_SIZE_BYTES as u64 > file.metadata()?.len() {
                return Err(Error::IO(SHORT_READ_MSG.to_string()));
            }
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buffer)?;
        }
        HeapPage::new_from_bytes(pid, &self.schema, &buffer)
    }

    /// Writes one page image back to its offset.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let pid = page.get_id();
        if pid.table_id() != self.id {
            return Err(Error::InvalidInput(WRONG_TABLE_MSG.to_string()));
        }
        let offset = pid.page_no() as u64 * MINNOW_DB_PAGE_SIZE_BYTES as u64;
        let mut file = self.file.lock()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&page.page_data())?;
        debug!("wrote page {pid} to disk");
        Ok(())
    }

    /// Extends the file with one zeroed page, returning its id. The length
    /// check and the write happen under the file mutex so concurrent
    /// appends get distinct page numbers.
    fn append_empty_page(&self) -> Result<PageId> {
        let mut file = self.file.lock()?;
        let page_no = (file.metadata()?.len() / MINNOW_DB_PAGE_SIZE_BYTES as u64) as u32;
        let pid = PageId::new(self.id, page_no);

        file.seek(SeekFrom::Start(page_no as u64 * MINNOW_DB_PAGE_SIZE_BYTES as u64))?;
        file.write_all(&vec![0u8; MINNOW_DB_PAGE_SIZE_BYTES])?;
        debug!("appended empty page {pid}");
        Ok(pid)
    }

    /// Inserts the tuple on the first page with an unused slot, appending
    /// a fresh page when the file is full. Returns the pages dirtied.
    ///
    /// The candidate scan takes each page read-only; a full page whose
    /// lock the transaction did not already hold is unlocked again right
    /// away, so an appending workload does not accumulate shared locks
    /// across the whole file.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        tuple: Tuple,
        pool: &BufferPool,
    ) -> Result<Vec<HeapPageHandle>> {
        let mut target = None;
        for page_no in 0..self.num_pages()? {
            let pid = PageId::new(self.id, page_no);
            let already_held = pool.holds_lock(tid, pid);
            let page = pool.get_page(tid, pid, Permission::ReadOnly)?;
            let has_room = page.read()?.num_unused_slots() > 0;
            if has_room {
                target = Some(pid);
                break;
            }
            if !already_held {
                pool.release_page(tid, pid)?;
            }
        }

        let pid = match target {
            Some(pid) => pid,
            None => self.append_empty_page()?,
        };
        let page = pool.get_page(tid, pid, Permission::ReadWrite)?;
        page.write()?.insert_tuple(tuple)?;
        Ok(vec![page])
    }

    /// Deletes the tuple from the page its record id names. Returns the
    /// page dirtied.
    pub fn delete_tuple(
        &self,
        tid: TransactionId,
        tuple: &Tuple,
        pool: &BufferPool,
    ) -> Result<HeapPageHandle> {
        let rid = tuple
            .rid()
            .ok_or_else(|| Error::InvalidInput(MISSING_RID_MSG.to_string()))?;
        let pid = rid.page_id();
        if pid.table_id() != self.id {
            return Err(Error::InvalidInput(WRONG_TABLE_MSG.to_string()));
        }
        let page = pool.get_page(tid, pid, Permission::ReadWrite)?;
        page.write()?.delete_tuple(tuple)?;
        Ok(page)
    }

    /// Returns an iterator pulling the file's tuples page by page in
    /// ascending page order, each page acquired read-only via the pool.
    pub fn iterator(
        self: &Arc<Self>,
        tid: TransactionId,
        pool: &Arc<BufferPool>,
    ) -> HeapFileIterator {
        HeapFileIterator {
            file: Arc::clone(self),
            pool: Arc::clone(pool),
            tid,
            next_page_no: 0,
            current: Vec::new().into_iter(),
        }
    }
}

/// Sequential tuple iterator over a heap file. Pages are fetched lazily so
/// a partial scan only locks the prefix it touched.
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    pool: Arc<BufferPool>,
    tid: TransactionId,
    next_page_no: u32,
    current: std::vec::IntoIter<Tuple>,
}

impl Iterator for HeapFileIterator {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tuple) = self.current.next() {
                return Some(Ok(tuple));
            }
            let num_pages = match self.file.num_pages() {
                Ok(n) => n,
                Err(e) => return Some(Err(e)),
            };
            if self.next_page_no >= num_pages {
                return None;
            }
            let pid = PageId::new(self.file.id(), self.next_page_no);
            self.next_page_no += 1;
            match self.pool.get_page(self.tid, pid, Permission::ReadOnly) {
                Ok(page) => match page.read() {
                    Ok(guard) => self.current = guard.tuples().into_iter(),
                    Err(e) => return Some(Err(e.into())),
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
