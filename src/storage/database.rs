use crate::config::config::DEFAULT_POOL_CAPACITY;
use crate::storage::buffer::BufferPool;
use crate::storage::Catalog;
use std::sync::Arc;
use std::time::Duration;

/// One engine instance: a catalog and the buffer pool mediating access to
/// its heap files. Construct one per process (or per test) and hand its
/// pool to operators.
pub struct Database {
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    pub fn new() -> Database {
        Database::with_capacity(DEFAULT_POOL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Database {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(BufferPool::new(capacity, Arc::clone(&catalog)));
        Database {
            catalog,
            buffer_pool,
        }
    }

    /// As `with_capacity`, with an explicit base lock timeout.
    pub fn with_capacity_and_lock_timeout(capacity: usize, lock_timeout: Duration) -> Database {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(BufferPool::with_lock_timeout(
            capacity,
            Arc::clone(&catalog),
            lock_timeout,
        ));
        Database {
            catalog,
            buffer_pool,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }
}

impl Default for Database {
    fn default() -> Self {
        Database::new()
    }
}
