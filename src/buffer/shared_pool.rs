//! Thread-safe handle to a buffer pool.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::buffer::descriptor::PoolDescription;
use crate::buffer::{BufferPoolManager, BufferPoolStats, PinnedPage};
use crate::common::{BufferPoolConfig, PageId, Result};
use crate::storage::FileRef;

/// A [`BufferPoolManager`] behind one mutex.
///
/// Every public operation is one critical section, so eviction scans can
/// never interleave with another operation on the same page. For a sequence
/// that has to be atomic as a whole, take the lock with
/// [`SharedBufferPool::lock`].
///
/// Cloning is cheap and yields another handle to the same pool.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use bufmgr::{FileRef, MemFile, SharedBufferPool};
///
/// let file: FileRef = Arc::new(MemFile::new("shared.db"));
/// let pool = SharedBufferPool::new(4);
///
/// let mut page = pool.alloc_page(&file).unwrap();
/// page.write(|p| p.data_mut()[0] = 9).unwrap();
/// let page_id = page.page_id();
/// drop(page); // unpinned, marked dirty
///
/// assert_eq!(pool.pin_count(&file, page_id), Some(0));
/// ```
#[derive(Clone)]
pub struct SharedBufferPool {
    inner: Arc<Mutex<BufferPoolManager>>,
}

impl SharedBufferPool {
    /// Create a shared pool of `pool_size` frames.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize) -> Self {
        Self::from_manager(BufferPoolManager::new(pool_size))
    }

    pub fn with_config(config: BufferPoolConfig) -> Result<Self> {
        Ok(Self::from_manager(BufferPoolManager::with_config(config)?))
    }

    pub fn from_manager(bpm: BufferPoolManager) -> Self {
        Self {
            inner: Arc::new(Mutex::new(bpm)),
        }
    }

    /// Lock the pool for a sequence of operations.
    ///
    /// Don't call other methods of this handle while holding the guard:
    /// the lock is not reentrant.
    pub fn lock(&self) -> MutexGuard<'_, BufferPoolManager> {
        self.inner.lock()
    }

    /// Read and pin a page. The pin is released when the guard drops.
    pub fn read_page(&self, file: &FileRef, page_id: PageId) -> Result<PinnedPage> {
        self.inner.lock().read_page(file, page_id)?;
        Ok(PinnedPage::new(self.clone(), file.clone(), page_id))
    }

    /// Allocate and pin a new page. The pin is released when the guard
    /// drops.
    pub fn alloc_page(&self, file: &FileRef) -> Result<PinnedPage> {
        let (page_id, _) = self.inner.lock().alloc_page(file)?;
        Ok(PinnedPage::new(self.clone(), file.clone(), page_id))
    }

    pub fn unpin_page(&self, file: &FileRef, page_id: PageId, mark_dirty: bool) -> Result<()> {
        self.inner.lock().unpin_page(file, page_id, mark_dirty)
    }

    pub fn dispose_page(&self, file: &FileRef, page_id: PageId) -> Result<()> {
        self.inner.lock().dispose_page(file, page_id)
    }

    pub fn flush_file(&self, file: &FileRef) -> Result<()> {
        self.inner.lock().flush_file(file)
    }

    pub fn flush_all(&self) -> Result<()> {
        self.inner.lock().flush_all()
    }

    pub fn pin_count(&self, file: &FileRef, page_id: PageId) -> Option<u32> {
        self.inner.lock().pin_count(file, page_id)
    }

    pub fn describe(&self) -> PoolDescription {
        self.inner.lock().describe()
    }

    pub fn stats(&self) -> BufferPoolStats {
        self.inner.lock().stats()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }
}
