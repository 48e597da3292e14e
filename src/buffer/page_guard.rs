//! RAII pin guard for pages of a [`SharedBufferPool`].
//!
//! A [`PinnedPage`] holds one pin on a page. Page contents are reached
//! through closures that lock the pool only for their duration, and the pin
//! is released when the guard drops (dirty if it was ever written through).

use tracing::error;

use crate::buffer::SharedBufferPool;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;
use crate::storage::FileRef;

/// One pin on a cached page.
///
/// # Example
/// ```ignore
/// let mut page = pool.read_page(&file, page_id)?;
/// let first = page.read(|p| p.data()[0])?;
/// page.write(|p| p.data_mut()[0] = first + 1)?;
/// // page drops here: unpinned and marked dirty
/// ```
pub struct PinnedPage {
    pool: SharedBufferPool,
    file: FileRef,
    page_id: PageId,
    /// Set by the first `write`.
    dirty: bool,
    /// Set once the pin has been handed back.
    released: bool,
}

impl PinnedPage {
    /// Called by `SharedBufferPool` after it has pinned the page.
    pub(crate) fn new(pool: SharedBufferPool, file: FileRef, page_id: PageId) -> Self {
        Self {
            pool,
            file,
            page_id,
            dirty: false,
            released: false,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Run `f` on the page with the pool locked.
    ///
    /// `f` must not call back into the pool.
    ///
    /// # Errors
    /// `Error::PageNotFound` if the page left the pool even though this
    /// guard still pins it, which only happens when someone else released
    /// this guard's pin through `unpin_page`.
    pub fn read<R>(&self, f: impl FnOnce(&Page) -> R) -> Result<R> {
        let bpm = self.pool.lock();
        let page = bpm.page(&self.file, self.page_id).ok_or_else(|| self.vanished())?;
        Ok(f(page))
    }

    /// Run `f` on the page mutably with the pool locked, and remember to
    /// unpin it dirty.
    ///
    /// # Errors
    /// Same as [`PinnedPage::read`].
    pub fn write<R>(&mut self, f: impl FnOnce(&mut Page) -> R) -> Result<R> {
        let mut bpm = self.pool.lock();
        let page = bpm
            .page_mut(&self.file, self.page_id)
            .ok_or_else(|| self.vanished())?;
        let result = f(page);
        self.dirty = true;
        Ok(result)
    }

    /// Release the pin now and report any error, instead of logging it on
    /// drop.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        let result = self
            .pool
            .lock()
            .unpin_page(&self.file, self.page_id, self.dirty);
        result
    }

    fn vanished(&self) -> Error {
        Error::PageNotFound {
            file: self.file.filename().to_string(),
            page_id: self.page_id,
        }
    }
}

impl Drop for PinnedPage {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let result = self
            .pool
            .lock()
            .unpin_page(&self.file, self.page_id, self.dirty);
        if let Err(e) = result {
            error!(page_id = %self.page_id, error = %e, "failed to unpin page on drop");
        }
    }
}
