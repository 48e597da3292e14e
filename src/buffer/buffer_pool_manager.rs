//! Buffer Pool Manager - the core page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between files and memory
//! - Pin-based reference counting
//! - Dirty page write-back before a frame is reused
//! - CLOCK (second chance) eviction

use tracing::{debug, error, trace, warn};

use crate::buffer::descriptor::{DescriptorTable, PoolDescription};
use crate::buffer::frame::FrameStore;
use crate::buffer::page_index::PageIndex;
use crate::buffer::replacer::ClockReplacer;
use crate::buffer::BufferPoolStats;
use crate::common::{BufferPoolConfig, Error, FrameId, PageId, Result};
use crate::storage::page::Page;
use crate::storage::FileRef;

/// Manages a pool of frames caching pages of one or more files.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                     BufferPoolManager                        │
/// │  ┌──────────────────┐   ┌───────────────────────────────┐    │
/// │  │   page_index     │   │      frames: FrameStore       │    │
/// │  │(file, PageId)→Fid│──▶│ [Frame0] [Frame1] [Frame2] …  │    │
/// │  └──────────────────┘   └───────────────────────────────┘    │
/// │  ┌──────────────────┐   ┌───────────────────────────────┐    │
/// │  │    replacer      │──▶│  descriptors: DescriptorTable │    │
/// │  │  ClockReplacer   │   │ valid / ref / dirty / pin     │    │
/// │  └──────────────────┘   └───────────────────────────────┘    │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// The frame store, descriptor table and page index are only ever changed
/// together, so that a frame is indexed exactly while its descriptor is
/// valid.
///
/// # Thread Safety
/// All mutating operations take `&mut self`; the pool does no locking of
/// its own. Share it between threads through
/// [`SharedBufferPool`](crate::buffer::SharedBufferPool).
///
/// # Files
/// The pool never owns a file. Frames keep `Weak` handles to the file of
/// the page they hold, so callers must keep a file alive for as long as it
/// has dirty pages in the pool; a dirty page of a dropped file cannot be
/// written back and is reported as `Error::FileClosed`. A file opened again
/// under the same name takes over its old frames on the next access, while
/// two live files of the same name are rejected with
/// `Error::DuplicateEntry`.
///
/// # Usage
/// ```
/// use std::sync::Arc;
/// use bufmgr::{BufferPoolManager, FileRef, MemFile};
///
/// let file: FileRef = Arc::new(MemFile::new("table.db"));
/// let mut bpm = BufferPoolManager::new(8);
///
/// // Allocate a page; it comes back pinned.
/// let (page_id, page) = bpm.alloc_page(&file).unwrap();
/// page.data_mut()[0] = 0xAB;
/// bpm.unpin_page(&file, page_id, true).unwrap();
///
/// // Read it again: a cache hit.
/// let page = bpm.read_page(&file, page_id).unwrap();
/// assert_eq!(page.data()[0], 0xAB);
/// bpm.unpin_page(&file, page_id, false).unwrap();
///
/// bpm.shutdown().unwrap();
/// ```
pub struct BufferPoolManager {
    /// Page images, one per frame.
    frames: FrameStore,

    /// Per-frame metadata.
    descriptors: DescriptorTable,

    /// Maps cached pages to frames.
    page_index: PageIndex,

    /// Eviction policy; owns the clock hand.
    replacer: ClockReplacer,

    stats: BufferPoolStats,

    /// Set by `shutdown` so that `Drop` does not flush a second time.
    shut_down: bool,
}

impl BufferPoolManager {
    /// Create a pool of `pool_size` empty frames.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        Self {
            frames: FrameStore::new(pool_size),
            descriptors: DescriptorTable::new(pool_size),
            page_index: PageIndex::with_capacity(pool_size),
            replacer: ClockReplacer::new(pool_size),
            stats: BufferPoolStats::default(),
            shut_down: false,
        }
    }

    /// Create a pool from a validated configuration.
    ///
    /// # Errors
    /// `Error::InvalidConfig` if the configuration is rejected.
    pub fn with_config(config: BufferPoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.pool_size))
    }

    // ========================================================================
    // Public API: Fetch and create pages
    // ========================================================================

    /// Read a page through the pool and pin it.
    ///
    /// On a hit the cached frame is pinned once more. On a miss a frame is
    /// obtained from the replacer (writing back a dirty victim if needed)
    /// and the page is read from `file`.
    ///
    /// Every successful call must be matched by one
    /// [`unpin_page`](Self::unpin_page).
    ///
    /// # Errors
    /// - `Error::PoolExhausted` if all frames are pinned
    /// - Whatever `file` reports for the read (e.g. `Error::PageNotFound`)
    /// - Errors writing back the victim frame
    /// - `Error::DuplicateEntry` if the page is cached for a different open
    ///   file of the same name
    pub fn read_page(&mut self, file: &FileRef, page_id: PageId) -> Result<&mut Page> {
        let frame_id = match self.page_index.lookup(file.filename(), page_id) {
            Some(frame_id) => {
                self.claim(frame_id, file, page_id)?;
                let pins = self.descriptors[frame_id].touch();
                self.stats.cache_hits += 1;
                trace!(file = file.filename(), %page_id, %frame_id, pins, "buffer pool hit");
                frame_id
            }
            None => {
                self.stats.cache_misses += 1;
                let frame_id = self.allocate_frame()?;
                debug!(file = file.filename(), %page_id, %frame_id, "buffer pool miss, reading page");

                let page = file.read_page(page_id)?;
                self.stats.pages_read += 1;
                self.install(file, page_id, frame_id, page)?;
                frame_id
            }
        };

        Ok(self.frames.page_mut(frame_id))
    }

    /// Allocate a new page in `file` and load it into the pool, pinned.
    ///
    /// The frame is chosen before the file is asked for a page, so a full
    /// pool never leaves an orphaned page behind in the file.
    ///
    /// # Errors
    /// - `Error::PoolExhausted` if all frames are pinned
    /// - Errors from the file's allocation
    pub fn alloc_page(&mut self, file: &FileRef) -> Result<(PageId, &mut Page)> {
        let frame_id = self.allocate_frame()?;

        let page = file.allocate_page()?;
        let page_id = page.page_id();
        self.install(file, page_id, frame_id, page)?;
        self.stats.pages_allocated += 1;
        debug!(file = file.filename(), %page_id, %frame_id, "allocated new page");

        Ok((page_id, self.frames.page_mut(frame_id)))
    }

    // ========================================================================
    // Public API: Release pages
    // ========================================================================

    /// Release one pin on a page, optionally marking it dirty.
    ///
    /// Unpinning a page that isn't cached does nothing. `mark_dirty ==
    /// false` never clears an earlier dirty mark.
    ///
    /// # Errors
    /// - `Error::NotPinned` if the page's pin count is already zero
    /// - `Error::DuplicateEntry` if the page is cached for a different open
    ///   file of the same name
    pub fn unpin_page(&mut self, file: &FileRef, page_id: PageId, mark_dirty: bool) -> Result<()> {
        let Some(frame_id) = self.page_index.lookup(file.filename(), page_id) else {
            return Ok(());
        };
        self.claim(frame_id, file, page_id)?;

        let desc = &mut self.descriptors[frame_id];
        if desc.unpin().is_none() {
            return Err(Error::NotPinned {
                file: file.filename().to_string(),
                page_id,
                frame_id,
            });
        }
        if mark_dirty {
            desc.mark_dirty();
        }
        Ok(())
    }

    /// Delete a page from `file`, dropping it from the pool first if cached.
    ///
    /// A dirty cached copy is discarded without being written back.
    ///
    /// # Errors
    /// - `Error::PagePinned` if the page is cached and pinned; the file is
    ///   not touched in that case
    /// - Errors from the file's deletion
    pub fn dispose_page(&mut self, file: &FileRef, page_id: PageId) -> Result<()> {
        if let Some(frame_id) = self.page_index.lookup(file.filename(), page_id) {
            if self.descriptors[frame_id].is_pinned() {
                return Err(Error::PagePinned {
                    file: file.filename().to_string(),
                    page_id,
                    frame_id,
                });
            }
            self.page_index.remove(file.filename(), page_id);
            self.descriptors[frame_id].clear();
        }

        file.delete_page(page_id)?;
        self.stats.pages_disposed += 1;
        debug!(file = file.filename(), %page_id, "disposed page");
        Ok(())
    }

    // ========================================================================
    // Public API: Flush pages
    // ========================================================================

    /// Write back and drop every cached page of `file`.
    ///
    /// Frames are processed in ascending frame order. Dirty pages are
    /// written back; every page is then removed from the pool.
    ///
    /// # Errors
    /// - `Error::PagePinned` on the first pinned page. Pages in lower
    ///   frames have already been flushed and dropped; the rest are
    ///   untouched.
    /// - `Error::CorruptState` if an indexed frame is not valid
    /// - Errors writing pages back
    pub fn flush_file(&mut self, file: &FileRef) -> Result<()> {
        let name = file.filename();

        for (page_id, frame_id) in self.page_index.frames_of(name) {
            let desc = &self.descriptors[frame_id];
            if desc.is_pinned() {
                return Err(Error::PagePinned {
                    file: name.to_string(),
                    page_id,
                    frame_id,
                });
            }
            if !desc.is_valid() || desc.page_id() != page_id {
                return Err(desc.corrupt());
            }

            if desc.is_dirty() {
                file.write_page(self.frames.page(frame_id))?;
                self.descriptors[frame_id].clear_dirty();
                self.stats.pages_written += 1;
            }

            self.page_index.remove(name, page_id);
            self.descriptors[frame_id].clear();
        }

        debug!(file = name, "flushed file");
        Ok(())
    }

    /// Write back every dirty page without dropping anything from the pool.
    ///
    /// Keeps going after a failed write so that no dirty page is skipped,
    /// then returns the first error.
    pub fn flush_all(&mut self) -> Result<()> {
        let mut first_error = None;

        for index in 0..self.descriptors.len() {
            let frame_id = FrameId::new(index);
            let desc = &self.descriptors[frame_id];
            if !desc.is_valid() || !desc.is_dirty() {
                continue;
            }

            if let Err(e) = self.write_back(frame_id) {
                warn!(%frame_id, error = %e, "failed to write back dirty page");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Write back every dirty page and release the pool.
    ///
    /// # Errors
    /// The first write-back failure. Every other dirty page is still
    /// attempted.
    pub fn shutdown(mut self) -> Result<()> {
        let result = self.flush_all();
        self.shut_down = true;
        debug!(stats = %self.stats, "buffer pool shut down");
        result
    }

    // ========================================================================
    // Public API: Inspection
    // ========================================================================

    /// Cached image of a page, without pinning it.
    pub fn page(&self, file: &FileRef, page_id: PageId) -> Option<&Page> {
        let frame_id = self.page_index.lookup(file.filename(), page_id)?;
        Some(self.frames.page(frame_id))
    }

    /// Mutable access to a cached page, without pinning it.
    ///
    /// Meant for pages the caller already holds a pin on. Changes are only
    /// written back if the page is unpinned with `mark_dirty`.
    pub fn page_mut(&mut self, file: &FileRef, page_id: PageId) -> Option<&mut Page> {
        let frame_id = self.page_index.lookup(file.filename(), page_id)?;
        Some(self.frames.page_mut(frame_id))
    }

    /// Pin count of a cached page, or `None` if it isn't cached.
    pub fn pin_count(&self, file: &FileRef, page_id: PageId) -> Option<u32> {
        let frame_id = self.page_index.lookup(file.filename(), page_id)?;
        Some(self.descriptors[frame_id].pin_count())
    }

    /// Whether the page currently occupies a frame.
    pub fn is_cached(&self, file: &FileRef, page_id: PageId) -> bool {
        self.page_index.lookup(file.filename(), page_id).is_some()
    }

    /// Frame holding a page, if cached.
    pub fn frame_of(&self, file: &FileRef, page_id: PageId) -> Option<FrameId> {
        self.page_index.lookup(file.filename(), page_id)
    }

    /// State of every frame. Does not touch pin, reference or dirty bits.
    pub fn describe(&self) -> PoolDescription {
        let frames: Vec<_> = self.descriptors.iter().map(|d| d.state()).collect();
        let valid_frames = frames.iter().filter(|f| f.valid).count();
        PoolDescription {
            frames,
            valid_frames,
        }
    }

    pub fn stats(&self) -> BufferPoolStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Number of frames in the pool.
    pub fn capacity(&self) -> usize {
        self.frames.capacity()
    }

    /// Number of frames currently holding a page.
    pub fn page_count(&self) -> usize {
        self.page_index.len()
    }

    // ========================================================================
    // Internal: Frame allocation and eviction
    // ========================================================================

    /// Get an empty frame from the replacer, evicting its page if it has
    /// one.
    fn allocate_frame(&mut self) -> Result<FrameId> {
        let frame_id = self
            .replacer
            .find_victim(&mut self.descriptors)
            .ok_or(Error::PoolExhausted)?;

        if self.descriptors[frame_id].is_valid() {
            self.evict(frame_id)?;
        }
        Ok(frame_id)
    }

    /// Write back (if dirty), unindex and clear an unpinned frame.
    ///
    /// If the write-back fails the frame keeps its page, still indexed and
    /// dirty.
    fn evict(&mut self, frame_id: FrameId) -> Result<()> {
        let desc = &self.descriptors[frame_id];
        debug_assert!(!desc.is_pinned(), "evicting a pinned frame");

        let owner = desc.file().cloned().ok_or_else(|| desc.corrupt())?;
        let page_id = desc.page_id();

        if desc.is_dirty() {
            self.write_back(frame_id)?;
        }

        if self.page_index.remove(owner.name(), page_id) != Some(frame_id) {
            return Err(self.descriptors[frame_id].corrupt());
        }
        self.descriptors[frame_id].clear();
        self.stats.evictions += 1;
        debug!(file = owner.name(), %page_id, %frame_id, "evicted page");
        Ok(())
    }

    /// Check that a cached frame belongs to `file`.
    ///
    /// Pages are indexed by filename, so a file that was closed and opened
    /// again finds its old frames. Those are moved over to the new handle,
    /// which is where their dirty contents will be written.
    fn claim(&mut self, frame_id: FrameId, file: &FileRef, page_id: PageId) -> Result<()> {
        let desc = &mut self.descriptors[frame_id];
        let handle = desc.file().ok_or_else(|| desc.corrupt())?;
        if handle.refers_to(file) {
            return Ok(());
        }
        if !handle.is_closed() {
            return Err(Error::DuplicateEntry {
                file: file.filename().to_string(),
                page_id,
            });
        }

        desc.rebind(file);
        debug!(file = file.filename(), %page_id, %frame_id, "frame moved to reopened file");
        Ok(())
    }

    /// Write a frame's page back to its file and clear the dirty bit.
    fn write_back(&mut self, frame_id: FrameId) -> Result<()> {
        let desc = &self.descriptors[frame_id];
        let file = desc.file().ok_or_else(|| desc.corrupt())?.upgrade()?;

        file.write_page(self.frames.page(frame_id))?;
        self.descriptors[frame_id].clear_dirty();
        self.stats.pages_written += 1;
        Ok(())
    }

    /// Load `page` into an empty frame and index it, pinned once.
    fn install(&mut self, file: &FileRef, page_id: PageId, frame_id: FrameId, page: Page) -> Result<()> {
        self.page_index.insert(file.filename(), page_id, frame_id)?;
        self.frames.install(frame_id, page);
        self.descriptors[frame_id].set(file, page_id);
        Ok(())
    }

    /// Check that the index and descriptor table agree.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut valid = 0;
        for desc in self.descriptors.iter() {
            if desc.is_valid() {
                valid += 1;
                let name = desc.file().expect("valid frame without file").name();
                assert_eq!(
                    self.page_index.lookup(name, desc.page_id()),
                    Some(desc.frame_id()),
                    "valid frame not indexed"
                );
            } else {
                assert!(!desc.is_pinned(), "invalid frame is pinned");
                assert!(!desc.is_dirty(), "invalid frame is dirty");
            }
        }
        assert_eq!(valid, self.page_index.len(), "index has entries for invalid frames");
    }
}

impl Drop for BufferPoolManager {
    /// Dirty pages still in the pool are written back on a best-effort
    /// basis. Use [`BufferPoolManager::shutdown`] to observe failures.
    fn drop(&mut self) {
        if self.shut_down {
            return;
        }
        if let Err(e) = self.flush_all() {
            error!(error = %e, "dirty pages lost while dropping buffer pool");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::{MemFile, PageFile};

    /// Helper to create a file plus a typed handle for inspecting it.
    fn create_file(name: &str) -> (Arc<MemFile>, FileRef) {
        let mem = Arc::new(MemFile::new(name));
        let file: FileRef = mem.clone();
        (mem, file)
    }

    /// Allocate `n` pages directly in the file, bypassing the pool.
    fn preallocate(file: &FileRef, n: u32) {
        for _ in 0..n {
            file.allocate_page().unwrap();
        }
    }

    #[test]
    fn test_read_miss_then_hit() {
        let (mem, file) = create_file("f");
        preallocate(&file, 1);
        let mut bpm = BufferPoolManager::new(4);

        bpm.read_page(&file, PageId::new(0)).unwrap();
        assert_eq!(bpm.pin_count(&file, PageId::new(0)), Some(1));

        bpm.read_page(&file, PageId::new(0)).unwrap();
        assert_eq!(bpm.pin_count(&file, PageId::new(0)), Some(2));

        let stats = bpm.stats();
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(mem.io_counts().reads, 1);
        bpm.assert_consistent();
    }

    #[test]
    fn test_capacity_two_exhausts_when_pinned() {
        let (_mem, file) = create_file("f");
        preallocate(&file, 3);
        let mut bpm = BufferPoolManager::new(2);

        bpm.read_page(&file, PageId::new(1)).unwrap();
        bpm.read_page(&file, PageId::new(2)).unwrap();
        assert_eq!(bpm.frame_of(&file, PageId::new(1)), Some(FrameId::new(0)));
        assert_eq!(bpm.frame_of(&file, PageId::new(2)), Some(FrameId::new(1)));

        assert!(matches!(
            bpm.read_page(&file, PageId::new(0)),
            Err(Error::PoolExhausted)
        ));
        assert!(matches!(bpm.alloc_page(&file), Err(Error::PoolExhausted)));
        bpm.assert_consistent();
    }

    #[test]
    fn test_capacity_one_second_chance_eviction() {
        let (mem, file) = create_file("f");
        preallocate(&file, 3);
        let mut bpm = BufferPoolManager::new(1);

        bpm.read_page(&file, PageId::new(1)).unwrap();
        bpm.unpin_page(&file, PageId::new(1), false).unwrap();

        let state = &bpm.describe().frames[0];
        assert_eq!(state.pin_count, 0);
        assert!(state.ref_bit);

        bpm.read_page(&file, PageId::new(2)).unwrap();
        assert!(!bpm.is_cached(&file, PageId::new(1)));
        assert_eq!(bpm.frame_of(&file, PageId::new(2)), Some(FrameId::new(0)));

        // Page 1 was clean: no write-back.
        assert_eq!(mem.io_counts().writes, 0);
        assert_eq!(bpm.stats().evictions, 1);
        bpm.assert_consistent();
    }

    #[test]
    fn test_dirty_victim_is_written_back() {
        let (mem, file) = create_file("f");
        let mut bpm = BufferPoolManager::new(1);

        let (pid0, page) = bpm.alloc_page(&file).unwrap();
        page.data_mut()[0] = 0x42;
        bpm.unpin_page(&file, pid0, true).unwrap();

        let (pid1, _) = bpm.alloc_page(&file).unwrap();
        assert_ne!(pid0, pid1);

        assert_eq!(mem.written_pages(), vec![pid0]);
        assert_eq!(mem.stored_page(pid0).unwrap().data()[0], 0x42);
        bpm.assert_consistent();
    }

    #[test]
    fn test_unpin_dirty_false_does_not_clear_dirty() {
        let (_mem, file) = create_file("f");
        let mut bpm = BufferPoolManager::new(2);

        let (pid, _) = bpm.alloc_page(&file).unwrap();
        bpm.read_page(&file, pid).unwrap();
        bpm.unpin_page(&file, pid, true).unwrap();
        bpm.unpin_page(&file, pid, false).unwrap();

        assert!(bpm.describe().frames[0].dirty);
    }

    #[test]
    fn test_unpin_errors() {
        let (_mem, file) = create_file("f");
        let mut bpm = BufferPoolManager::new(2);

        // Not cached: silently ignored.
        bpm.unpin_page(&file, PageId::new(9), true).unwrap();

        let (pid, _) = bpm.alloc_page(&file).unwrap();
        bpm.unpin_page(&file, pid, false).unwrap();
        match bpm.unpin_page(&file, pid, false) {
            Err(Error::NotPinned { page_id, frame_id, .. }) => {
                assert_eq!(page_id, pid);
                assert_eq!(frame_id, FrameId::new(0));
            }
            other => panic!("expected NotPinned, got {:?}", other),
        }
        assert_eq!(bpm.pin_count(&file, pid), Some(0));
    }

    #[test]
    fn test_read_missing_page_leaves_frame_empty() {
        let (_mem, file) = create_file("f");
        let mut bpm = BufferPoolManager::new(2);

        assert!(matches!(
            bpm.read_page(&file, PageId::new(7)),
            Err(Error::PageNotFound { .. })
        ));
        assert_eq!(bpm.describe().valid_frames, 0);
        bpm.assert_consistent();
    }

    #[test]
    fn test_flush_file_writes_dirty_and_drops_all() {
        let (mem, file) = create_file("f");
        let (_other_mem, other) = create_file("g");
        let mut bpm = BufferPoolManager::new(4);

        let (dirty, page) = bpm.alloc_page(&file).unwrap();
        page.data_mut()[0] = 1;
        bpm.unpin_page(&file, dirty, true).unwrap();
        let (clean, _) = bpm.alloc_page(&file).unwrap();
        bpm.unpin_page(&file, clean, false).unwrap();
        let (kept, _) = bpm.alloc_page(&other).unwrap();

        bpm.flush_file(&file).unwrap();

        assert_eq!(mem.written_pages(), vec![dirty]);
        assert!(!bpm.is_cached(&file, dirty));
        assert!(!bpm.is_cached(&file, clean));
        assert!(bpm.is_cached(&other, kept));
        assert_eq!(bpm.describe().valid_frames, 1);
        bpm.assert_consistent();
    }

    #[test]
    fn test_flush_file_stops_at_pinned_page() {
        let (mem, file) = create_file("f");
        let mut bpm = BufferPoolManager::new(3);

        // Frames 0, 1, 2 in order; the page in frame 1 stays pinned.
        let (p0, _) = bpm.alloc_page(&file).unwrap();
        let (p1, _) = bpm.alloc_page(&file).unwrap();
        let (p2, _) = bpm.alloc_page(&file).unwrap();
        bpm.unpin_page(&file, p0, true).unwrap();
        bpm.unpin_page(&file, p2, true).unwrap();

        match bpm.flush_file(&file) {
            Err(Error::PagePinned { page_id, frame_id, .. }) => {
                assert_eq!(page_id, p1);
                assert_eq!(frame_id, FrameId::new(1));
            }
            other => panic!("expected PagePinned, got {:?}", other),
        }

        // Frame 0 was flushed and cleared; frame 2 was not reached.
        assert!(!bpm.is_cached(&file, p0));
        assert!(bpm.is_cached(&file, p1));
        assert!(bpm.is_cached(&file, p2));
        assert_eq!(mem.written_pages(), vec![p0]);
        assert!(bpm.describe().frames[2].dirty);
        bpm.assert_consistent();
    }

    #[test]
    fn test_flush_file_detects_corrupt_state() {
        let (_mem, file) = create_file("f");
        let mut bpm = BufferPoolManager::new(2);
        let (pid, _) = bpm.alloc_page(&file).unwrap();
        bpm.unpin_page(&file, pid, false).unwrap();

        // Break the invariant behind the pool's back.
        bpm.descriptors[FrameId::new(0)].clear();

        assert!(matches!(
            bpm.flush_file(&file),
            Err(Error::CorruptState { frame_id, valid: false, .. }) if frame_id == FrameId::new(0)
        ));
    }

    #[test]
    fn test_dispose_page() {
        let (mem, file) = create_file("f");
        let mut bpm = BufferPoolManager::new(2);

        let (pid, _) = bpm.alloc_page(&file).unwrap();
        assert!(matches!(
            bpm.dispose_page(&file, pid),
            Err(Error::PagePinned { .. })
        ));
        // The file keeps the page when the pool refuses.
        assert!(mem.contains(pid));

        bpm.unpin_page(&file, pid, true).unwrap();
        bpm.dispose_page(&file, pid).unwrap();
        assert!(!bpm.is_cached(&file, pid));
        assert!(!mem.contains(pid));
        // Dirty content of a disposed page is never written.
        assert_eq!(mem.io_counts().writes, 0);
        bpm.assert_consistent();
    }

    #[test]
    fn test_dispose_uncached_page_still_deletes() {
        let (mem, file) = create_file("f");
        preallocate(&file, 1);
        let mut bpm = BufferPoolManager::new(2);

        bpm.dispose_page(&file, PageId::new(0)).unwrap();
        assert_eq!(mem.io_counts().deletions, 1);
    }

    #[test]
    fn test_describe_is_read_only() {
        let (_mem, file) = create_file("f");
        let mut bpm = BufferPoolManager::new(3);
        let (pid, _) = bpm.alloc_page(&file).unwrap();
        bpm.unpin_page(&file, pid, true).unwrap();

        let before = bpm.describe();
        let after = bpm.describe();
        assert_eq!(before, after);
        assert_eq!(before.valid_frames, 1);
        assert_eq!(before.frames.len(), 3);

        let frame = &before.frames[0];
        assert_eq!(frame.page_id, Some(pid));
        assert_eq!(frame.file.as_deref(), Some("f"));
        assert!(frame.dirty && frame.ref_bit);
        assert_eq!(frame.pin_count, 0);

        assert!(before.to_string().ends_with("Total valid frames: 1"));
    }

    #[test]
    fn test_shutdown_writes_every_dirty_page() {
        let (mem, file) = create_file("f");
        let mut bpm = BufferPoolManager::new(4);

        let mut dirty = vec![];
        for i in 0..4u8 {
            let (pid, page) = bpm.alloc_page(&file).unwrap();
            page.data_mut()[0] = i;
            bpm.unpin_page(&file, pid, i % 2 == 0).unwrap();
            if i % 2 == 0 {
                dirty.push(pid);
            }
        }

        bpm.shutdown().unwrap();

        let mut written = mem.written_pages();
        written.sort();
        assert_eq!(written, dirty);
    }

    #[test]
    fn test_drop_flushes_dirty_pages() {
        let (mem, file) = create_file("f");
        {
            let mut bpm = BufferPoolManager::new(2);
            let (pid, page) = bpm.alloc_page(&file).unwrap();
            page.data_mut()[0] = 0x77;
            bpm.unpin_page(&file, pid, true).unwrap();
        }
        assert_eq!(mem.stored_page(PageId::new(0)).unwrap().data()[0], 0x77);
    }

    #[test]
    fn test_shutdown_reports_closed_file() {
        let mut bpm = BufferPoolManager::new(2);
        let (keep_mem, keep) = create_file("keep");
        {
            let (_mem, gone) = create_file("gone");
            let (pid, _) = bpm.alloc_page(&gone).unwrap();
            bpm.unpin_page(&gone, pid, true).unwrap();
        }
        let (pid, _) = bpm.alloc_page(&keep).unwrap();
        bpm.unpin_page(&keep, pid, true).unwrap();

        assert!(matches!(bpm.shutdown(), Err(Error::FileClosed { .. })));
        // The other file was still written.
        assert_eq!(keep_mem.written_pages(), vec![pid]);
    }

    /// A file whose writes always fail, counting how often they are tried.
    struct FailingWrites {
        inner: MemFile,
        write_attempts: std::sync::atomic::AtomicU32,
    }

    impl PageFile for FailingWrites {
        fn filename(&self) -> &str {
            self.inner.filename()
        }

        fn read_page(&self, page_id: PageId) -> Result<Page> {
            self.inner.read_page(page_id)
        }

        fn write_page(&self, _page: &Page) -> Result<()> {
            self.write_attempts
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(std::io::Error::other("disk full").into())
        }

        fn allocate_page(&self) -> Result<Page> {
            self.inner.allocate_page()
        }

        fn delete_page(&self, page_id: PageId) -> Result<()> {
            self.inner.delete_page(page_id)
        }
    }

    #[test]
    fn test_failed_shutdown_is_not_retried_on_drop() {
        let failing = Arc::new(FailingWrites {
            inner: MemFile::new("full"),
            write_attempts: Default::default(),
        });
        let file: FileRef = failing.clone();

        let mut bpm = BufferPoolManager::new(2);
        let (pid, _) = bpm.alloc_page(&file).unwrap();
        bpm.unpin_page(&file, pid, true).unwrap();

        assert!(matches!(bpm.shutdown(), Err(Error::Io(_))));
        assert_eq!(
            failing
                .write_attempts
                .load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[test]
    fn test_hit_after_reopen_rebinds_frame() {
        let mut bpm = BufferPoolManager::new(1);
        let (first_mem, first) = create_file("t.db");
        let (pid, _) = bpm.alloc_page(&first).unwrap();
        bpm.unpin_page(&first, pid, false).unwrap();
        drop(first);
        drop(first_mem);

        // Same name, new handle: the cached frame is served and moves over.
        let (mem, reopened) = create_file("t.db");
        reopened.allocate_page().unwrap();
        let page = bpm.read_page(&reopened, pid).unwrap();
        page.data_mut()[0] = 0x99;
        bpm.unpin_page(&reopened, pid, true).unwrap();
        bpm.assert_consistent();

        // Forcing it out writes through the new handle.
        let (other, _) = bpm.alloc_page(&reopened).unwrap();
        bpm.unpin_page(&reopened, other, false).unwrap();
        assert_eq!(mem.stored_page(pid).unwrap().data()[0], 0x99);
    }

    #[test]
    fn test_same_name_open_twice_is_rejected() {
        let mut bpm = BufferPoolManager::new(2);
        let (_a_mem, a) = create_file("dup.db");
        let (_b_mem, b) = create_file("dup.db");

        let (pid, _) = bpm.alloc_page(&a).unwrap();
        assert!(matches!(
            bpm.read_page(&b, pid),
            Err(Error::DuplicateEntry { .. })
        ));
        assert!(matches!(
            bpm.unpin_page(&b, pid, true),
            Err(Error::DuplicateEntry { .. })
        ));
        // The real owner is unaffected.
        assert_eq!(bpm.pin_count(&a, pid), Some(1));
        bpm.unpin_page(&a, pid, false).unwrap();
    }

    #[test]
    fn test_evicting_dirty_page_of_closed_file_fails_cleanly() {
        let mut bpm = BufferPoolManager::new(1);
        {
            let (_mem, gone) = create_file("gone");
            let (pid, _) = bpm.alloc_page(&gone).unwrap();
            bpm.unpin_page(&gone, pid, true).unwrap();
        }

        let (_mem, file) = create_file("f");
        assert!(matches!(
            bpm.alloc_page(&file),
            Err(Error::FileClosed { .. })
        ));
        // The victim keeps its page.
        assert_eq!(bpm.describe().valid_frames, 1);
        assert!(bpm.describe().frames[0].dirty);
        bpm.assert_consistent();

        // Forget the unwritable page so dropping the pool stays quiet.
        bpm.descriptors[FrameId::new(0)].clear_dirty();
    }

    #[test]
    fn test_with_config() {
        assert!(BufferPoolManager::with_config(BufferPoolConfig::new(0)).is_err());
        let bpm = BufferPoolManager::with_config(BufferPoolConfig::default()).unwrap();
        assert_eq!(bpm.capacity(), crate::common::config::DEFAULT_POOL_SIZE);
    }

    #[test]
    #[should_panic(expected = "pool_size must be > 0")]
    fn test_zero_pool_size_panics() {
        BufferPoolManager::new(0);
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        #[derive(Debug, Clone)]
        enum Op {
            Read(u32),
            Alloc,
            Unpin(u32, bool),
            Flush,
            Dispose(u32),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                4 => (0u32..12).prop_map(Op::Read),
                2 => Just(Op::Alloc),
                4 => (0u32..12, any::<bool>()).prop_map(|(p, d)| Op::Unpin(p, d)),
                1 => Just(Op::Flush),
                1 => (0u32..12).prop_map(Op::Dispose),
            ]
        }

        proptest! {
            #[test]
            fn index_and_descriptors_stay_in_sync(ops in prop::collection::vec(op(), 1..80)) {
                let (mem, file) = create_file("p");
                preallocate(&file, 8);
                let mut bpm = BufferPoolManager::new(3);

                for op in ops {
                    let result = match op {
                        Op::Read(p) => bpm.read_page(&file, PageId::new(p)).map(|_| ()),
                        Op::Alloc => bpm.alloc_page(&file).map(|_| ()),
                        Op::Unpin(p, d) => bpm.unpin_page(&file, PageId::new(p), d),
                        Op::Flush => bpm.flush_file(&file),
                        Op::Dispose(p) => bpm.dispose_page(&file, PageId::new(p)),
                    };

                    if let Err(e) = result {
                        prop_assert!(matches!(
                            e,
                            Error::PoolExhausted
                                | Error::NotPinned { .. }
                                | Error::PagePinned { .. }
                                | Error::PageNotFound { .. }
                        ), "unexpected error {:?}", e);
                    }
                    bpm.assert_consistent();

                    // A pinned page is always cached.
                    for state in bpm.describe().frames {
                        if state.pin_count > 0 {
                            prop_assert!(state.valid);
                        }
                    }
                }

                // Everything still dirty reaches the file.
                let dirty = bpm.describe().frames.iter().filter(|f| f.dirty).count() as u64;
                let before = mem.io_counts().writes;
                bpm.shutdown().unwrap();
                prop_assert_eq!(mem.io_counts().writes, before + dirty);
            }
        }
    }
}
