//! Frame descriptors - per-frame bookkeeping.
//!
//! A [`FrameDescriptor`] records which page a frame holds plus the state the
//! replacer and the pool need:
//! - `valid`: the frame caches a real page
//! - `ref_bit`: set on every access, cleared by the clock hand
//! - `dirty`: in-memory image may differ from the file
//! - `pin_count`: active holders; pinned frames are never evicted

use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::{Arc, Weak};

use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::{FileRef, PageFile};

/// Non-owning reference from a frame to the file its page belongs to.
///
/// The name is kept alongside so the frame can still be unindexed (and
/// reported) after the file itself has been dropped.
#[derive(Clone)]
pub struct FileHandle {
    name: Arc<str>,
    file: Weak<dyn PageFile>,
}

impl FileHandle {
    pub fn new(file: &FileRef) -> Self {
        Self {
            name: Arc::from(file.filename()),
            file: Arc::downgrade(file),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this handle was taken from `file` itself, not just a file of
    /// the same name.
    pub fn refers_to(&self, file: &FileRef) -> bool {
        self.file.as_ptr() as *const () == Arc::as_ptr(file) as *const ()
    }

    /// Whether every owning handle to the file has been dropped.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.file.strong_count() == 0
    }

    /// Get the file back, if its owner still holds it.
    ///
    /// # Errors
    /// `Error::FileClosed` once every owning handle has been dropped.
    pub fn upgrade(&self) -> Result<FileRef> {
        self.file.upgrade().ok_or_else(|| Error::FileClosed {
            file: self.name.to_string(),
        })
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FileHandle").field(&self.name).finish()
    }
}

/// Metadata for one frame.
#[derive(Debug)]
pub struct FrameDescriptor {
    frame_id: FrameId,
    /// Owning file; `None` whenever the frame is invalid.
    file: Option<FileHandle>,
    page_id: PageId,
    valid: bool,
    ref_bit: bool,
    dirty: bool,
    pin_count: u32,
}

impl FrameDescriptor {
    /// Create the descriptor of an empty frame.
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            file: None,
            page_id: PageId::INVALID,
            valid: false,
            ref_bit: false,
            dirty: false,
            pin_count: 0,
        }
    }

    /// Mark the frame as holding `page_id` of `file`, pinned once.
    pub fn set(&mut self, file: &FileRef, page_id: PageId) {
        self.file = Some(FileHandle::new(file));
        self.page_id = page_id;
        self.valid = true;
        self.ref_bit = true;
        self.dirty = false;
        self.pin_count = 1;
    }

    /// Point a valid frame at another handle of the same file, keeping its
    /// page, pins and bits.
    pub fn rebind(&mut self, file: &FileRef) {
        debug_assert!(self.valid, "rebinding an empty frame");
        self.file = Some(FileHandle::new(file));
    }

    /// Return to the empty, unpinned state.
    pub fn clear(&mut self) {
        self.file = None;
        self.page_id = PageId::INVALID;
        self.valid = false;
        self.ref_bit = false;
        self.dirty = false;
        self.pin_count = 0;
    }

    /// Record a cache hit: pin once more and set the reference bit.
    pub fn touch(&mut self) -> u32 {
        self.ref_bit = true;
        self.pin_count += 1;
        self.pin_count
    }

    /// Drop one pin. Returns the new pin count, or `None` if the frame was
    /// not pinned (the count is left at zero).
    pub fn unpin(&mut self) -> Option<u32> {
        self.pin_count = self.pin_count.checked_sub(1)?;
        Some(self.pin_count)
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    #[inline]
    pub fn file(&self) -> Option<&FileHandle> {
        self.file.as_ref()
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[inline]
    pub fn ref_bit(&self) -> bool {
        self.ref_bit
    }

    #[inline]
    pub fn clear_ref_bit(&mut self) {
        self.ref_bit = false;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    /// A read-only copy of this descriptor's state.
    pub fn state(&self) -> FrameState {
        FrameState {
            frame_id: self.frame_id,
            file: self.file.as_ref().map(|f| f.name().to_string()),
            page_id: self.valid.then_some(self.page_id),
            valid: self.valid,
            dirty: self.dirty,
            ref_bit: self.ref_bit,
            pin_count: self.pin_count,
        }
    }

    /// The error reported when this frame is found in an inconsistent state.
    pub fn corrupt(&self) -> Error {
        Error::CorruptState {
            frame_id: self.frame_id,
            valid: self.valid,
            dirty: self.dirty,
            ref_bit: self.ref_bit,
        }
    }
}

/// One descriptor per frame, addressed by [`FrameId`].
///
/// All mutation goes through `&mut self[frame_id]`; descriptors are never
/// copied out and written back.
#[derive(Debug)]
pub struct DescriptorTable {
    descriptors: Vec<FrameDescriptor>,
}

impl DescriptorTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            descriptors: (0..capacity)
                .map(|i| FrameDescriptor::new(FrameId::new(i)))
                .collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Whether every frame has at least one pin.
    pub fn all_pinned(&self) -> bool {
        self.descriptors.iter().all(FrameDescriptor::is_pinned)
    }

    /// Descriptors in ascending frame order.
    pub fn iter(&self) -> impl Iterator<Item = &FrameDescriptor> {
        self.descriptors.iter()
    }
}

impl Index<FrameId> for DescriptorTable {
    type Output = FrameDescriptor;

    #[inline]
    fn index(&self, frame_id: FrameId) -> &FrameDescriptor {
        &self.descriptors[frame_id.index()]
    }
}

impl IndexMut<FrameId> for DescriptorTable {
    #[inline]
    fn index_mut(&mut self, frame_id: FrameId) -> &mut FrameDescriptor {
        &mut self.descriptors[frame_id.index()]
    }
}

/// Snapshot of one frame, as reported by
/// [`BufferPoolManager::describe`](crate::buffer::BufferPoolManager::describe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameState {
    pub frame_id: FrameId,
    pub file: Option<String>,
    pub page_id: Option<PageId>,
    pub valid: bool,
    pub dirty: bool,
    pub ref_bit: bool,
    pub pin_count: u32,
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.frame_id)?;
        if let (Some(file), Some(page_id)) = (&self.file, self.page_id) {
            write!(f, " file: {} {}", file, page_id)?;
        }
        write!(
            f,
            " valid: {} pin: {} dirty: {} ref: {}",
            self.valid, self.pin_count, self.dirty, self.ref_bit
        )
    }
}

/// Per-frame state of the whole pool plus the number of valid frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolDescription {
    pub frames: Vec<FrameState>,
    pub valid_frames: usize,
}

impl fmt::Display for PoolDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in &self.frames {
            writeln!(f, "{}", frame)?;
        }
        write!(f, "Total valid frames: {}", self.valid_frames)
    }
}
