//! Frame store - the pool's page-sized memory slots.

use crate::common::FrameId;
use crate::storage::page::Page;

/// Fixed array of frames, indexed `0..N` by [`FrameId`].
///
/// The store knows nothing about which page a frame holds; that lives in the
/// descriptor table. Frames are allocated once and never reallocated, so a
/// frame id stays valid for the lifetime of the pool.
pub struct FrameStore {
    frames: Vec<Page>,
}

impl FrameStore {
    /// Allocate `capacity` zeroed frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: (0..capacity).map(|_| Page::new()).collect(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn page(&self, frame_id: FrameId) -> &Page {
        &self.frames[frame_id.index()]
    }

    #[inline]
    pub fn page_mut(&mut self, frame_id: FrameId) -> &mut Page {
        &mut self.frames[frame_id.index()]
    }

    /// Replace the contents of a frame with `page`.
    pub fn install(&mut self, frame_id: FrameId, page: Page) {
        self.frames[frame_id.index()] = page;
    }
}
