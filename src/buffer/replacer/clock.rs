//! CLOCK (second-chance) replacement policy.

use crate::buffer::descriptor::DescriptorTable;
use crate::common::FrameId;

/// Clock hand sweeping the frames in a circle.
///
/// Each frame's reference bit buys it one extra pass of the hand: a
/// referenced frame has its bit cleared and is skipped, an unreferenced and
/// unpinned frame is taken. Invalid frames are taken as soon as the hand
/// reaches them.
///
/// The hand is owned by one pool and persists across calls, so consecutive
/// searches resume where the previous one stopped.
///
/// ```text
///            hand
///             │
///             ▼
///   ┌────┐ ┌────┐ ┌────┐ ┌────┐
///   │ F0 │ │ F1 │ │ F2 │ │ F3 │
///   │r=1 │ │r=0 │ │r=1 │ │r=0 │
///   │p=0 │ │p=2 │ │p=0 │ │p=0 │
///   └────┘ └────┘ └────┘ └────┘
/// ```
/// Starting from F0 the next advance looks at F1 (pinned, skipped), then F2
/// (referenced: bit cleared), then F3, which is the victim.
#[derive(Debug)]
pub struct ClockReplacer {
    /// Frame examined most recently.
    hand: usize,
    capacity: usize,
}

impl ClockReplacer {
    /// Create a replacer over `capacity` frames.
    ///
    /// The hand starts on the last frame, so the first advance examines
    /// frame 0.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        Self {
            hand: capacity - 1,
            capacity,
        }
    }

    /// Frame the hand currently points at.
    #[inline]
    pub fn hand(&self) -> FrameId {
        FrameId::new(self.hand)
    }

    fn advance(&mut self) -> FrameId {
        self.hand = (self.hand + 1) % self.capacity;
        FrameId::new(self.hand)
    }

    /// Find a frame that can receive a new page.
    ///
    /// Clears the reference bit of every referenced frame it passes. The
    /// returned frame is either invalid or valid, unpinned and unreferenced;
    /// in the second case the caller has to evict its page before reuse.
    ///
    /// Returns `None` if every frame is pinned.
    pub fn find_victim(&mut self, descriptors: &mut DescriptorTable) -> Option<FrameId> {
        debug_assert_eq!(descriptors.len(), self.capacity);

        // At least one unpinned frame means the sweep ends within two laps.
        if descriptors.all_pinned() {
            return None;
        }

        loop {
            let frame_id = self.advance();
            let desc = &mut descriptors[frame_id];

            if !desc.is_valid() {
                return Some(frame_id);
            }
            if desc.ref_bit() {
                desc.clear_ref_bit();
                continue;
            }
            if !desc.is_pinned() {
                return Some(frame_id);
            }
        }
    }
}
