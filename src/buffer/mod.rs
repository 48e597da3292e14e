//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache layer between page files and the
//! code that reads and writes pages. It manages a fixed pool of frames,
//! each holding at most one page.
//!
//! # Components
//! - [`BufferPoolManager`] - The page cache itself
//! - [`FrameStore`] - The frames' page images
//! - [`DescriptorTable`] - Per-frame valid/ref/dirty/pin state
//! - [`PageIndex`] - `(file, page)` to frame lookup
//! - [`replacer`] - CLOCK eviction policy
//! - [`SharedBufferPool`] / [`PinnedPage`] - Locked handle and RAII pins
//! - [`BufferPoolStats`] - Performance counters

mod buffer_pool_manager;
mod descriptor;
mod frame;
mod page_guard;
mod page_index;
pub mod replacer;
mod shared_pool;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use descriptor::{DescriptorTable, FileHandle, FrameDescriptor, FrameState, PoolDescription};
pub use frame::FrameStore;
pub use page_guard::PinnedPage;
pub use page_index::PageIndex;
pub use shared_pool::SharedBufferPool;
pub use stats::BufferPoolStats;
