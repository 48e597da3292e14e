//! bufmgr - a buffer pool manager with CLOCK page replacement.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            bufmgr                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        SharedBufferPool (buffer/)  [optional]           │   │
//! │  │        one mutex around the pool + PinnedPage guards     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │             BufferPoolManager (buffer/)                  │   │
//! │  │   ┌─────────────────────────────────────────────────┐   │   │
//! │  │   │  PageIndex → FrameStore + DescriptorTable       │   │   │
//! │  │   │  ClockReplacer (second chance)                  │   │   │
//! │  │   └─────────────────────────────────────────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │     PageFile trait: DiskFile | MemFile, Page + header    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Error, config)
//! - [`buffer`] - Buffer pool management and eviction
//! - [`storage`] - Page files and page format
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use bufmgr::{BufferPoolManager, DiskFile, FileRef};
//!
//! let file: FileRef = Arc::new(DiskFile::open_or_create("my_table.db").unwrap());
//! let mut bpm = BufferPoolManager::new(64);
//!
//! let (page_id, page) = bpm.alloc_page(&file).unwrap();
//! page.data_mut()[..5].copy_from_slice(b"hello");
//! bpm.unpin_page(&file, page_id, true).unwrap();
//!
//! bpm.shutdown().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{BufferPoolConfig, Error, FrameId, PageId, Result};

pub use buffer::{BufferPoolManager, BufferPoolStats, PinnedPage, PoolDescription, SharedBufferPool};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::{DiskFile, FileRef, MemFile, PageFile};
