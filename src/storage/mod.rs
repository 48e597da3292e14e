//! Storage layer - page files and page formats.
//!
//! This module holds the file side of the buffer pool:
//! - [`PageFile`] - The file interface the buffer pool calls into
//! - [`DiskFile`] - Pages stored in one OS file
//! - [`MemFile`] - Pages kept in memory, with I/O counters
//! - [`page`] - Page types and layouts

mod disk_file;
mod file;
mod mem_file;
pub mod page;

pub use disk_file::DiskFile;
pub use file::{FileRef, PageFile};
pub use mem_file::{FileIoCounts, MemFile};
