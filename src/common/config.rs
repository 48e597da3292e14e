//! Configuration for the buffer pool.

use crate::common::{Error, Result};

/// Size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems, so a frame maps onto exactly
/// one memory page and pages can be written with aligned I/O.
pub const PAGE_SIZE: usize = 4096;

/// Number of frames used when no explicit pool size is given.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Maximum number of pages with u32 PageId (the last value is reserved).
pub const MAX_PAGES: u64 = u32::MAX as u64;

/// Construction parameters for a [`BufferPoolManager`].
///
/// [`BufferPoolManager`]: crate::buffer::BufferPoolManager
///
/// # Example
/// ```
/// use bufmgr::BufferPoolConfig;
///
/// let config = BufferPoolConfig::new(16);
/// assert!(config.validate().is_ok());
/// assert!(BufferPoolConfig::new(0).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub pool_size: usize,
}

impl BufferPoolConfig {
    pub fn new(pool_size: usize) -> Self {
        Self { pool_size }
    }

    /// Check that the configuration describes a usable pool.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::InvalidConfig(
                "pool_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}
