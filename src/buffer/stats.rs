//! Buffer pool statistics tracking.

use std::fmt;

/// Counters maintained by the buffer pool.
///
/// The pool mutates them through `&mut self`, so they are plain integers;
/// [`BufferPoolManager::stats`](crate::buffer::BufferPoolManager::stats)
/// hands out a copy.
///
/// # Example
/// ```
/// use bufmgr::BufferPoolStats;
///
/// let stats = BufferPoolStats {
///     cache_hits: 3,
///     cache_misses: 1,
///     ..Default::default()
/// };
/// assert_eq!(stats.hit_rate(), 0.75);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferPoolStats {
    /// Requests served from a cached frame.
    pub cache_hits: u64,
    /// Requests that had to read the page from its file.
    pub cache_misses: u64,
    /// Valid frames reclaimed by the replacer.
    pub evictions: u64,
    /// Pages read from files.
    pub pages_read: u64,
    /// Pages written back to files.
    pub pages_written: u64,
    /// Pages created through the pool.
    pub pages_allocated: u64,
    /// Pages deleted through the pool.
    pub pages_disposed: u64,
}

impl BufferPoolStats {
    /// Calculate cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for BufferPoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ hits: {}, misses: {}, evictions: {}, reads: {}, writes: {}, hit_rate: {:.2}% }}",
            self.cache_hits,
            self.cache_misses,
            self.evictions,
            self.pages_read,
            self.pages_written,
            self.hit_rate() * 100.0
        )
    }
}
