//! Eviction policy.
//!
//! - [`ClockReplacer`] - CLOCK (second chance), an approximation of LRU
//!   with one reference bit per frame and O(1) amortized cost per search

mod clock;

pub use clock::ClockReplacer;
