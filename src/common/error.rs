//! Error types for the buffer pool.

use thiserror::Error;

use crate::common::{FrameId, PageId};

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the buffer pool and its files.
///
/// Every variant is a caller-visible, non-retriable condition. The pool never
/// retries on its own.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Every frame is pinned, so no victim can be chosen.
    #[error("buffer pool exhausted: every frame is pinned")]
    PoolExhausted,

    /// Attempted to unpin a page whose pin count is already zero.
    ///
    /// This indicates a bug - unpinning should match pinning.
    #[error("{page_id} of file '{file}' in {frame_id} is not pinned")]
    NotPinned {
        file: String,
        page_id: PageId,
        frame_id: FrameId,
    },

    /// Flush or dispose targeted a page that is still pinned.
    #[error("{page_id} of file '{file}' in {frame_id} is pinned")]
    PagePinned {
        file: String,
        page_id: PageId,
        frame_id: FrameId,
    },

    /// An indexed frame was found marked invalid.
    ///
    /// Means the page index and the descriptor table disagree.
    #[error("corrupt buffer state in {frame_id} (valid: {valid}, dirty: {dirty}, ref: {ref_bit})")]
    CorruptState {
        frame_id: FrameId,
        valid: bool,
        dirty: bool,
        ref_bit: bool,
    },

    /// Requested page does not exist in the file.
    #[error("{page_id} not found in file '{file}'")]
    PageNotFound { file: String, page_id: PageId },

    /// The page index already holds an entry for this page.
    #[error("{page_id} of file '{file}' is already indexed")]
    DuplicateEntry { file: String, page_id: PageId },

    /// A frame refers to a file that has already been dropped.
    #[error("file '{file}' was closed while the buffer pool still referenced it")]
    FileClosed { file: String },

    /// Stored checksum does not match the page contents.
    #[error("checksum mismatch on {page_id}")]
    ChecksumMismatch { page_id: PageId },

    /// Rejected buffer pool configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
