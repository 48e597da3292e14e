//! The file collaborator consumed by the buffer pool.

use std::sync::Arc;

use crate::common::{PageId, Result};
use crate::storage::page::Page;

/// A file of pages that the buffer pool reads from and writes back to.
///
/// The pool only ever calls these five methods and never interprets the
/// file's byte format. Methods take `&self`; implementations serialize
/// their own I/O internally.
pub trait PageFile: Send + Sync {
    /// Identity of the file. Used only as a comparison key.
    fn filename(&self) -> &str;

    /// Read the page with the given id.
    ///
    /// # Errors
    /// `Error::PageNotFound` if the file has no such page.
    fn read_page(&self, page_id: PageId) -> Result<Page>;

    /// Write `page` back at the id embedded in its header.
    fn write_page(&self, page: &Page) -> Result<()>;

    /// Allocate a fresh page and return its (zeroed) image.
    fn allocate_page(&self) -> Result<Page>;

    /// Remove a page's storage from the file.
    fn delete_page(&self, page_id: PageId) -> Result<()>;
}

/// Owning handle to a file, as handed to the buffer pool.
///
/// The pool only keeps `Weak` copies of it; the caller owns the file.
pub type FileRef = Arc<dyn PageFile>;
