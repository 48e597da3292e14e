//! Page - the fundamental 4KB unit of storage.
//!
//! A [`Page`] is the byte image of one on-disk page. It is the unit of I/O
//! between a [`PageFile`](crate::storage::PageFile) and the buffer pool.

use crate::common::config::PAGE_SIZE;
use crate::common::PageId;

use super::page_header::{PageHeader, PageType};

/// A page of data (4KB, 4KB-aligned).
///
/// The first [`PageHeader::SIZE`] bytes hold the header; [`Page::data`]
/// exposes the payload after it. The buffer pool never looks inside.
///
/// `Page` does not implement `Clone`: copying 4KB should be explicit, so
/// use [`Page::copy_from`].
///
/// # Example
/// ```
/// use bufmgr::{Page, PageId};
///
/// let mut page = Page::with_id(PageId::new(7));
/// page.data_mut()[0] = 0xFF;
/// assert_eq!(page.data()[0], 0xFF);
/// assert_eq!(page.page_id(), PageId::new(7));
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Payload bytes available after the header.
    pub const DATA_SIZE: usize = PAGE_SIZE - PageHeader::SIZE;

    /// Create a zeroed page with an invalid header.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Create a zeroed data page stamped with `page_id`.
    pub fn with_id(page_id: PageId) -> Self {
        let mut page = Self::new();
        page.set_header(&PageHeader::new(PageType::Data, page_id));
        page
    }

    /// The id embedded in the header.
    pub fn page_id(&self) -> PageId {
        self.header().page_id
    }

    /// Full page image, header included.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Payload after the header.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data[PageHeader::SIZE..]
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data[PageHeader::SIZE..]
    }

    /// Overwrite this page with the contents of `other`.
    pub fn copy_from(&mut self, other: &Page) {
        self.data.copy_from_slice(&other.data);
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data)
    }

    pub fn set_header(&mut self, header: &PageHeader) {
        header.write_to(&mut self.data);
    }

    /// Compute and store checksum in the header.
    ///
    /// Call this after all modifications to the page are complete.
    pub fn update_checksum(&mut self) {
        let checksum = PageHeader::compute_checksum(&self.data);
        self.data[PageHeader::OFFSET_CHECKSUM..PageHeader::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum.to_le_bytes());
    }

    pub fn verify_checksum(&self) -> bool {
        self.header().verify_checksum(&self.data)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header = self.header();
        f.debug_struct("Page")
            .field("page_id", &header.page_id)
            .field("page_type", &header.page_type)
            .finish_non_exhaustive()
    }
}
