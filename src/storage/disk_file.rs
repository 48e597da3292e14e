//! Disk-backed page file.
//!
//! The [`DiskFile`] handles all direct file operations:
//! - Reading and writing pages
//! - Allocating new pages, reusing deleted ones first
//! - Checksumming every page it writes

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;
use tracing::debug;

use crate::common::config::{MAX_PAGES, PAGE_SIZE};
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};
use crate::storage::PageFile;

/// A page file stored as a single OS file.
///
/// # File Layout
/// Pages are laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Deleted pages stay in place with a [`PageType::Free`] header and are
/// handed out again by [`PageFile::allocate_page`] before the file grows.
///
/// # Durability
/// All writes are followed by `fsync()`.
pub struct DiskFile {
    name: String,
    inner: Mutex<DiskFileInner>,
}

struct DiskFileInner {
    file: File,
    /// Number of page slots in the file, live or free.
    page_count: u32,
    free_pages: BTreeSet<PageId>,
}

impl DiskFile {
    /// Create a new page file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;

        Ok(Self::from_parts(path.as_ref(), file, 0, BTreeSet::new()))
    }

    /// Open an existing page file and rebuild its free list.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        let page_count = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;

        let mut free_pages = BTreeSet::new();
        let mut header = [0u8; PageHeader::SIZE];
        for id in 0..page_count {
            let page_id = PageId::new(id);
            file.seek(SeekFrom::Start(page_id.offset(PAGE_SIZE)))?;
            file.read_exact(&mut header)?;
            if PageHeader::from_bytes(&header).page_type == PageType::Free {
                free_pages.insert(page_id);
            }
        }

        debug!(
            path = %path.as_ref().display(),
            page_count,
            free = free_pages.len(),
            "opened page file"
        );
        Ok(Self::from_parts(path.as_ref(), file, page_count, free_pages))
    }

    /// Open an existing page file, or create it if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    fn from_parts(path: &Path, file: File, page_count: u32, free_pages: BTreeSet<PageId>) -> Self {
        Self {
            name: path.display().to_string(),
            inner: Mutex::new(DiskFileInner {
                file,
                page_count,
                free_pages,
            }),
        }
    }

    /// Number of page slots in the file, including free ones.
    pub fn page_count(&self) -> u32 {
        self.inner.lock().page_count
    }

    /// Number of pages currently in use.
    pub fn live_page_count(&self) -> u32 {
        let inner = self.inner.lock();
        inner.page_count - inner.free_pages.len() as u32
    }

    /// Get the total size of the file in bytes.
    pub fn file_size(&self) -> u64 {
        (self.page_count() as u64) * (PAGE_SIZE as u64)
    }

    fn not_found(&self, page_id: PageId) -> Error {
        Error::PageNotFound {
            file: self.name.clone(),
            page_id,
        }
    }
}

impl DiskFileInner {
    fn is_live(&self, page_id: PageId) -> bool {
        page_id.0 < self.page_count && !self.free_pages.contains(&page_id)
    }

    /// Stamp the checksum and write `page` into slot `page_id`.
    fn write_slot(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        let mut image = Page::new();
        image.copy_from(page);
        image.update_checksum();

        self.file.seek(SeekFrom::Start(page_id.offset(PAGE_SIZE)))?;
        self.file.write_all(image.as_slice())?;
        self.file.sync_all()?;
        Ok(())
    }
}

impl PageFile for DiskFile {
    fn filename(&self) -> &str {
        &self.name
    }

    fn read_page(&self, page_id: PageId) -> Result<Page> {
        let mut inner = self.inner.lock();
        if !inner.is_live(page_id) {
            return Err(self.not_found(page_id));
        }

        inner.file.seek(SeekFrom::Start(page_id.offset(PAGE_SIZE)))?;
        let mut page = Page::new();
        inner.file.read_exact(page.as_mut_slice())?;

        if !page.verify_checksum() {
            return Err(Error::ChecksumMismatch { page_id });
        }
        if page.page_id() != page_id {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("slot {} holds {}", page_id, page.page_id()),
            )
            .into());
        }
        Ok(page)
    }

    fn write_page(&self, page: &Page) -> Result<()> {
        let page_id = page.page_id();
        let mut inner = self.inner.lock();
        if !inner.is_live(page_id) {
            return Err(self.not_found(page_id));
        }
        inner.write_slot(page_id, page)
    }

    fn allocate_page(&self) -> Result<Page> {
        let mut inner = self.inner.lock();

        let page_id = match inner.free_pages.pop_first() {
            Some(page_id) => page_id,
            None => {
                if inner.page_count as u64 >= MAX_PAGES {
                    return Err(std::io::Error::other("page id space exhausted").into());
                }
                PageId::new(inner.page_count)
            }
        };

        let page = Page::with_id(page_id);
        if let Err(e) = inner.write_slot(page_id, &page) {
            if page_id.0 < inner.page_count {
                inner.free_pages.insert(page_id);
            }
            return Err(e);
        }
        if page_id.0 == inner.page_count {
            inner.page_count += 1;
        }

        Ok(page)
    }

    fn delete_page(&self, page_id: PageId) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.is_live(page_id) {
            return Err(self.not_found(page_id));
        }

        let mut tombstone = Page::new();
        tombstone.set_header(&PageHeader::new(PageType::Free, page_id));
        inner.write_slot(page_id, &tombstone)?;
        inner.free_pages.insert(page_id);
        Ok(())
    }
}
