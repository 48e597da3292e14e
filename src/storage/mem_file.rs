//! In-memory page file.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;
use crate::storage::PageFile;

/// Number of calls a [`MemFile`] has served, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileIoCounts {
    pub reads: u64,
    pub writes: u64,
    pub allocations: u64,
    pub deletions: u64,
}

/// A page file kept entirely in memory.
///
/// Besides storing pages it records every call it receives, which makes it
/// the file of choice for observing what the buffer pool writes back and
/// when.
///
/// # Example
/// ```
/// use bufmgr::storage::{MemFile, PageFile};
///
/// let file = MemFile::new("scratch");
/// let page = file.allocate_page().unwrap();
/// file.write_page(&page).unwrap();
/// assert_eq!(file.io_counts().writes, 1);
/// ```
pub struct MemFile {
    name: String,
    state: Mutex<MemFileState>,
}

#[derive(Default)]
struct MemFileState {
    pages: HashMap<PageId, Page>,
    next_page_id: u32,
    counts: FileIoCounts,
    /// Page ids in the order `write_page` received them.
    write_log: Vec<PageId>,
}

impl MemFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(MemFileState::default()),
        }
    }

    pub fn io_counts(&self) -> FileIoCounts {
        self.state.lock().counts
    }

    /// Ids of every page written back so far, oldest first.
    pub fn written_pages(&self) -> Vec<PageId> {
        self.state.lock().write_log.clone()
    }

    /// A copy of the stored image of `page_id`, if the page exists.
    pub fn stored_page(&self, page_id: PageId) -> Option<Page> {
        let state = self.state.lock();
        state.pages.get(&page_id).map(|stored| {
            let mut page = Page::new();
            page.copy_from(stored);
            page
        })
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.state.lock().pages.contains_key(&page_id)
    }

    pub fn page_count(&self) -> usize {
        self.state.lock().pages.len()
    }

    fn not_found(&self, page_id: PageId) -> Error {
        Error::PageNotFound {
            file: self.name.clone(),
            page_id,
        }
    }
}

impl PageFile for MemFile {
    fn filename(&self) -> &str {
        &self.name
    }

    fn read_page(&self, page_id: PageId) -> Result<Page> {
        let mut state = self.state.lock();
        let stored = state.pages.get(&page_id).ok_or_else(|| self.not_found(page_id))?;

        let mut page = Page::new();
        page.copy_from(stored);
        state.counts.reads += 1;
        Ok(page)
    }

    fn write_page(&self, page: &Page) -> Result<()> {
        let page_id = page.page_id();
        let mut state = self.state.lock();
        let stored = state
            .pages
            .get_mut(&page_id)
            .ok_or_else(|| self.not_found(page_id))?;

        stored.copy_from(page);
        state.counts.writes += 1;
        state.write_log.push(page_id);
        Ok(())
    }

    fn allocate_page(&self) -> Result<Page> {
        let mut state = self.state.lock();
        let page_id = PageId::new(state.next_page_id);
        state.next_page_id += 1;

        state.pages.insert(page_id, Page::with_id(page_id));
        state.counts.allocations += 1;
        Ok(Page::with_id(page_id))
    }

    fn delete_page(&self, page_id: PageId) -> Result<()> {
        let mut state = self.state.lock();
        state
            .pages
            .remove(&page_id)
            .ok_or_else(|| self.not_found(page_id))?;
        state.counts.deletions += 1;
        Ok(())
    }
}
