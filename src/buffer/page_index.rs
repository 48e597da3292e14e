//! Page index - maps cached pages to the frames holding them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{Error, FrameId, PageId, Result};

/// Hash index from `(file name, page id)` to frame.
///
/// Entries are grouped per file so that lookups can borrow the file name
/// as `&str` and [`PageIndex::frames_of`] doesn't have to scan other files.
///
/// The index is kept in lock-step with the descriptor table: a frame is
/// indexed exactly while its descriptor is valid.
#[derive(Debug, Default)]
pub struct PageIndex {
    files: HashMap<Arc<str>, HashMap<PageId, FrameId>>,
    len: usize,
}

impl PageIndex {
    /// Create an index sized for a pool of `capacity` frames.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            files: HashMap::with_capacity(capacity.min(16)),
            len: 0,
        }
    }

    /// Frame holding `page_id` of `file`, if cached.
    pub fn lookup(&self, file: &str, page_id: PageId) -> Option<FrameId> {
        self.files.get(file)?.get(&page_id).copied()
    }

    /// Add an entry.
    ///
    /// # Errors
    /// `Error::DuplicateEntry` if the page is already indexed; the existing
    /// entry is left untouched.
    pub fn insert(&mut self, file: &str, page_id: PageId, frame_id: FrameId) -> Result<()> {
        if self.lookup(file, page_id).is_some() {
            return Err(Error::DuplicateEntry {
                file: file.to_string(),
                page_id,
            });
        }

        match self.files.get_mut(file) {
            Some(pages) => {
                pages.insert(page_id, frame_id);
            }
            None => {
                self.files
                    .insert(Arc::from(file), HashMap::from([(page_id, frame_id)]));
            }
        }
        self.len += 1;
        Ok(())
    }

    /// Remove an entry, returning the frame it pointed to.
    ///
    /// Returns `None` if the page was not indexed; callers decide whether
    /// that matters.
    pub fn remove(&mut self, file: &str, page_id: PageId) -> Option<FrameId> {
        let pages = self.files.get_mut(file)?;
        let frame_id = pages.remove(&page_id)?;
        if pages.is_empty() {
            self.files.remove(file);
        }
        self.len -= 1;
        Some(frame_id)
    }

    /// Every cached page of `file`, in ascending frame order.
    pub fn frames_of(&self, file: &str) -> Vec<(PageId, FrameId)> {
        let mut entries: Vec<(PageId, FrameId)> = self
            .files
            .get(file)
            .map(|pages| pages.iter().map(|(&pid, &fid)| (pid, fid)).collect())
            .unwrap_or_default();
        entries.sort_by_key(|&(_, frame_id)| frame_id);
        entries
    }

    /// Number of indexed pages across all files.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut index = PageIndex::default();
        index.insert("a", PageId::new(1), FrameId::new(0)).unwrap();
        index.insert("b", PageId::new(1), FrameId::new(1)).unwrap();

        assert_eq!(index.lookup("a", PageId::new(1)), Some(FrameId::new(0)));
        assert_eq!(index.lookup("b", PageId::new(1)), Some(FrameId::new(1)));
        assert_eq!(index.lookup("a", PageId::new(2)), None);
        assert_eq!(index.lookup("c", PageId::new(1)), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let mut index = PageIndex::default();
        index.insert("a", PageId::new(1), FrameId::new(0)).unwrap();

        let result = index.insert("a", PageId::new(1), FrameId::new(5));
        assert!(matches!(result, Err(Error::DuplicateEntry { .. })));
        assert_eq!(index.lookup("a", PageId::new(1)), Some(FrameId::new(0)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut index = PageIndex::default();
        index.insert("a", PageId::new(1), FrameId::new(3)).unwrap();

        assert_eq!(index.remove("a", PageId::new(1)), Some(FrameId::new(3)));
        assert_eq!(index.remove("a", PageId::new(1)), None);
        assert_eq!(index.remove("zzz", PageId::new(1)), None);
        assert!(index.is_empty());
        assert!(index.files.is_empty());
    }

    #[test]
    fn test_frames_of_sorted_by_frame() {
        let mut index = PageIndex::default();
        index.insert("a", PageId::new(10), FrameId::new(4)).unwrap();
        index.insert("a", PageId::new(11), FrameId::new(0)).unwrap();
        index.insert("b", PageId::new(12), FrameId::new(1)).unwrap();
        index.insert("a", PageId::new(5), FrameId::new(2)).unwrap();

        assert_eq!(
            index.frames_of("a"),
            vec![
                (PageId::new(11), FrameId::new(0)),
                (PageId::new(5), FrameId::new(2)),
                (PageId::new(10), FrameId::new(4)),
            ]
        );
        assert!(index.frames_of("nope").is_empty());
    }
}
