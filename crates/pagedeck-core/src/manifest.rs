//! The page manifest: the ordered, mutable working state of a session.
//!
//! Each entry points back at a source document by id plus an original page
//! index. Those two fields never change after creation; user interaction
//! only moves entries, flags them, or drops them. Manifest order is the
//! single source of truth for export order.

use crate::raster::RasterImage;
use crate::source::SourceId;
use serde::Serialize;

/// Identity of one manifest entry, independent of position and source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PageId(u64);

/// One page of the working document.
#[derive(Debug, Clone)]
pub struct PageDescriptor {
    id: PageId,
    source: SourceId,
    original_index: u32,
    thumbnail: Option<RasterImage>,
    removed: bool,
    selected: bool,
}

impl PageDescriptor {
    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    /// 0-based index into the source document. Immutable.
    pub fn original_index(&self) -> u32 {
        self.original_index
    }

    pub fn thumbnail(&self) -> Option<&RasterImage> {
        self.thumbnail.as_ref()
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

/// Ordered collection of page descriptors.
#[derive(Debug, Default)]
pub struct PageManifest {
    next_id: u64,
    entries: Vec<PageDescriptor>,
}

impl PageManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor for `(source, original_index)` and return its id.
    /// New pages arrive retained and selected.
    pub fn append(
        &mut self,
        source: SourceId,
        original_index: u32,
        thumbnail: Option<RasterImage>,
    ) -> PageId {
        let id = PageId(self.next_id);
        self.next_id += 1;
        self.entries.push(PageDescriptor {
            id,
            source,
            original_index,
            thumbnail,
            removed: false,
            selected: true,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PageDescriptor] {
        &self.entries
    }

    pub fn get(&self, id: PageId) -> Option<&PageDescriptor> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn position(&self, id: PageId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Move the entry at `from` so it lands at `to`, shifting the entries
    /// in between (drag-and-drop semantics).
    pub fn move_page(&mut self, from: usize, to: usize) -> bool {
        if from >= self.entries.len() || to >= self.entries.len() {
            return false;
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        true
    }

    /// Flag an entry for removal. The entry stays in place so the operation
    /// can be undone without losing its position or thumbnail.
    pub fn mark_removed(&mut self, id: PageId) -> bool {
        self.set_removed(id, true)
    }

    pub fn restore(&mut self, id: PageId) -> bool {
        self.set_removed(id, false)
    }

    fn set_removed(&mut self, id: PageId, removed: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.removed = removed;
                true
            }
            None => false,
        }
    }

    pub fn set_selected(&mut self, id: PageId, selected: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.selected = selected;
                true
            }
            None => false,
        }
    }

    pub fn toggle_selected(&mut self, id: PageId) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.selected = !entry.selected;
                true
            }
            None => false,
        }
    }

    /// Apply a selection computed elsewhere (e.g. a parsed numeric range of
    /// original page indices).
    pub fn select_original_indices(&mut self, indices: &[u32]) {
        for entry in &mut self.entries {
            entry.selected = indices.contains(&entry.original_index);
        }
    }

    /// Entries that survive a delete/merge export, in manifest order.
    pub fn retained(&self) -> impl Iterator<Item = &PageDescriptor> {
        self.entries.iter().filter(|e| !e.removed)
    }

    /// Entries that participate in a split export, in manifest order.
    pub fn selected(&self) -> impl Iterator<Item = &PageDescriptor> {
        self.entries.iter().filter(|e| !e.removed && e.selected)
    }

    /// Drop every descriptor that references `source`.
    pub fn drop_source(&mut self, source: SourceId) {
        self.entries.retain(|e| e.source != source);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
