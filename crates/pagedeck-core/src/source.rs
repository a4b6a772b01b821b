//! Source documents and the keyed store that owns them.
//!
//! Manifest entries refer to documents by `SourceId` rather than holding
//! references, so descriptors and documents have independent lifecycles and
//! a document can be dropped without dangling pointers.

use crate::error::PageDeckError;
use crate::validate::{self, DocumentInfo};
use serde::Serialize;
use std::collections::BTreeMap;

/// Lookup key for a source document within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SourceId(u64);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "src{:04x}", self.0)
    }
}

/// An uploaded file, held immutably for the duration of the session.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    id: SourceId,
    name: String,
    bytes: Vec<u8>,
    info: DocumentInfo,
}

impl SourceDocument {
    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The original upload, never mutated.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn page_count(&self) -> u32 {
        self.info.page_count
    }

    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }
}

/// Keyed store of uploaded documents, owned by one workflow session.
#[derive(Debug, Default)]
pub struct SourceStore {
    next_id: u64,
    entries: BTreeMap<SourceId, SourceDocument>,
}

impl SourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and admit an upload. Rejects anything that does not parse
    /// as a PDF with at least one page.
    pub fn insert(&mut self, name: &str, bytes: Vec<u8>) -> Result<SourceId, PageDeckError> {
        let info = validate::inspect(&bytes)?;

        let id = SourceId(self.next_id);
        self.next_id += 1;

        tracing::debug!(source = %id, name, pages = info.page_count, "source admitted");

        self.entries.insert(
            id,
            SourceDocument {
                id,
                name: name.to_string(),
                bytes,
                info,
            },
        );
        Ok(id)
    }

    pub fn get(&self, id: SourceId) -> Option<&SourceDocument> {
        self.entries.get(&id)
    }

    pub fn remove(&mut self, id: SourceId) -> Option<SourceDocument> {
        self.entries.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceDocument> {
        self.entries.values()
    }

    /// Combined size of all held originals.
    pub fn total_bytes(&self) -> usize {
        self.entries.values().map(|d| d.bytes.len()).sum()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::create_test_pdf;

    #[test]
    fn test_insert_validates() {
        let mut store = SourceStore::new();
        assert!(store.insert("bad.pdf", b"not a pdf".to_vec()).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut store = SourceStore::new();
        let id = store
            .insert("a.pdf", create_test_pdf(3, "A"))
            .unwrap();

        let doc = store.get(id).unwrap();
        assert_eq!(doc.name(), "a.pdf");
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.byte_size(), doc.bytes().len());
    }

    #[test]
    fn test_ids_are_unique_and_stable() {
        let mut store = SourceStore::new();
        let a = store.insert("a.pdf", create_test_pdf(1, "A")).unwrap();
        let b = store.insert("b.pdf", create_test_pdf(1, "B")).unwrap();
        assert_ne!(a, b);

        store.remove(a);
        let c = store.insert("c.pdf", create_test_pdf(1, "C")).unwrap();
        // Removing a document never recycles its key.
        assert_ne!(c, a);
    }

    #[test]
    fn test_total_bytes() {
        let mut store = SourceStore::new();
        let pdf = create_test_pdf(1, "A");
        let expected = pdf.len();
        store.insert("a.pdf", pdf).unwrap();
        assert_eq!(store.total_bytes(), expected);
    }
}
