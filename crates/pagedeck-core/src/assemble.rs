//! Selective re-assembly of an output document from manifest state.
//!
//! The assembler reads original bytes from the source store, copies only the
//! requested pages, and composes them in manifest order. Each source
//! document is parsed at most once per export regardless of how many of its
//! pages participate.

use crate::adapter::{self, DocumentHandle, PageHandle};
use crate::error::PageDeckError;
use crate::source::{SourceId, SourceStore};
use std::collections::{BTreeMap, VecDeque};

/// A finished export, ready for download.
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub bytes: Vec<u8>,
    pub file_name: String,
    /// Combined size of the contributing originals.
    pub original_size: usize,
    pub final_size: usize,
}

impl ExportResult {
    /// Size reduction relative to the originals, negative when the output
    /// grew.
    pub fn savings_percent(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        (1.0 - self.final_size as f64 / self.original_size as f64) * 100.0
    }
}

/// Derive an output file name from the first input's name.
pub fn output_name(prefix: &str, original: &str) -> String {
    let base = original
        .strip_suffix(".pdf")
        .or_else(|| original.strip_suffix(".PDF"))
        .unwrap_or(original);
    format!("{}_{}.pdf", prefix, base)
}

/// Assemble the pages `(source, original_index)` into one document, in the
/// order given.
pub fn assemble(
    store: &SourceStore,
    pages: &[(SourceId, u32)],
) -> Result<Vec<u8>, PageDeckError> {
    if pages.is_empty() {
        return Err(PageDeckError::EmptyDocument);
    }

    // Per-source index lists, still in manifest order within each source.
    let mut wanted: BTreeMap<SourceId, Vec<u32>> = BTreeMap::new();
    for &(source, index) in pages {
        wanted.entry(source).or_default().push(index);
    }

    // One parse and one copy pass per source.
    let mut queues: BTreeMap<SourceId, VecDeque<PageHandle>> = BTreeMap::new();
    for (source, indices) in &wanted {
        let doc = store.get(*source).ok_or_else(|| {
            PageDeckError::Assembly(format!("unknown source document {}", source))
        })?;
        let handle = DocumentHandle::load(doc.bytes())?;
        queues.insert(*source, handle.copy_pages(indices)?.into());
    }

    // Interleave back into global manifest order.
    let handles: Vec<PageHandle> = pages
        .iter()
        .map(|(source, _)| {
            queues
                .get_mut(source)
                .and_then(|queue| queue.pop_front())
                .ok_or_else(|| PageDeckError::Assembly("page queue exhausted".into()))
        })
        .collect::<Result<_, _>>()?;

    tracing::debug!(pages = handles.len(), sources = wanted.len(), "assembling export");

    adapter::compose(&handles)?.serialize()
}

/// Assemble every requested page into its own single-page document.
/// Returns `(page_number, bytes)` pairs numbered from 1 in manifest order.
pub fn assemble_singles(
    store: &SourceStore,
    pages: &[(SourceId, u32)],
) -> Result<Vec<(u32, Vec<u8>)>, PageDeckError> {
    if pages.is_empty() {
        return Err(PageDeckError::EmptyDocument);
    }
    pages
        .iter()
        .enumerate()
        .map(|(i, &page)| Ok((i as u32 + 1, assemble(store, &[page])?)))
        .collect()
}
