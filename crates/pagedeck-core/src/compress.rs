//! Whole-document size reduction.
//!
//! Structural only: unreferenced objects are pruned, streams are deflated
//! and document metadata is dropped. Page content is never resampled, so
//! output is always visually identical to the input.

use crate::error::PageDeckError;
use lopdf::Document;

/// Outcome of a compression pass.
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub bytes: Vec<u8>,
    pub original_size: usize,
    /// True when compression gained nothing and the input was returned
    /// unchanged.
    pub used_original: bool,
}

impl CompressionOutcome {
    pub fn final_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn savings_percent(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        (1.0 - self.bytes.len() as f64 / self.original_size as f64) * 100.0
    }
}

/// Rebuild the document as small as lossless rewriting allows. If the
/// rewrite comes out larger than the input, the input wins.
pub fn compress_document(bytes: &[u8]) -> Result<CompressionOutcome, PageDeckError> {
    let mut doc =
        Document::load_mem(bytes).map_err(|e| PageDeckError::InvalidFormat(e.to_string()))?;

    if doc.get_pages().is_empty() {
        return Err(PageDeckError::EmptyDocument);
    }

    // Document Info (title, author, producer) is dead weight for this pass.
    doc.trailer.remove(b"Info");

    doc.prune_objects();
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PageDeckError::Integrity(e.to_string()))?;

    let outcome = if buffer.len() < bytes.len() {
        CompressionOutcome {
            bytes: buffer,
            original_size: bytes.len(),
            used_original: false,
        }
    } else {
        CompressionOutcome {
            bytes: bytes.to_vec(),
            original_size: bytes.len(),
            used_original: true,
        }
    };

    tracing::debug!(
        original = outcome.original_size,
        compressed = outcome.final_size(),
        reused = outcome.used_original,
        "compression pass finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::{create_test_pdf, page_marker};

    #[test]
    fn test_compress_keeps_all_pages() {
        let pdf = create_test_pdf(3, "C");
        let outcome = compress_document(&pdf).unwrap();

        let doc = Document::load_mem(&outcome.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
        assert_eq!(page_marker(&outcome.bytes, 2), "C-Page-2");
    }

    #[test]
    fn test_compress_never_grows_output() {
        let pdf = create_test_pdf(1, "C");
        let outcome = compress_document(&pdf).unwrap();
        assert!(outcome.bytes.len() <= pdf.len());
        assert_eq!(outcome.original_size, pdf.len());
    }

    #[test]
    fn test_compress_rejects_garbage() {
        assert!(compress_document(b"nope").is_err());
    }

    #[test]
    fn test_savings_percent_zero_when_reused() {
        let outcome = CompressionOutcome {
            bytes: vec![0u8; 100],
            original_size: 100,
            used_original: true,
        };
        assert_eq!(outcome.savings_percent(), 0.0);
    }
}
