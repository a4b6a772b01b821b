//! Upload validation and document info extraction.
//!
//! Every byte buffer entering a workflow session passes through here before
//! a source document is created. Validation is local: nothing is uploaded.

use crate::error::PageDeckError;
use lopdf::Document;
use serde::Serialize;

/// Metadata extracted from a validated document.
#[derive(Debug, Clone, Serialize, Default)]
pub struct DocumentInfo {
    /// Number of pages in the document
    pub page_count: u32,
    /// PDF version string (e.g. "1.7")
    pub version: String,
    /// Whether the document is encrypted
    pub encrypted: bool,
    /// File size in bytes
    pub size_bytes: usize,
    /// Document title from the Info dictionary, if present
    pub title: Option<String>,
    /// Document author from the Info dictionary, if present
    pub author: Option<String>,
}

/// Cheap structural check without a full parse. Used to reject obviously
/// wrong uploads (wrong media type, truncated transfer) before any work.
pub fn quick_validate(bytes: &[u8]) -> Result<(), PageDeckError> {
    if bytes.len() < 8 {
        return Err(PageDeckError::InvalidFormat(
            "file too small to be a PDF".into(),
        ));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(PageDeckError::InvalidFormat(
            "missing %PDF- header".into(),
        ));
    }

    // The EOF marker must appear near the end of the file.
    let tail_start = bytes.len().saturating_sub(1024);
    let tail = &bytes[tail_start..];
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(PageDeckError::InvalidFormat(
            "truncated file (missing %%EOF marker)".into(),
        ));
    }

    Ok(())
}

/// Fully parse and inspect a document.
///
/// Encrypted-but-parseable documents are accepted and flagged; downstream
/// operations decide whether to proceed. A zero-page document is rejected
/// outright since no workflow can act on it.
pub fn inspect(bytes: &[u8]) -> Result<DocumentInfo, PageDeckError> {
    quick_validate(bytes)?;

    let document = Document::load_mem(bytes)
        .map_err(|e| PageDeckError::InvalidFormat(e.to_string()))?;

    let page_count = document.get_pages().len() as u32;
    if page_count == 0 {
        return Err(PageDeckError::InvalidFormat("document has no pages".into()));
    }

    let (title, author) = info_strings(&document);

    Ok(DocumentInfo {
        page_count,
        version: header_version(bytes),
        encrypted: document.is_encrypted(),
        size_bytes: bytes.len(),
        title,
        author,
    })
}

/// Version digits from the `%PDF-x.y` header.
fn header_version(bytes: &[u8]) -> String {
    bytes
        .get(5..8)
        .and_then(|v| std::str::from_utf8(v).ok())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "1.4".to_string())
}

/// Title and Author from the trailer's Info dictionary, when resolvable.
fn info_strings(document: &Document) -> (Option<String>, Option<String>) {
    let dict = document
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| obj.as_reference().ok())
        .and_then(|id| document.objects.get(&id))
        .and_then(|obj| obj.as_dict().ok());

    let read = |key: &[u8]| {
        dict.and_then(|d| d.get(key).ok())
            .and_then(|obj| obj.as_str().ok())
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .filter(|s| !s.is_empty())
    };

    (read(b"Title"), read(b"Author"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::create_test_pdf;

    #[test]
    fn test_quick_validate_rejects_non_pdf() {
        assert!(quick_validate(b"not a pdf file at all").is_err());
    }

    #[test]
    fn test_quick_validate_rejects_tiny_file() {
        assert!(quick_validate(b"tiny").is_err());
    }

    #[test]
    fn test_quick_validate_accepts_valid_pdf() {
        let pdf = create_test_pdf(1, "T");
        assert!(quick_validate(&pdf).is_ok());
    }

    #[test]
    fn test_inspect_reports_page_count() {
        let pdf = create_test_pdf(5, "T");
        let info = inspect(&pdf).unwrap();
        assert_eq!(info.page_count, 5);
        assert_eq!(info.version, "1.7");
        assert!(!info.encrypted);
        assert_eq!(info.size_bytes, pdf.len());
    }

    #[test]
    fn test_inspect_rejects_garbage() {
        let result = inspect(b"%PDF-1.7 but then nothing sensible %%EOF");
        assert!(result.is_err());
    }

    #[test]
    fn test_header_version() {
        assert_eq!(header_version(b"%PDF-1.7\n"), "1.7");
        assert_eq!(header_version(b"%PDF-2.0\n"), "2.0");
    }
}
