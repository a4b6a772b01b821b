use thiserror::Error;

/// Errors produced by the page-workflow core.
#[derive(Error, Debug)]
pub enum PageDeckError {
    #[error("Not a valid PDF: {0}")]
    InvalidFormat(String),

    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    #[error("No pages selected")]
    NoPagesSelected,

    #[error("Cannot produce a document with zero pages")]
    EmptyDocument,

    #[error("Rendering engine unavailable: {0}")]
    EngineLoad(String),

    #[error("Failed to rasterize page {page}: {reason}")]
    Rasterization { page: u32, reason: String },

    #[error("Assembly failed: {0}")]
    Assembly(String),

    #[error("Export did not produce a valid document: {0}")]
    Integrity(String),

    #[error("Operation not permitted: {0}")]
    NotPermitted(String),

    #[error("PDF operation failed: {0}")]
    Operation(String),
}

/// Coarse classification used at the controller boundary to decide how a
/// failure is surfaced: user-correctable input problems, a missing engine,
/// a failed operation (manifest state preserved), or a bad output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    EngineLoad,
    Processing,
    Integrity,
}

impl PageDeckError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PageDeckError::InvalidFormat(_)
            | PageDeckError::InvalidRange(_)
            | PageDeckError::NoPagesSelected
            | PageDeckError::EmptyDocument
            | PageDeckError::NotPermitted(_) => ErrorClass::Validation,
            PageDeckError::EngineLoad(_) => ErrorClass::EngineLoad,
            PageDeckError::Rasterization { .. }
            | PageDeckError::Assembly(_)
            | PageDeckError::Operation(_) => ErrorClass::Processing,
            PageDeckError::Integrity(_) => ErrorClass::Integrity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_classified() {
        assert_eq!(PageDeckError::NoPagesSelected.class(), ErrorClass::Validation);
        assert_eq!(PageDeckError::EmptyDocument.class(), ErrorClass::Validation);
        assert_eq!(
            PageDeckError::InvalidFormat("x".into()).class(),
            ErrorClass::Validation
        );
    }

    #[test]
    fn test_processing_errors_preserve_manifest_semantics() {
        let err = PageDeckError::Rasterization {
            page: 3,
            reason: "corrupt stream".into(),
        };
        assert_eq!(err.class(), ErrorClass::Processing);
        assert!(err.to_string().contains("page 3"));
    }

    #[test]
    fn test_integrity_class() {
        assert_eq!(
            PageDeckError::Integrity("empty output".into()).class(),
            ErrorClass::Integrity
        );
    }
}
