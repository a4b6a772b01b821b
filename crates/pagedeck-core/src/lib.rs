//! Core page-workflow engine: upload validation, page manifest, selective
//! re-assembly and export for the merge / split / reorder / delete-pages /
//! sign tools.
//!
//! All processing is in-memory and local. Document bytes never leave the
//! process; sources are held immutably and every export is assembled from
//! copies.

pub mod adapter;
pub mod assemble;
pub mod compress;
pub mod controller;
pub mod convert;
pub mod error;
pub mod manifest;
pub mod overlay;
pub mod pages;
pub mod ranges;
pub mod raster;
pub mod source;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_pdf;

pub use assemble::{output_name, ExportResult};
pub use controller::{Phase, Tool, UploadOutcome, WorkflowController};
pub use error::{ErrorClass, PageDeckError};
pub use manifest::{PageDescriptor, PageId, PageManifest};
pub use overlay::{OverlayPlacement, OverlaySpec};
pub use raster::{PageRasterizer, RasterFormat, RasterImage, RasterOptions};
pub use source::{SourceDocument, SourceId, SourceStore};
pub use validate::{inspect, quick_validate, DocumentInfo};
