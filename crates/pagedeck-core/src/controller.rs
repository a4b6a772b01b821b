//! The workflow controller: one generic session state machine parameterized
//! by a per-tool policy.
//!
//! Every tool runs the same upload → edit → export loop; tools differ only
//! in which mutations they permit and which manifest subset they export.
//! A mutation a tool does not permit fails with `NotPermitted` instead of
//! being absent from the API, so hosts can share one binding surface.

use crate::assemble::{self, ExportResult};
use crate::convert;
use crate::error::PageDeckError;
use crate::manifest::{PageId, PageManifest};
use crate::overlay::{self, OverlaySpec};
use crate::ranges;
use crate::raster::{self, PageRasterizer, RasterOptions};
use crate::source::{SourceId, SourceStore};

/// The page workflow being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Merge,
    Split,
    Reorder,
    DeletePages,
    Sign,
}

impl Tool {
    /// Output file name prefix.
    pub fn prefix(&self) -> &'static str {
        match self {
            Tool::Merge => "merged",
            Tool::Split => "split",
            Tool::Reorder => "reordered",
            Tool::DeletePages => "deleted",
            Tool::Sign => "signed",
        }
    }

    /// Whether the tool operates on exactly one uploaded document.
    pub fn single_document(&self) -> bool {
        !matches!(self, Tool::Merge)
    }

    pub fn allows_reorder(&self) -> bool {
        matches!(self, Tool::Merge | Tool::Reorder)
    }

    pub fn allows_remove(&self) -> bool {
        matches!(self, Tool::Merge | Tool::DeletePages)
    }

    pub fn allows_select(&self) -> bool {
        matches!(self, Tool::Split)
    }

    pub fn allows_overlay(&self) -> bool {
        matches!(self, Tool::Sign)
    }
}

/// Session lifecycle. Mutations are rejected while an export runs; errors
/// during export return the session to `Editing` with the manifest intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    Editing,
    Exporting,
}

/// What an upload produced: the new source id plus per-page thumbnail
/// failures (1-indexed), which do not block the upload.
#[derive(Debug)]
pub struct UploadOutcome {
    pub source: SourceId,
    pub pages_added: u32,
    pub failed_pages: Vec<u32>,
}

/// One tool session. Owns its sources and manifest exclusively.
pub struct WorkflowController {
    tool: Tool,
    phase: Phase,
    store: SourceStore,
    manifest: PageManifest,
    overlay: Option<OverlaySpec>,
}

impl WorkflowController {
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            phase: Phase::Empty,
            store: SourceStore::new(),
            manifest: PageManifest::new(),
            overlay: None,
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn store(&self) -> &SourceStore {
        &self.store
    }

    pub fn manifest(&self) -> &PageManifest {
        &self.manifest
    }

    /// Validate and admit an upload, appending one manifest entry per page.
    /// With a rasterizer present, thumbnails are rendered best-effort; pages
    /// whose render fails arrive without one and are reported.
    pub fn add_document(
        &mut self,
        name: &str,
        bytes: Vec<u8>,
        rasterizer: Option<&dyn PageRasterizer>,
    ) -> Result<UploadOutcome, PageDeckError> {
        self.ensure_editable()?;
        if self.tool.single_document() && !self.store.is_empty() {
            return Err(PageDeckError::NotPermitted(format!(
                "{:?} operates on a single document",
                self.tool
            )));
        }

        let source = self.store.insert(name, bytes)?;
        let doc = self
            .store
            .get(source)
            .ok_or_else(|| PageDeckError::Operation("source vanished after insert".into()))?;
        let page_count = doc.page_count();

        let mut thumbnails: Vec<Option<crate::raster::RasterImage>> = match rasterizer {
            Some(r) => raster::rasterize_all(
                r,
                doc.bytes(),
                page_count,
                &RasterOptions::thumbnail(),
            )
            .into_iter()
            .map(Result::ok)
            .collect(),
            None => vec![None; page_count as usize],
        };

        let failed_pages = match rasterizer {
            Some(_) => thumbnails
                .iter()
                .enumerate()
                .filter(|(_, t)| t.is_none())
                .map(|(i, _)| i as u32 + 1)
                .collect(),
            None => Vec::new(),
        };

        for index in 0..page_count {
            let thumbnail = thumbnails[index as usize].take();
            self.manifest.append(source, index, thumbnail);
        }

        self.phase = Phase::Editing;
        tracing::info!(
            tool = ?self.tool,
            %source,
            pages = page_count,
            thumb_failures = failed_pages.len(),
            "document added"
        );
        Ok(UploadOutcome {
            source,
            pages_added: page_count,
            failed_pages,
        })
    }

    /// Drop an uploaded document and every manifest entry pointing at it.
    pub fn remove_document(&mut self, source: SourceId) -> Result<(), PageDeckError> {
        self.ensure_editable()?;
        self.store
            .remove(source)
            .ok_or_else(|| PageDeckError::Operation(format!("unknown source {}", source)))?;
        self.manifest.drop_source(source);
        if self.store.is_empty() {
            self.phase = Phase::Empty;
        }
        Ok(())
    }

    pub fn move_page(&mut self, from: usize, to: usize) -> Result<(), PageDeckError> {
        self.ensure_editable()?;
        if !self.tool.allows_reorder() {
            return Err(PageDeckError::NotPermitted(format!(
                "{:?} does not reorder pages",
                self.tool
            )));
        }
        if !self.manifest.move_page(from, to) {
            return Err(PageDeckError::InvalidRange(format!(
                "move {} -> {} out of bounds",
                from, to
            )));
        }
        Ok(())
    }

    /// Flag a page for removal. Already-removed pages stay removed.
    pub fn remove_page(&mut self, id: PageId) -> Result<(), PageDeckError> {
        self.ensure_editable()?;
        if !self.tool.allows_remove() {
            return Err(PageDeckError::NotPermitted(format!(
                "{:?} does not remove pages",
                self.tool
            )));
        }
        if !self.manifest.mark_removed(id) {
            return Err(PageDeckError::Operation("unknown page id".into()));
        }
        Ok(())
    }

    pub fn restore_page(&mut self, id: PageId) -> Result<(), PageDeckError> {
        self.ensure_editable()?;
        if !self.tool.allows_remove() {
            return Err(PageDeckError::NotPermitted(format!(
                "{:?} does not remove pages",
                self.tool
            )));
        }
        if !self.manifest.restore(id) {
            return Err(PageDeckError::Operation("unknown page id".into()));
        }
        Ok(())
    }

    pub fn toggle_page(&mut self, id: PageId) -> Result<(), PageDeckError> {
        self.ensure_editable()?;
        if !self.tool.allows_select() {
            return Err(PageDeckError::NotPermitted(format!(
                "{:?} does not select pages",
                self.tool
            )));
        }
        if !self.manifest.toggle_selected(id) {
            return Err(PageDeckError::Operation("unknown page id".into()));
        }
        Ok(())
    }

    /// Replace the selection with the pages named by a 1-based range
    /// expression such as `"1-3,5"`.
    pub fn select_range(&mut self, input: &str) -> Result<(), PageDeckError> {
        self.ensure_editable()?;
        if !self.tool.allows_select() {
            return Err(PageDeckError::NotPermitted(format!(
                "{:?} does not select pages",
                self.tool
            )));
        }
        let doc = self
            .store
            .iter()
            .next()
            .ok_or(PageDeckError::EmptyDocument)?;
        let indices = ranges::parse_ranges(input, doc.page_count())?;
        self.manifest.select_original_indices(&indices);
        Ok(())
    }

    /// Place (or replace) the signature overlay.
    pub fn set_overlay(&mut self, spec: OverlaySpec) -> Result<(), PageDeckError> {
        self.ensure_editable()?;
        if !self.tool.allows_overlay() {
            return Err(PageDeckError::NotPermitted(format!(
                "{:?} does not place overlays",
                self.tool
            )));
        }
        let doc = self
            .store
            .iter()
            .next()
            .ok_or(PageDeckError::EmptyDocument)?;
        if spec.placement.page_index >= doc.page_count() {
            return Err(PageDeckError::InvalidRange(format!(
                "overlay page {} out of bounds",
                spec.placement.page_index + 1
            )));
        }
        self.overlay = Some(spec);
        Ok(())
    }

    /// Produce the tool's output document.
    pub fn export(&mut self) -> Result<ExportResult, PageDeckError> {
        if self.store.is_empty() {
            return Err(PageDeckError::EmptyDocument);
        }
        self.ensure_editable()?;

        self.phase = Phase::Exporting;
        let result = self.export_inner();
        self.phase = Phase::Editing;

        match &result {
            Ok(export) => tracing::info!(
                tool = ?self.tool,
                file = %export.file_name,
                bytes = export.final_size,
                "export finished"
            ),
            Err(err) => tracing::warn!(tool = ?self.tool, error = %err, "export failed"),
        }
        result
    }

    fn export_inner(&self) -> Result<ExportResult, PageDeckError> {
        let first_name = self
            .store
            .iter()
            .next()
            .map(|d| d.name().to_string())
            .ok_or(PageDeckError::EmptyDocument)?;

        let bytes = match self.tool {
            Tool::Sign => {
                let spec = self
                    .overlay
                    .as_ref()
                    .ok_or_else(|| PageDeckError::NotPermitted("no signature placed".into()))?;
                let doc = self.store.iter().next().ok_or(PageDeckError::EmptyDocument)?;
                overlay::apply_overlay(doc.bytes(), spec)?
            }
            Tool::Split => {
                let pages: Vec<(SourceId, u32)> = self
                    .manifest
                    .selected()
                    .map(|e| (e.source(), e.original_index()))
                    .collect();
                if pages.is_empty() {
                    return Err(PageDeckError::NoPagesSelected);
                }
                assemble::assemble(&self.store, &pages)?
            }
            _ => {
                let pages: Vec<(SourceId, u32)> = self
                    .manifest
                    .retained()
                    .map(|e| (e.source(), e.original_index()))
                    .collect();
                assemble::assemble(&self.store, &pages)?
            }
        };

        let final_size = bytes.len();
        Ok(ExportResult {
            bytes,
            file_name: assemble::output_name(self.tool.prefix(), &first_name),
            original_size: self.store.total_bytes(),
            final_size,
        })
    }

    /// Split every retained page into its own document and bundle the lot
    /// into one archive.
    pub fn split_all(&mut self) -> Result<ExportResult, PageDeckError> {
        if self.tool != Tool::Split {
            return Err(PageDeckError::NotPermitted(format!(
                "{:?} does not split",
                self.tool
            )));
        }
        if self.store.is_empty() {
            return Err(PageDeckError::EmptyDocument);
        }
        self.ensure_editable()?;

        self.phase = Phase::Exporting;
        let result = self.split_all_inner();
        self.phase = Phase::Editing;
        result
    }

    fn split_all_inner(&self) -> Result<ExportResult, PageDeckError> {
        let doc = self.store.iter().next().ok_or(PageDeckError::EmptyDocument)?;
        let base = doc
            .name()
            .strip_suffix(".pdf")
            .or_else(|| doc.name().strip_suffix(".PDF"))
            .unwrap_or(doc.name())
            .to_string();

        let pages: Vec<(SourceId, u32)> = self
            .manifest
            .retained()
            .map(|e| (e.source(), e.original_index()))
            .collect();
        let singles = assemble::assemble_singles(&self.store, &pages)?;

        let entries: Vec<(String, Vec<u8>)> = singles
            .into_iter()
            .map(|(n, bytes)| (format!("{}_page_{}.pdf", base, n), bytes))
            .collect();
        let archive = convert::bundle_files(&entries)?;

        let final_size = archive.len();
        Ok(ExportResult {
            bytes: archive,
            file_name: format!("{}_split.zip", base),
            original_size: self.store.total_bytes(),
            final_size,
        })
    }

    /// Back to an empty session. Drops sources, manifest and overlay.
    pub fn reset(&mut self) {
        self.store.clear();
        self.manifest.clear();
        self.overlay = None;
        self.phase = Phase::Empty;
        tracing::debug!(tool = ?self.tool, "session reset");
    }

    fn ensure_editable(&self) -> Result<(), PageDeckError> {
        if self.phase == Phase::Exporting {
            return Err(PageDeckError::NotPermitted("export in progress".into()));
        }
        Ok(())
    }
}
