//! Stateful tool session management
//!
//! Wraps the core workflow controller behind a wasm-bindgen API so that
//! JavaScript holds no workflow state. Previews are drawn by PDF.js from
//! the original bytes exposed via `documentBytes`.

use pagedeck_core::{
    OverlayPlacement, OverlaySpec, PageDeckError, PageId, Tool, WorkflowController,
};
use wasm_bindgen::prelude::*;

/// Which page workflow the session drives
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Merge,
    Split,
    Reorder,
    DeletePages,
    Sign,
}

impl From<ToolKind> for Tool {
    fn from(kind: ToolKind) -> Self {
        match kind {
            ToolKind::Merge => Tool::Merge,
            ToolKind::Split => Tool::Split,
            ToolKind::Reorder => Tool::Reorder,
            ToolKind::DeletePages => Tool::DeletePages,
            ToolKind::Sign => Tool::Sign,
        }
    }
}

/// Stateful tool session that holds documents and the page manifest in
/// Rust memory
#[wasm_bindgen]
pub struct ToolSession {
    kind: ToolKind,
    controller: WorkflowController,
    last_export_name: Option<String>,
    progress_callback: Option<js_sys::Function>,
}

#[wasm_bindgen]
impl ToolSession {
    /// Create a new session for the given tool
    #[wasm_bindgen(constructor)]
    pub fn new(kind: ToolKind) -> Self {
        Self {
            kind,
            controller: WorkflowController::new(kind.into()),
            last_export_name: None,
            progress_callback: None,
        }
    }

    /// Get the session's tool
    #[wasm_bindgen(getter)]
    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    /// Set a progress callback function
    /// Callback signature: (current: number, total: number, message: string) => void
    #[wasm_bindgen(js_name = setProgressCallback)]
    pub fn set_progress_callback(&mut self, callback: js_sys::Function) {
        self.progress_callback = Some(callback);
    }

    /// Add a document to the session
    /// Returns `{ source, pagesAdded }` on success
    #[wasm_bindgen(js_name = addDocument)]
    pub fn add_document(&mut self, name: &str, bytes: &[u8]) -> Result<JsValue, JsValue> {
        let outcome = self
            .add_document_internal(name, bytes)
            .map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&outcome)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Original bytes of the document at `index`, for PDF.js previews
    #[wasm_bindgen(js_name = documentBytes)]
    pub fn document_bytes(&self, index: usize) -> Result<js_sys::Uint8Array, JsValue> {
        let doc = self
            .controller
            .store()
            .iter()
            .nth(index)
            .ok_or_else(|| JsValue::from_str("Document index out of bounds"))?;
        let array = js_sys::Uint8Array::new_with_length(doc.byte_size() as u32);
        array.copy_from(doc.bytes());
        Ok(array)
    }

    /// Remove the document at `index` together with its manifest pages
    #[wasm_bindgen(js_name = removeDocument)]
    pub fn remove_document(&mut self, index: usize) -> Result<(), JsValue> {
        let source = self
            .controller
            .store()
            .iter()
            .nth(index)
            .map(|d| d.id())
            .ok_or_else(|| JsValue::from_str("Document index out of bounds"))?;
        self.controller.remove_document(source).map_err(to_js_error)
    }

    /// Move the manifest page at `from` so it lands at `to`
    #[wasm_bindgen(js_name = movePage)]
    pub fn move_page(&mut self, from: usize, to: usize) -> Result<(), JsValue> {
        self.controller.move_page(from, to).map_err(to_js_error)
    }

    /// Flag the manifest page at `index` for removal
    #[wasm_bindgen(js_name = removePage)]
    pub fn remove_page(&mut self, index: usize) -> Result<(), JsValue> {
        let id = self.page_id_at(index).map_err(to_js_error)?;
        self.controller.remove_page(id).map_err(to_js_error)
    }

    /// Undo removal of the manifest page at `index`
    #[wasm_bindgen(js_name = restorePage)]
    pub fn restore_page(&mut self, index: usize) -> Result<(), JsValue> {
        let id = self.page_id_at(index).map_err(to_js_error)?;
        self.controller.restore_page(id).map_err(to_js_error)
    }

    /// Toggle selection of the manifest page at `index` (split tool)
    #[wasm_bindgen(js_name = togglePage)]
    pub fn toggle_page(&mut self, index: usize) -> Result<(), JsValue> {
        let id = self.page_id_at(index).map_err(to_js_error)?;
        self.controller.toggle_page(id).map_err(to_js_error)
    }

    /// Set the selection from a range expression like "1-3, 5" (split tool)
    #[wasm_bindgen(js_name = selectRange)]
    pub fn select_range(&mut self, range_str: &str) -> Result<(), JsValue> {
        self.controller.select_range(range_str).map_err(to_js_error)
    }

    /// Place the signature overlay (sign tool). Coordinates are in canvas
    /// pixels with a top-left origin, exactly as captured from the preview.
    #[allow(clippy::too_many_arguments)]
    #[wasm_bindgen(js_name = setOverlay)]
    pub fn set_overlay(
        &mut self,
        page_index: u32,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        canvas_width: f64,
        canvas_height: f64,
        image_png: &[u8],
    ) -> Result<(), JsValue> {
        self.controller
            .set_overlay(OverlaySpec {
                placement: OverlayPlacement {
                    page_index,
                    x,
                    y,
                    width,
                    height,
                    canvas_width,
                    canvas_height,
                },
                image_png: image_png.to_vec(),
            })
            .map_err(to_js_error)
    }

    /// Pages of the working document, in manifest order
    #[wasm_bindgen(js_name = getPages)]
    pub fn get_pages(&self) -> Result<JsValue, JsValue> {
        let pages: Vec<PageJs> = self
            .controller
            .manifest()
            .entries()
            .iter()
            .enumerate()
            .map(|(position, entry)| PageJs {
                position,
                source: entry.source().to_string(),
                page_number: entry.original_index() + 1,
                removed: entry.is_removed(),
                selected: entry.is_selected(),
            })
            .collect();

        serde_wasm_bindgen::to_value(&pages)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Get all document infos
    #[wasm_bindgen(js_name = getDocumentInfos)]
    pub fn get_document_infos(&self) -> Result<JsValue, JsValue> {
        let infos: Vec<_> = self
            .controller
            .store()
            .iter()
            .map(|d| DocumentInfoJs {
                name: d.name().to_string(),
                page_count: d.page_count(),
                size_bytes: d.byte_size(),
                version: d.info().version.clone(),
                encrypted: d.info().encrypted,
            })
            .collect();

        serde_wasm_bindgen::to_value(&infos)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Get document count
    #[wasm_bindgen(js_name = getDocumentCount)]
    pub fn get_document_count(&self) -> usize {
        self.controller.store().len()
    }

    /// Get total page count across all documents
    #[wasm_bindgen(js_name = getTotalPageCount)]
    pub fn get_total_page_count(&self) -> u32 {
        self.controller.manifest().len() as u32
    }

    /// Suggested file name for the most recent export
    #[wasm_bindgen(js_name = exportFileName)]
    pub fn export_file_name(&self) -> Option<String> {
        self.last_export_name.clone()
    }

    /// Run the tool's export and return the output bytes
    pub fn export(&mut self) -> Result<js_sys::Uint8Array, JsValue> {
        self.report_progress(0, 100, "Assembling...");
        let result = self.export_internal().map_err(to_js_error)?;
        self.report_progress(100, 100, "Complete");

        let array = js_sys::Uint8Array::new_with_length(result.len() as u32);
        array.copy_from(&result);
        Ok(array)
    }

    /// Split every page into its own document, bundled as one ZIP archive
    #[wasm_bindgen(js_name = splitAll)]
    pub fn split_all(&mut self) -> Result<js_sys::Uint8Array, JsValue> {
        self.report_progress(0, 100, "Splitting...");
        let result = self.split_all_internal().map_err(to_js_error)?;
        self.report_progress(100, 100, "Complete");

        let array = js_sys::Uint8Array::new_with_length(result.len() as u32);
        array.copy_from(&result);
        Ok(array)
    }

    /// Discard all session state
    pub fn reset(&mut self) {
        self.controller.reset();
        self.last_export_name = None;
    }

    fn report_progress(&self, current: u32, total: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            let this = JsValue::null();
            let _ = callback.call3(
                &this,
                &JsValue::from(current),
                &JsValue::from(total),
                &JsValue::from_str(message),
            );
        }
    }
}

// Internal methods, testable without JsValue
impl ToolSession {
    fn add_document_internal(
        &mut self,
        name: &str,
        bytes: &[u8],
    ) -> Result<UploadOutcomeJs, PageDeckError> {
        let outcome = self.controller.add_document(name, bytes.to_vec(), None)?;
        Ok(UploadOutcomeJs {
            source: outcome.source.to_string(),
            pages_added: outcome.pages_added,
        })
    }

    fn export_internal(&mut self) -> Result<Vec<u8>, PageDeckError> {
        let export = self.controller.export()?;
        self.last_export_name = Some(export.file_name.clone());
        Ok(export.bytes)
    }

    fn split_all_internal(&mut self) -> Result<Vec<u8>, PageDeckError> {
        let export = self.controller.split_all()?;
        self.last_export_name = Some(export.file_name.clone());
        Ok(export.bytes)
    }

    fn page_id_at(&self, index: usize) -> Result<PageId, PageDeckError> {
        self.controller
            .manifest()
            .entries()
            .get(index)
            .map(|e| e.id())
            .ok_or_else(|| {
                PageDeckError::InvalidRange(format!("page position {} out of bounds", index))
            })
    }
}

fn to_js_error(err: PageDeckError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Upload outcome for JS serialization
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadOutcomeJs {
    source: String,
    pages_added: u32,
}

/// Manifest page for JS serialization
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct PageJs {
    position: usize,
    source: String,
    page_number: u32,
    removed: bool,
    selected: bool,
}

/// Document info for JS serialization
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentInfoJs {
    name: String,
    page_count: u32,
    size_bytes: usize,
    version: String,
    encrypted: bool,
}
