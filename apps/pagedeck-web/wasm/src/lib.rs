//! WASM bindings for the page-workflow tools.
//!
//! This module provides a stateful, session-based API: all workflow state
//! (sources, page manifest, overlay) lives in Rust, and JavaScript only
//! handles DOM events, file I/O and PDF.js previews.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { ToolSession, ToolKind } from './pkg/pagedeck_wasm.js';
//!
//! await init();
//!
//! const session = new ToolSession(ToolKind.Merge);
//! session.addDocument("a.pdf", bytesA);
//! session.addDocument("b.pdf", bytesB);
//! session.movePage(3, 1);           // drag page into place
//! const result = session.export();  // Uint8Array
//! downloadBlob(result, session.exportFileName());
//! ```

pub mod session;
pub mod tools;

use wasm_bindgen::prelude::*;

// Re-export main types for JavaScript
pub use session::{ToolKind, ToolSession};
pub use tools::CompressResult;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&format!("pagedeck {} ready", env!("CARGO_PKG_VERSION")).into());
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Quick validation check for an uploaded file.
/// Returns Ok(()) if it looks like a PDF, Err with a message if not.
#[wasm_bindgen]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    pagedeck_core::quick_validate(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Get detailed document info without creating a session.
/// Useful for showing file info before the user commits to a tool.
#[wasm_bindgen]
pub fn get_pdf_info(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let info = pagedeck_core::inspect(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&info)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Get page count from document bytes (convenience function)
#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    let info = pagedeck_core::inspect(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(info.page_count)
}

/// Format bytes as human-readable string
#[wasm_bindgen]
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_version() {
        let version = get_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(2621440), "2.5 MB");
    }
}
