//! Standalone document tools: compression, image-to-PDF conversion and
//! archive bundling.
//!
//! Unlike the tool sessions these are stateless: one call in, one result
//! out. The JPEG bundling path exists for PDF-to-image conversion, where
//! PDF.js renders the pages in the browser and hands the encoded frames
//! back here to be archived.

use pagedeck_core::{compress, convert, PageDeckError};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// Result of a compression pass, with size metrics for the UI
#[wasm_bindgen]
pub struct CompressResult {
    outcome: compress::CompressionOutcome,
    file_name: String,
}

#[wasm_bindgen]
impl CompressResult {
    /// Compressed document bytes
    #[wasm_bindgen(getter)]
    pub fn bytes(&self) -> js_sys::Uint8Array {
        to_uint8_array(&self.outcome.bytes)
    }

    /// Suggested download name
    #[wasm_bindgen(getter, js_name = fileName)]
    pub fn file_name(&self) -> String {
        self.file_name.clone()
    }

    #[wasm_bindgen(getter, js_name = originalSize)]
    pub fn original_size(&self) -> usize {
        self.outcome.original_size
    }

    #[wasm_bindgen(getter, js_name = finalSize)]
    pub fn final_size(&self) -> usize {
        self.outcome.final_size()
    }

    #[wasm_bindgen(getter, js_name = savingsPercent)]
    pub fn savings_percent(&self) -> f64 {
        self.outcome.savings_percent()
    }

    /// True when compression gained nothing and the input was kept
    #[wasm_bindgen(getter, js_name = usedOriginal)]
    pub fn used_original(&self) -> bool {
        self.outcome.used_original
    }
}

/// Losslessly compress a document. Never returns bytes larger than the
/// input.
#[wasm_bindgen(js_name = compressDocument)]
pub fn compress_document(name: &str, bytes: &[u8]) -> Result<CompressResult, JsValue> {
    compress_document_internal(name, bytes).map_err(to_js_error)
}

/// Build a PDF with one page per input image (JPEG or PNG).
/// `names` and `buffers` are parallel arrays; names are used for error
/// messages and format detection.
#[wasm_bindgen(js_name = imagesToPdf)]
pub fn images_to_pdf(names: Vec<String>, buffers: js_sys::Array) -> Result<js_sys::Uint8Array, JsValue> {
    let buffers = byte_buffers(&buffers)?;
    if names.len() != buffers.len() {
        return Err(JsValue::from_str("names and buffers must have equal length"));
    }
    let files: Vec<(String, Vec<u8>)> = names.into_iter().zip(buffers).collect();
    let bytes = convert::images_to_pdf(&files).map_err(to_js_error)?;
    Ok(to_uint8_array(&bytes))
}

/// Bundle PDF.js-rendered JPEG frames into one ZIP archive with
/// `{base}_page_{n}.jpg` entries
#[wasm_bindgen(js_name = bundleJpegPages)]
pub fn bundle_jpeg_pages(base: &str, pages: js_sys::Array) -> Result<js_sys::Uint8Array, JsValue> {
    let frames = byte_buffers(&pages)?;
    let archive = bundle_jpeg_internal(base, frames).map_err(to_js_error)?;
    Ok(to_uint8_array(&archive))
}

/// Archive name for an image bundle produced from `original`
#[wasm_bindgen(js_name = archiveName)]
pub fn archive_name(original: &str) -> String {
    convert::archive_name(original)
}

// Internal methods, testable without JsValue

fn compress_document_internal(name: &str, bytes: &[u8]) -> Result<CompressResult, PageDeckError> {
    let outcome = compress::compress_document(bytes)?;
    Ok(CompressResult {
        outcome,
        file_name: pagedeck_core::output_name("compressed", name),
    })
}

fn bundle_jpeg_internal(base: &str, frames: Vec<Vec<u8>>) -> Result<Vec<u8>, PageDeckError> {
    let entries: Vec<(String, Vec<u8>)> = frames
        .into_iter()
        .enumerate()
        .map(|(i, bytes)| (format!("{}_page_{}.jpg", base, i + 1), bytes))
        .collect();
    convert::bundle_files(&entries)
}

fn byte_buffers(array: &js_sys::Array) -> Result<Vec<Vec<u8>>, JsValue> {
    array
        .iter()
        .map(|value| {
            value
                .dyn_into::<js_sys::Uint8Array>()
                .map(|arr| arr.to_vec())
                .map_err(|_| JsValue::from_str("expected an array of Uint8Array"))
        })
        .collect()
}

fn to_uint8_array(bytes: &[u8]) -> js_sys::Uint8Array {
    let array = js_sys::Uint8Array::new_with_length(bytes.len() as u32);
    array.copy_from(bytes);
    array
}

fn to_js_error(err: PageDeckError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    #[test]
    fn test_compress_names_output() {
        let pdf = crate::session::tests::create_test_pdf(2);
        let result = compress_document_internal("report.pdf", &pdf).unwrap();

        assert_eq!(result.file_name, "compressed_report.pdf");
        assert!(result.outcome.bytes.len() <= pdf.len());
        assert!(result.outcome.bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_compress_rejects_garbage() {
        assert!(compress_document_internal("x.pdf", b"junk").is_err());
    }

    #[test]
    fn test_images_to_pdf_from_pngs() {
        let files = vec![
            ("a.png".to_string(), small_png()),
            ("b.png".to_string(), small_png()),
        ];
        let bytes = convert::images_to_pdf(&files).unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_bundle_jpeg_pages_archive() {
        let frames = vec![vec![0xFFu8; 32], vec![0xAAu8; 32]];
        let archive = bundle_jpeg_internal("scan", frames).unwrap();
        // ZIP local-file magic
        assert_eq!(&archive[0..2], b"PK");
    }

    #[test]
    fn test_bundle_rejects_empty() {
        assert!(bundle_jpeg_internal("scan", Vec::new()).is_err());
    }

    #[test]
    fn test_archive_name() {
        assert_eq!(archive_name("report.pdf"), "report_images.zip");
    }
}
