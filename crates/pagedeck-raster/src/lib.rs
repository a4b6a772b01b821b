//! Native page rasterizer backed by pdfium.
//!
//! Implements the `PageRasterizer` contract from `pagedeck-core` for hosts
//! that link the pdfium system library. The wasm app does not use this
//! crate; in the browser, previews are drawn by PDF.js from the original
//! bytes.

use image::codecs::jpeg::JpegEncoder;
use pagedeck_core::error::PageDeckError;
use pagedeck_core::raster::{PageRasterizer, RasterFormat, RasterImage, RasterOptions};
use pdfium_render::prelude::*;
use std::io::Cursor;

/// Rasterizer bound to the pdfium system library.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    /// Bind to the pdfium library installed on the host. Fails with
    /// `EngineLoad` when the library cannot be found or linked.
    pub fn new() -> Result<Self, PageDeckError> {
        let bindings = Pdfium::bind_to_system_library()
            .map_err(|e| PageDeckError::EngineLoad(e.to_string()))?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        bytes: &[u8],
        page_index: u32,
        options: &RasterOptions,
    ) -> Result<RasterImage, PageDeckError> {
        if options.scale <= 0.0 {
            return Err(PageDeckError::InvalidRange("scale must be > 0".into()));
        }

        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| PageDeckError::InvalidFormat(e.to_string()))?;

        let index = u16::try_from(page_index).map_err(|_| PageDeckError::InvalidRange(
            format!("page index {} out of bounds", page_index),
        ))?;
        let page = document.pages().get(index).map_err(|e| {
            PageDeckError::Rasterization {
                page: page_index,
                reason: e.to_string(),
            }
        })?;

        let (width, height) =
            target_dimensions(page.width().value, page.height().value, options.scale);
        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_target_height(height as i32);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| PageDeckError::Rasterization {
                page: page_index,
                reason: e.to_string(),
            })?;
        let img = bitmap.as_image();

        tracing::trace!(page = page_index, width, height, "page rendered");

        let mut data = Vec::new();
        match options.format {
            RasterFormat::Png => {
                img.write_to(&mut Cursor::new(&mut data), image::ImageFormat::Png)
                    .map_err(|e| PageDeckError::Rasterization {
                        page: page_index,
                        reason: format!("png encode: {}", e),
                    })?;
            }
            RasterFormat::Jpeg { quality } => {
                let rgb = img.to_rgb8();
                let mut encoder = JpegEncoder::new_with_quality(&mut data, quality);
                encoder
                    .encode_image(&rgb)
                    .map_err(|e| PageDeckError::Rasterization {
                        page: page_index,
                        reason: format!("jpeg encode: {}", e),
                    })?;
            }
        }

        Ok(RasterImage {
            width: img.width(),
            height: img.height(),
            format: options.format,
            data,
        })
    }
}

/// Pixel dimensions for a page of `width_pts` x `height_pts` points rendered
/// at `scale`. Never collapses to zero.
fn target_dimensions(width_pts: f32, height_pts: f32, scale: f32) -> (u32, u32) {
    let width = (width_pts * scale).round().max(1.0) as u32;
    let height = (height_pts * scale).round().max(1.0) as u32;
    (width, height)
}
