//! Page rasterization contract.
//!
//! The core never renders pixels itself; it drives an engine behind the
//! `PageRasterizer` trait. The native backend lives in `pagedeck-raster`
//! (pdfium); the web app skips rasterization entirely and lets PDF.js draw
//! previews from the original bytes.

use crate::error::PageDeckError;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Scale used for manifest thumbnails.
pub const THUMBNAIL_SCALE: f32 = 0.3;

/// Encoded output format for a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterFormat {
    Png,
    Jpeg { quality: u8 },
}

/// Rendering parameters for one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Multiplier over the page's native point dimensions. Must be > 0.
    pub scale: f32,
    pub format: RasterFormat,
}

impl RasterOptions {
    /// Small-scale PNG preview for the manifest grid.
    pub fn thumbnail() -> Self {
        Self {
            scale: THUMBNAIL_SCALE,
            format: RasterFormat::Png,
        }
    }

    pub fn png(scale: f32) -> Self {
        Self {
            scale,
            format: RasterFormat::Png,
        }
    }

    pub fn jpeg(scale: f32, quality: u8) -> Self {
        Self {
            scale,
            format: RasterFormat::Jpeg { quality },
        }
    }
}

/// One rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub format: RasterFormat,
    /// Encoded image bytes (PNG or JPEG per `format`).
    pub data: Vec<u8>,
}

impl RasterImage {
    pub fn mime_type(&self) -> &'static str {
        match self.format {
            RasterFormat::Png => "image/png",
            RasterFormat::Jpeg { .. } => "image/jpeg",
        }
    }

    /// Data URL for direct use as an `<img>` source.
    pub fn to_data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.data);
        format!("data:{};base64,{}", self.mime_type(), encoded)
    }
}

/// Renders one page of a document to a bitmap. Deterministic for the same
/// (bytes, page index, options) and never mutates the source.
pub trait PageRasterizer {
    fn rasterize(
        &self,
        bytes: &[u8],
        page_index: u32,
        options: &RasterOptions,
    ) -> Result<RasterImage, PageDeckError>;
}

/// Rasterize pages `0..page_count` in order, collecting a per-page result.
///
/// One undecodable page does not abort the batch; the caller decides what to
/// do with the failed subset.
pub fn rasterize_all(
    rasterizer: &dyn PageRasterizer,
    bytes: &[u8],
    page_count: u32,
    options: &RasterOptions,
) -> Vec<Result<RasterImage, PageDeckError>> {
    (0..page_count)
        .map(|index| rasterizer.rasterize(bytes, index, options))
        .collect()
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;

    /// Test double that renders fixed-size solid images and can be told to
    /// fail on specific page indices.
    pub struct FakeRasterizer {
        pub fail_pages: Vec<u32>,
    }

    impl FakeRasterizer {
        pub fn new() -> Self {
            Self { fail_pages: Vec::new() }
        }

        pub fn failing_on(pages: &[u32]) -> Self {
            Self {
                fail_pages: pages.to_vec(),
            }
        }
    }

    impl PageRasterizer for FakeRasterizer {
        fn rasterize(
            &self,
            _bytes: &[u8],
            page_index: u32,
            options: &RasterOptions,
        ) -> Result<RasterImage, PageDeckError> {
            if options.scale <= 0.0 {
                return Err(PageDeckError::InvalidRange("scale must be > 0".into()));
            }
            if self.fail_pages.contains(&page_index) {
                return Err(PageDeckError::Rasterization {
                    page: page_index,
                    reason: "injected failure".into(),
                });
            }
            Ok(RasterImage {
                width: 4,
                height: 4,
                format: options.format,
                data: vec![page_index as u8; 16],
            })
        }
    }
}
