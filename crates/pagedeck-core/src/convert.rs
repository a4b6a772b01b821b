//! Conversion between documents and raster images, plus archive bundling.

use crate::error::PageDeckError;
use crate::raster::{self, PageRasterizer, RasterImage, RasterOptions};
use crate::validate;
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Render quality for document-to-image conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityPreset {
    High,
    Balanced,
    Compressed,
}

impl QualityPreset {
    /// Multiplier over the page's native point dimensions.
    pub fn scale(&self) -> f32 {
        match self {
            QualityPreset::High => 2.0,
            QualityPreset::Balanced => 1.5,
            QualityPreset::Compressed => 1.0,
        }
    }

    pub fn jpeg_quality(&self) -> u8 {
        match self {
            QualityPreset::High => 95,
            QualityPreset::Balanced => 80,
            QualityPreset::Compressed => 60,
        }
    }

    pub fn options(&self) -> RasterOptions {
        RasterOptions::jpeg(self.scale(), self.jpeg_quality())
    }
}

/// Result of converting a document's pages to images. Pages that failed to
/// render are listed rather than aborting the whole conversion.
#[derive(Debug)]
pub struct ConversionOutcome {
    /// `(page_number, image)` pairs, 1-indexed, in page order.
    pub images: Vec<(u32, RasterImage)>,
    pub failed_pages: Vec<u32>,
}

/// Render every page of the document as a JPEG at the given preset.
pub fn pdf_to_images(
    rasterizer: &dyn PageRasterizer,
    bytes: &[u8],
    preset: QualityPreset,
) -> Result<ConversionOutcome, PageDeckError> {
    let info = validate::inspect(bytes)?;
    let options = preset.options();

    let mut images = Vec::new();
    let mut failed_pages = Vec::new();
    for (index, result) in raster::rasterize_all(rasterizer, bytes, info.page_count, &options)
        .into_iter()
        .enumerate()
    {
        let page_num = index as u32 + 1;
        match result {
            Ok(image) => images.push((page_num, image)),
            Err(err) => {
                tracing::warn!(page = page_num, error = %err, "page skipped during conversion");
                failed_pages.push(page_num);
            }
        }
    }

    if images.is_empty() {
        return Err(PageDeckError::Rasterization {
            page: 1,
            reason: "no page could be rendered".into(),
        });
    }
    Ok(ConversionOutcome {
        images,
        failed_pages,
    })
}

/// Deflated ZIP archive from named byte entries.
pub fn bundle_files(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, PageDeckError> {
    if entries.is_empty() {
        return Err(PageDeckError::EmptyDocument);
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in entries {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| PageDeckError::Operation(format!("archive entry {}: {}", name, e)))?;
        writer
            .write_all(bytes)
            .map_err(|e| PageDeckError::Operation(format!("archive write: {}", e)))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| PageDeckError::Operation(format!("archive finish: {}", e)))?;
    Ok(cursor.into_inner())
}

/// Bundle converted page images into one archive. Entries are named
/// `{base}_page_{n}.jpg` (or `.png`) after the source document.
pub fn bundle_images(base: &str, images: &[(u32, RasterImage)]) -> Result<Vec<u8>, PageDeckError> {
    let entries: Vec<(String, Vec<u8>)> = images
        .iter()
        .map(|(page_num, image)| {
            let ext = match image.format {
                crate::raster::RasterFormat::Png => "png",
                crate::raster::RasterFormat::Jpeg { .. } => "jpg",
            };
            (
                format!("{}_page_{}.{}", base, page_num, ext),
                image.data.clone(),
            )
        })
        .collect();
    bundle_files(&entries)
}

/// Archive name for a bundle produced from `original`.
pub fn archive_name(original: &str) -> String {
    let base = original
        .strip_suffix(".pdf")
        .or_else(|| original.strip_suffix(".PDF"))
        .unwrap_or(original);
    format!("{}_images.zip", base)
}

/// Build a document with one page per input image. JPEG inputs are embedded
/// as-is (DCTDecode); everything else is decoded and deflated. Each page's
/// MediaBox matches the image's pixel dimensions, one pixel per point.
pub fn images_to_pdf(images: &[(String, Vec<u8>)]) -> Result<Vec<u8>, PageDeckError> {
    if images.is_empty() {
        return Err(PageDeckError::EmptyDocument);
    }

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for (name, bytes) in images {
        let format = image::guess_format(bytes)
            .map_err(|e| PageDeckError::InvalidFormat(format!("{}: {}", name, e)))?;
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| PageDeckError::InvalidFormat(format!("{}: {}", name, e)))?;
        let (width, height) = (decoded.width(), decoded.height());

        // Pass JPEG data through untouched only when its component count
        // maps directly onto a PDF color space. Anything else (CMYK in
        // particular) is decoded and re-encoded instead.
        let passthrough = match format {
            image::ImageFormat::Jpeg => match jpeg_components(bytes) {
                Some(1) => Some("DeviceGray"),
                Some(3) => Some("DeviceRGB"),
                _ => None,
            },
            _ => None,
        };

        let xobject = match passthrough {
            Some(color_space) => Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width as i64,
                    "Height" => height as i64,
                    "ColorSpace" => color_space,
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                bytes.clone(),
            ),
            None => {
                let rgb = decoded.to_rgb8();
                Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => width as i64,
                        "Height" => height as i64,
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8,
                        "Filter" => "FlateDecode",
                    },
                    deflate(rgb.as_raw())?,
                )
            }
        };
        let image_id = doc.add_object(xobject);

        let content = lopdf::content::Content {
            operations: vec![
                lopdf::content::Operation::new("q", vec![]),
                lopdf::content::Operation::new(
                    "cm",
                    vec![
                        Object::Real(width as f32),
                        Object::Real(0.0),
                        Object::Real(0.0),
                        Object::Real(height as f32),
                        Object::Real(0.0),
                        Object::Real(0.0),
                    ],
                ),
                lopdf::content::Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                lopdf::content::Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content
                .encode()
                .map_err(|e| PageDeckError::Operation(format!("encode page ops: {}", e)))?,
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(width as i64),
                Object::Integer(height as i64),
            ],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => Object::Reference(image_id) },
            },
            "Contents" => Object::Reference(content_id),
        });
        kids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PageDeckError::Integrity(e.to_string()))?;
    Ok(buffer)
}

/// Component count from the JPEG's SOF header. The decoded color type is no
/// guide here: decoders fold CMYK into RGB before handing pixels back.
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    let mut i = 2;
    while i + 3 < bytes.len() {
        if bytes[i] != 0xFF {
            return None;
        }
        let marker = bytes[i + 1];
        // Fill bytes and standalone markers carry no length field.
        if marker == 0xFF {
            i += 1;
            continue;
        }
        if marker == 0x01 || (0xD0..=0xD9).contains(&marker) {
            i += 2;
            continue;
        }
        if matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF) {
            // SOF payload: precision, height, width, component count.
            return bytes.get(i + 9).copied();
        }
        let len = u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]) as usize;
        i += 2 + len;
    }
    None
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, PageDeckError> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| PageDeckError::Operation(format!("compress image data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::fake::FakeRasterizer;
    use crate::test_pdf::{create_test_pdf, create_test_png};

    #[test]
    fn test_preset_parameters() {
        assert_eq!(QualityPreset::High.scale(), 2.0);
        assert_eq!(QualityPreset::High.jpeg_quality(), 95);
        assert_eq!(QualityPreset::Compressed.scale(), 1.0);
        assert_eq!(QualityPreset::Compressed.jpeg_quality(), 60);
    }

    #[test]
    fn test_pdf_to_images_numbers_pages() {
        let pdf = create_test_pdf(3, "X");
        let outcome =
            pdf_to_images(&FakeRasterizer::new(), &pdf, QualityPreset::Balanced).unwrap();
        let numbers: Vec<u32> = outcome.images.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(outcome.failed_pages.is_empty());
    }

    #[test]
    fn test_pdf_to_images_partial_failure() {
        let pdf = create_test_pdf(3, "X");
        let outcome =
            pdf_to_images(&FakeRasterizer::failing_on(&[1]), &pdf, QualityPreset::High).unwrap();
        let numbers: Vec<u32> = outcome.images.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(outcome.failed_pages, vec![2]);
    }

    #[test]
    fn test_pdf_to_images_total_failure() {
        let pdf = create_test_pdf(2, "X");
        let result = pdf_to_images(
            &FakeRasterizer::failing_on(&[0, 1]),
            &pdf,
            QualityPreset::High,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_bundle_files_round_trip() {
        let entries = vec![
            ("one.txt".to_string(), b"first".to_vec()),
            ("two.txt".to_string(), b"second".to_vec()),
        ];
        let archive = bundle_files(&entries).unwrap();

        let mut reader = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        assert_eq!(reader.len(), 2);
        let mut content = String::new();
        std::io::Read::read_to_string(&mut reader.by_name("two.txt").unwrap(), &mut content)
            .unwrap();
        assert_eq!(content, "second");
    }

    #[test]
    fn test_bundle_images_entry_names() {
        let pdf = create_test_pdf(2, "X");
        let outcome =
            pdf_to_images(&FakeRasterizer::new(), &pdf, QualityPreset::Compressed).unwrap();
        let archive = bundle_images("scan", &outcome.images).unwrap();

        let reader = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        let names: Vec<&str> = reader.file_names().collect();
        assert!(names.contains(&"scan_page_1.jpg"));
        assert!(names.contains(&"scan_page_2.jpg"));
    }

    #[test]
    fn test_archive_name() {
        assert_eq!(archive_name("report.pdf"), "report_images.zip");
        assert_eq!(archive_name("plain"), "plain_images.zip");
    }

    #[test]
    fn test_images_to_pdf_from_png() {
        let images = vec![
            ("a.png".to_string(), create_test_png(10, 20)),
            ("b.png".to_string(), create_test_png(30, 15)),
        ];
        let bytes = images_to_pdf(&images).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);

        let metrics = crate::pages::PageMetrics::from_document(&doc, 1).unwrap();
        assert_eq!(metrics.width, 10.0);
        assert_eq!(metrics.height, 20.0);
    }

    fn encode_jpeg(gray: bool) -> Vec<u8> {
        let img = if gray {
            image::DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
                6,
                4,
                image::Luma([128]),
            ))
        } else {
            image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
                6,
                4,
                image::Rgb([10, 20, 30]),
            ))
        };
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Jpeg,
        )
        .unwrap();
        bytes
    }

    /// Dictionary of the image XObject embedded on page 1.
    fn embedded_image(bytes: &[u8]) -> Dictionary {
        let doc = Document::load_mem(bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let page = doc.objects.get(&page_id).unwrap().as_dict().unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_ref = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
        match doc.objects.get(&image_ref).unwrap() {
            Object::Stream(s) => s.dict.clone(),
            other => panic!("image xobject is not a stream: {:?}", other),
        }
    }

    #[test]
    fn test_jpeg_components_from_sof() {
        // SOI, APP0 (empty payload), SOF0 declaring 4 components.
        let cmyk_header = [
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00, 0xFF, 0xC0, 0x00, 0x0B, 0x08,
            0x00, 0x04, 0x00, 0x06, 0x04,
        ];
        assert_eq!(jpeg_components(&cmyk_header), Some(4));

        assert_eq!(jpeg_components(&encode_jpeg(false)), Some(3));
        assert_eq!(jpeg_components(&encode_jpeg(true)), Some(1));
        assert_eq!(jpeg_components(b"not a jpeg"), None);
    }

    #[test]
    fn test_images_to_pdf_rgb_jpeg_passthrough() {
        let bytes = images_to_pdf(&[("a.jpg".to_string(), encode_jpeg(false))]).unwrap();
        let dict = embedded_image(&bytes);
        assert_eq!(dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert_eq!(
            dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceRGB"
        );
    }

    #[test]
    fn test_images_to_pdf_gray_jpeg_passthrough() {
        let bytes = images_to_pdf(&[("g.jpg".to_string(), encode_jpeg(true))]).unwrap();
        let dict = embedded_image(&bytes);
        assert_eq!(dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert_eq!(
            dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceGray"
        );
    }

    #[test]
    fn test_images_to_pdf_png_reencoded() {
        let bytes = images_to_pdf(&[("a.png".to_string(), create_test_png(5, 5))]).unwrap();
        let dict = embedded_image(&bytes);
        assert_eq!(
            dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"FlateDecode"
        );
    }

    #[test]
    fn test_images_to_pdf_rejects_empty_and_garbage() {
        assert!(images_to_pdf(&[]).is_err());
        assert!(images_to_pdf(&[("x.png".to_string(), b"junk".to_vec())]).is_err());
    }
}
