//! Raster overlay placement (signature and stamp images).
//!
//! An overlay is captured in canvas pixels on a preview of a page. Before it
//! is drawn the placement is converted to PDF points with the y axis flipped,
//! since canvas coordinates grow downward from the top-left while PDF
//! coordinates grow upward from the bottom-left.

use crate::error::PageDeckError;
use crate::pages::PageMetrics;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

/// Where an overlay goes, expressed in the preview canvas's pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPlacement {
    /// 0-based page index in the target document.
    pub page_index: u32,
    /// Top-left corner of the overlay on the canvas.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub canvas_width: f64,
    pub canvas_height: f64,
}

impl OverlayPlacement {
    /// Convert to PDF points: `(x, y, width, height)` with `(x, y)` the
    /// bottom-left corner of the overlay.
    pub fn to_page_space(&self, page_width: f64, page_height: f64) -> (f64, f64, f64, f64) {
        let sx = page_width / self.canvas_width;
        let sy = page_height / self.canvas_height;
        let w = self.width * sx;
        let h = self.height * sy;
        let x = self.x * sx;
        let y = page_height - self.y * sy - h;
        (x, y, w, h)
    }

    fn validate(&self) -> Result<(), PageDeckError> {
        if self.canvas_width <= 0.0 || self.canvas_height <= 0.0 {
            return Err(PageDeckError::InvalidRange(
                "canvas dimensions must be positive".into(),
            ));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(PageDeckError::InvalidRange(
                "overlay dimensions must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// An overlay image together with its placement.
#[derive(Debug, Clone)]
pub struct OverlaySpec {
    pub placement: OverlayPlacement,
    /// PNG-encoded image, typically with an alpha channel.
    pub image_png: Vec<u8>,
}

/// Draw the overlay onto its target page and return the new document bytes.
/// The input bytes are never modified.
pub fn apply_overlay(bytes: &[u8], spec: &OverlaySpec) -> Result<Vec<u8>, PageDeckError> {
    spec.placement.validate()?;

    let mut doc =
        Document::load_mem(bytes).map_err(|e| PageDeckError::InvalidFormat(e.to_string()))?;

    let page_num = spec.placement.page_index + 1;
    let page_id = *doc.get_pages().get(&page_num).ok_or_else(|| {
        PageDeckError::InvalidRange(format!("page {} not found", page_num))
    })?;

    let metrics = PageMetrics::from_document(&doc, page_num)?;
    let (x, y, w, h) = spec
        .placement
        .to_page_space(metrics.width, metrics.height);

    let image = image::load_from_memory(&spec.image_png)
        .map_err(|e| PageDeckError::InvalidFormat(format!("overlay image: {}", e)))?
        .to_rgba8();
    let (img_w, img_h) = image.dimensions();

    let xobject_id = add_image_xobject(&mut doc, &image, img_w, img_h)?;
    let name = register_xobject(&mut doc, page_id, xobject_id)?;
    append_draw_ops(&mut doc, page_id, &name, x, y, w, h)?;

    tracing::debug!(page = page_num, x, y, w, h, "overlay applied");

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PageDeckError::Integrity(e.to_string()))?;
    Ok(buffer)
}

/// Store the RGBA image as a FlateDecode RGB XObject with a DeviceGray soft
/// mask carrying the alpha channel.
fn add_image_xobject(
    doc: &mut Document,
    image: &image::RgbaImage,
    width: u32,
    height: u32,
) -> Result<ObjectId, PageDeckError> {
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in image.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        deflate(&alpha)?,
    ));

    Ok(doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
            "SMask" => Object::Reference(smask_id),
        },
        deflate(&rgb)?,
    )))
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, PageDeckError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| PageDeckError::Operation(format!("compress overlay image: {}", e)))
}

/// Register the XObject under an unused name in the page's own Resources
/// dictionary, materializing one if the page relied on inheritance.
fn register_xobject(
    doc: &mut Document,
    page_id: ObjectId,
    xobject_id: ObjectId,
) -> Result<String, PageDeckError> {
    // Resources may be inline, a reference, or inherited from an ancestor.
    let resources_ref = {
        let page_dict = page_dict(doc, page_id)?;
        match page_dict.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    let resources = match resources_ref {
        Some(id) => doc
            .objects
            .get_mut(&id)
            .and_then(|obj| obj.as_dict_mut().ok())
            .ok_or_else(|| PageDeckError::Operation("resources reference broken".into()))?,
        None => {
            // Materializing Resources on the page must carry the inherited
            // value down, or fonts defined on an ancestor disappear.
            let inherited = inherited_resources(doc, page_id);
            let page_dict = page_dict_mut(doc, page_id)?;
            if page_dict.get(b"Resources").is_err() {
                page_dict.set("Resources", inherited.unwrap_or_default());
            }
            page_dict
                .get_mut(b"Resources")
                .ok()
                .and_then(|obj| obj.as_dict_mut().ok())
                .ok_or_else(|| PageDeckError::Operation("page resources not a dictionary".into()))?
        }
    };

    if resources.get(b"XObject").is_err() {
        resources.set("XObject", Dictionary::new());
    }
    let xobjects = resources
        .get_mut(b"XObject")
        .ok()
        .and_then(|obj| obj.as_dict_mut().ok())
        .ok_or_else(|| PageDeckError::Operation("XObject entry not a dictionary".into()))?;

    let mut n = 0;
    let name = loop {
        let candidate = format!("Ovl{}", n);
        if xobjects.get(candidate.as_bytes()).is_err() {
            break candidate;
        }
        n += 1;
    };
    xobjects.set(name.as_bytes(), Object::Reference(xobject_id));
    Ok(name)
}

/// Resolve Resources from the page's ancestors, dereferencing if needed.
fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut current = page_id;
    for _ in 0..64 {
        let dict = doc.objects.get(&current)?.as_dict().ok()?;
        if current != page_id {
            if let Ok(value) = dict.get(b"Resources") {
                return match value {
                    Object::Dictionary(d) => Some(d.clone()),
                    Object::Reference(id) => doc
                        .objects
                        .get(id)
                        .and_then(|obj| obj.as_dict().ok())
                        .cloned(),
                    _ => None,
                };
            }
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// Append a content stream that draws the named XObject inside the given
/// rectangle, wrapped in a graphics-state save/restore.
fn append_draw_ops(
    doc: &mut Document,
    page_id: ObjectId,
    name: &str,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
) -> Result<(), PageDeckError> {
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(w as f32),
                    Object::Real(0.0),
                    Object::Real(0.0),
                    Object::Real(h as f32),
                    Object::Real(x as f32),
                    Object::Real(y as f32),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| PageDeckError::Operation(format!("encode overlay ops: {}", e)))?;
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let page = page_dict_mut(doc, page_id)?;
    let contents = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => {
            vec![Object::Reference(*id), Object::Reference(stream_id)]
        }
        Ok(Object::Array(existing)) => {
            let mut arr = existing.clone();
            arr.push(Object::Reference(stream_id));
            arr
        }
        _ => vec![Object::Reference(stream_id)],
    };
    page.set("Contents", Object::Array(contents));
    Ok(())
}

fn page_dict(doc: &Document, page_id: ObjectId) -> Result<&Dictionary, PageDeckError> {
    doc.objects
        .get(&page_id)
        .and_then(|obj| obj.as_dict().ok())
        .ok_or_else(|| PageDeckError::Operation("page is not a dictionary".into()))
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, PageDeckError> {
    doc.objects
        .get_mut(&page_id)
        .and_then(|obj| obj.as_dict_mut().ok())
        .ok_or_else(|| PageDeckError::Operation("page is not a dictionary".into()))
}
