//! Per-page geometry used for previews and overlay placement.

use crate::error::PageDeckError;
use lopdf::{Dictionary, Document, Object};
use serde::Serialize;

/// Geometry of a single page, in PDF points.
#[derive(Debug, Clone, Serialize)]
pub struct PageMetrics {
    /// Page number (1-indexed)
    pub page_num: u32,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees: 0, 90, 180 or 270
    pub rotation: i32,
    pub orientation: Orientation,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
    Square,
}

impl PageMetrics {
    pub fn from_document(doc: &Document, page_num: u32) -> Result<Self, PageDeckError> {
        let pages = doc.get_pages();
        let page_id = pages.get(&page_num).ok_or_else(|| {
            PageDeckError::InvalidRange(format!("page {} not found", page_num))
        })?;

        let page_dict = doc
            .objects
            .get(page_id)
            .and_then(|obj| obj.as_dict().ok())
            .ok_or_else(|| {
                PageDeckError::Operation(format!("page {} is not a dictionary", page_num))
            })?;

        let media_box = resolve_media_box(doc, page_dict);
        let width = media_box[2] - media_box[0];
        let height = media_box[3] - media_box[1];
        let rotation = resolve_rotation(doc, page_dict);

        Ok(Self {
            page_num,
            width,
            height,
            rotation,
            orientation: orientation_of(width, height, rotation),
        })
    }
}

fn orientation_of(width: f64, height: f64, rotation: i32) -> Orientation {
    let (w, h) = if rotation == 90 || rotation == 270 {
        (height, width)
    } else {
        (width, height)
    };
    if (w - h).abs() < 1.0 {
        Orientation::Square
    } else if w > h {
        Orientation::Landscape
    } else {
        Orientation::Portrait
    }
}

/// MediaBox from the page, its parent, or US Letter as a last resort.
fn resolve_media_box(doc: &Document, page_dict: &Dictionary) -> [f64; 4] {
    dict_chain(doc, page_dict)
        .find_map(|dict| {
            dict.get(b"MediaBox")
                .ok()
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| parse_box(array))
        })
        .unwrap_or([0.0, 0.0, 612.0, 792.0])
}

fn resolve_rotation(doc: &Document, page_dict: &Dictionary) -> i32 {
    dict_chain(doc, page_dict)
        .find_map(|dict| {
            dict.get(b"Rotate")
                .ok()
                .and_then(|obj| obj.as_i64().ok())
                .map(|angle| (angle as i32).rem_euclid(360))
        })
        .unwrap_or(0)
}

/// The page dictionary followed by its ancestors, bounded against cycles.
fn dict_chain<'a>(
    doc: &'a Document,
    page_dict: &'a Dictionary,
) -> impl Iterator<Item = &'a Dictionary> {
    std::iter::successors(Some(page_dict), move |dict| {
        dict.get(b"Parent")
            .ok()
            .and_then(|obj| obj.as_reference().ok())
            .and_then(|id| doc.objects.get(&id))
            .and_then(|obj| obj.as_dict().ok())
    })
    .take(64)
}

fn parse_box(array: &[Object]) -> Option<[f64; 4]> {
    if array.len() != 4 {
        return None;
    }
    let mut result = [0.0; 4];
    for (i, obj) in array.iter().enumerate() {
        result[i] = match obj {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => return None,
        };
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::create_test_pdf;

    #[test]
    fn test_metrics_from_fixture() {
        let doc = Document::load_mem(&create_test_pdf(2, "M")).unwrap();
        let metrics = PageMetrics::from_document(&doc, 1).unwrap();
        assert_eq!(metrics.width, 612.0);
        assert_eq!(metrics.height, 792.0);
        assert_eq!(metrics.rotation, 0);
        assert_eq!(metrics.orientation, Orientation::Portrait);
    }

    #[test]
    fn test_missing_page_is_an_error() {
        let doc = Document::load_mem(&create_test_pdf(1, "M")).unwrap();
        assert!(PageMetrics::from_document(&doc, 5).is_err());
    }

    #[test]
    fn test_orientation_accounts_for_rotation() {
        assert_eq!(orientation_of(612.0, 792.0, 0), Orientation::Portrait);
        assert_eq!(orientation_of(612.0, 792.0, 90), Orientation::Landscape);
        assert_eq!(orientation_of(100.0, 100.5, 0), Orientation::Square);
    }

    #[test]
    fn test_negative_rotation_normalized() {
        assert_eq!((-90i32).rem_euclid(360), 270);
    }
}
