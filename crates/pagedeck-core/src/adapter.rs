//! Document model adapter over lopdf.
//!
//! Provides the load / page-count / copy-pages / compose / serialize
//! contract the assembler builds on. Copied pages are transferable handles
//! bound to no document; `compose` imports each contributing object graph
//! once, remapping object ids past the destination's high-water mark so
//! references never collide.

use crate::error::PageDeckError;
use lopdf::{dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// An editable in-memory document.
pub struct DocumentHandle {
    doc: Document,
}

/// One copied page, detached from its source document. Handles copied from
/// the same `copy_pages` call share a snapshot of the source object graph,
/// so composing many pages of one document imports that graph only once.
#[derive(Clone)]
pub struct PageHandle {
    objects: Arc<BTreeMap<ObjectId, Object>>,
    page_id: ObjectId,
    max_id: u32,
}

impl DocumentHandle {
    /// Parse bytes into an editable model.
    pub fn load(bytes: &[u8]) -> Result<Self, PageDeckError> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| PageDeckError::InvalidFormat(e.to_string()))?;
        Ok(Self { doc })
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Duplicate the pages at the given 0-based indices, in the given order.
    /// Indices may repeat; every index must be in bounds.
    pub fn copy_pages(&self, indices: &[u32]) -> Result<Vec<PageHandle>, PageDeckError> {
        let pages = self.doc.get_pages();
        let count = pages.len() as u32;

        let objects = Arc::new(self.doc.objects.clone());
        let max_id = self.doc.max_id;

        indices
            .iter()
            .map(|&index| {
                if index >= count {
                    return Err(PageDeckError::InvalidRange(format!(
                        "page index {} out of bounds (document has {} pages)",
                        index, count
                    )));
                }
                let page_id = *pages.get(&(index + 1)).ok_or_else(|| {
                    PageDeckError::Operation(format!("page {} missing from page tree", index + 1))
                })?;
                Ok(PageHandle {
                    objects: Arc::clone(&objects),
                    page_id,
                    max_id,
                })
            })
            .collect()
    }

    /// Serialize to final bytes. The output must itself be a loadable PDF;
    /// anything else is an integrity failure, never offered for download.
    pub fn serialize(&mut self) -> Result<Vec<u8>, PageDeckError> {
        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| PageDeckError::Integrity(e.to_string()))?;
        if !buffer.starts_with(b"%PDF-") {
            return Err(PageDeckError::Integrity("output missing PDF header".into()));
        }
        Ok(buffer)
    }
}

/// Build a new document whose page order is exactly the order of `handles`.
pub fn compose(handles: &[PageHandle]) -> Result<DocumentHandle, PageDeckError> {
    if handles.is_empty() {
        return Err(PageDeckError::EmptyDocument);
    }

    let mut dest = Document::with_version("1.7");
    let pages_id = dest.new_object_id();

    // Offset per already-imported source graph, keyed by snapshot identity.
    let mut imported: Vec<(*const BTreeMap<ObjectId, Object>, u32)> = Vec::new();
    let mut kids: Vec<ObjectId> = Vec::new();

    for handle in handles {
        let snapshot = Arc::as_ptr(&handle.objects);
        let offset = match imported.iter().find(|(ptr, _)| *ptr == snapshot) {
            Some((_, offset)) => *offset,
            None => {
                let offset = dest.max_id;
                for (old_id, object) in handle.objects.iter() {
                    let new_id = (old_id.0 + offset, old_id.1);
                    dest.objects
                        .insert(new_id, remap_object_refs(object.clone(), offset));
                }
                dest.max_id = dest.max_id.max(handle.max_id + offset);
                imported.push((snapshot, offset));
                offset
            }
        };

        let page_ref = (handle.page_id.0 + offset, handle.page_id.1);

        // A repeated index reuses the already-imported page object; give the
        // duplicate its own page node so the Kids array stays reference-unique.
        let final_ref = if kids.contains(&page_ref) {
            let duplicate = dest
                .objects
                .get(&page_ref)
                .cloned()
                .ok_or_else(|| PageDeckError::Operation("copied page object missing".into()))?;
            dest.add_object(duplicate)
        } else {
            page_ref
        };

        // Attributes the page inherited from its old parent chain must move
        // onto the page itself before the chain is cut.
        let inherited: Vec<(&[u8], Object)> = INHERITABLE_KEYS
            .iter()
            .filter_map(|&key| {
                inherited_attribute(&handle.objects, handle.page_id, key)
                    .map(|value| (key, remap_object_refs(value, offset)))
            })
            .collect();

        if let Some(Object::Dictionary(dict)) = dest.objects.get_mut(&final_ref) {
            for (key, value) in inherited {
                if dict.get(key).is_err() {
                    dict.set(key, value);
                }
            }
            dict.set("Parent", Object::Reference(pages_id));
        }
        kids.push(final_ref);
    }

    let kid_refs: Vec<Object> = kids.iter().map(|&id| Object::Reference(id)).collect();
    dest.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kid_refs,
        }),
    );

    let catalog_id = dest.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    dest.trailer.set("Root", Object::Reference(catalog_id));

    // Drop whatever the imports carried that the new page tree never reaches.
    dest.prune_objects();
    dest.compress();

    Ok(DocumentHandle { doc: dest })
}

/// Page-tree attributes a page may inherit from an ancestor node.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Resolve `key` for `page_id` by walking the source page tree upward,
/// skipping levels where the page defines the attribute itself.
fn inherited_attribute(
    objects: &BTreeMap<ObjectId, Object>,
    page_id: ObjectId,
    key: &[u8],
) -> Option<Object> {
    let mut current = page_id;
    let mut depth = 0;
    loop {
        // Malformed parent cycles must not hang composition.
        if depth > 64 {
            return None;
        }
        depth += 1;

        let dict = objects.get(&current)?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            // Defined at page level: nothing to pull down.
            if depth == 1 {
                return None;
            }
            return Some(value.clone());
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
}

/// Recursively shift every object reference by `offset`.
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(value.clone(), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(value.clone(), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}
