//! Shared test fixtures: minimal in-memory PDFs with identifiable content.

use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, Stream};

/// Build a valid PDF with `num_pages` pages. Each page carries a text
/// content stream of the form `{prefix}-Page-{n}` so output page order can
/// be asserted after composition.
pub fn create_test_pdf(num_pages: u32, prefix: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();

    for i in 0..num_pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
                ),
                Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("{}-Page-{}", prefix, i + 1).into_bytes(),
                        lopdf::StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().expect("encode content"),
        ));

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
        ]);
        let page_id = doc.add_object(page);
        page_ids.push(page_id);
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(num_pages as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("save test pdf");
    buffer
}

/// Decode the text marker (`{prefix}-Page-{n}`) from page `page_num`
/// (1-indexed) of a serialized document.
pub fn page_marker(bytes: &[u8], page_num: u32) -> String {
    let doc = Document::load_mem(bytes).expect("load output pdf");
    let pages = doc.get_pages();
    let page_id = *pages.get(&page_num).expect("page exists");
    let content = doc.get_page_content(page_id).expect("page content");
    let text = String::from_utf8_lossy(&content);

    // The Tj operand is the only literal string in the fixture stream.
    let start = text.find('(').expect("literal string start") + 1;
    let end = text[start..].find(')').expect("literal string end") + start;
    text[start..end].to_string()
}

/// Encode a small RGBA PNG usable as a signature overlay image.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .expect("encode test png");
    bytes
}
