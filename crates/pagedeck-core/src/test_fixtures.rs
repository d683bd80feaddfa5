//! Shared test helpers for building and breaking in-memory PDF fixtures.

use lopdf::{Dictionary, Document, Object};

/// Create a simple PDF with N pages containing identifiable text markers
/// of the form `{prefix}-Page-{n}` (1-based).
pub fn create_test_pdf(num_pages: u32, content_prefix: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let catalog_id = doc.new_object_id();

    let mut page_ids = Vec::new();

    for page_num in 0..num_pages {
        let page_id = doc.new_object_id();
        let content_id = doc.new_object_id();

        let content = format!(
            "BT /F1 12 Tf 50 700 Td ({}-Page-{}) Tj ET",
            content_prefix,
            page_num + 1
        );
        doc.objects.insert(
            content_id,
            Object::Stream(lopdf::Stream::new(Dictionary::new(), content.into_bytes())),
        );

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_id));
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ]),
        );

        doc.objects.insert(page_id, Object::Dictionary(page_dict));
        page_ids.push(Object::Reference(page_id));
    }

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(num_pages as i64));
    pages_dict.set("Kids", Object::Array(page_ids));
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog_dict = Dictionary::new();
    catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog_dict.set("Pages", Object::Reference(pages_id));
    doc.objects
        .insert(catalog_id, Object::Dictionary(catalog_dict));

    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Collect the text markers produced by [`create_test_pdf`] from each page,
/// in page order.
pub fn page_markers(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    let pages = doc.get_pages();
    let mut markers = Vec::new();

    for page_num in pages.keys() {
        let content = doc.get_page_content(pages[page_num]).unwrap();
        let decoded = lopdf::content::Content::decode(&content).unwrap();
        for op in decoded.operations {
            if op.operator == "Tj" {
                if let Some(Object::String(text, _)) = op.operands.first() {
                    markers.push(String::from_utf8_lossy(text).into_owned());
                }
            }
        }
    }
    markers
}

/// Corrupt a serialized PDF's cross-reference table so the strict parser
/// rejects it while the byte stream remains mostly intact.
pub fn corrupt_xref(mut bytes: Vec<u8>) -> Vec<u8> {
    let needle = b"xref";
    if let Some(pos) = bytes
        .windows(needle.len())
        .rposition(|window| window == needle)
    {
        bytes[pos..pos + needle.len()].copy_from_slice(b"zzzz");
    }
    bytes
}

/// True when a pdfium library is present; lenient-path tests return early
/// without it instead of failing.
pub fn pdfium_available() -> bool {
    crate::lenient::bind_session().is_ok()
}
