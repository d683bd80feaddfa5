//! Shared lopdf plumbing: page-tree access, inheritable attributes,
//! resource registration, and content-stream appending.

use crate::error::PageDeckError;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Page attributes that may live on an ancestor node of the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Depth limit when walking `/Parent` chains on malformed trees.
const MAX_TREE_DEPTH: usize = 32;

/// Create a document containing an empty page tree. Returns the document
/// and the object id of its `/Pages` root.
pub(crate) fn empty_document() -> (Document, ObjectId) {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(vec![])),
        ("Count", Object::Integer(0)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    (doc, pages_id)
}

/// Page object ids in page order (0-based position == page index).
pub(crate) fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

pub(crate) fn validate_index(index: usize, page_count: usize) -> Result<(), PageDeckError> {
    if index >= page_count {
        return Err(PageDeckError::InvalidPageReference { index, page_count });
    }
    Ok(())
}

/// Resolve the `/Pages` root referenced by the document catalog.
pub(crate) fn pages_root(doc: &Document) -> Result<ObjectId, PageDeckError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| PageDeckError::Operation("No Root reference in trailer".into()))?;

    doc.get_object(catalog_id)
        .and_then(Object::as_dict)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| PageDeckError::Operation("Catalog has no Pages reference".into()))
}

/// Rewrite the page tree root to reference exactly `kids`, in order, and
/// repoint each kid's `/Parent` at the root. Duplicate kids are allowed.
pub(crate) fn set_page_tree(
    doc: &mut Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
) -> Result<(), PageDeckError> {
    let count = kids.len();

    for &kid in &kids {
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(kid) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    match doc.get_object_mut(pages_id) {
        Ok(Object::Dictionary(pages)) => {
            pages.set(
                "Kids",
                Object::Array(kids.into_iter().map(Object::Reference).collect()),
            );
            pages.set("Count", Object::Integer(count as i64));
            Ok(())
        }
        _ => Err(PageDeckError::Operation(
            "Pages root is not a dictionary".into(),
        )),
    }
}

/// Look up a page attribute, falling back to the `/Parent` chain for
/// inheritable keys. One level of indirection is resolved so the returned
/// clone stays valid if the tree is later pruned.
pub(crate) fn page_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return match value {
                Object::Reference(id) => doc.get_object(*id).ok().cloned(),
                other => Some(other.clone()),
            };
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// Copy inherited attributes down onto the page itself, so the page stays
/// intact when intermediate tree nodes are pruned away.
pub(crate) fn flatten_inherited_attributes(doc: &mut Document, page_id: ObjectId) {
    let mut pending: Vec<(&[u8], Object)> = Vec::new();

    if let Ok(page) = doc.get_object(page_id).and_then(Object::as_dict) {
        for key in INHERITABLE_KEYS {
            if page.get(key).is_err() {
                if let Some(value) = page_attribute(doc, page_id, key) {
                    pending.push((key, value));
                }
            }
        }
    }

    if pending.is_empty() {
        return;
    }
    if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
        for (key, value) in pending {
            page.set(key.to_vec(), value);
        }
    }
}

/// The page's media box in points, `[x0, y0, x1, y1]`. Defaults to US
/// Letter when the entry is missing or malformed.
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let fallback = [0.0, 0.0, 612.0, 792.0];

    let Some(Object::Array(values)) = page_attribute(doc, page_id, b"MediaBox") else {
        return fallback;
    };
    if values.len() != 4 {
        return fallback;
    }

    let mut parsed = [0.0f32; 4];
    for (slot, value) in parsed.iter_mut().zip(&values) {
        *slot = match value {
            Object::Integer(n) => *n as f32,
            Object::Real(r) => *r,
            _ => return fallback,
        };
    }
    parsed
}

/// Register an indirect object under a page's `/Resources`, e.g.
/// `add_page_resource(doc, page, b"Font", "F1", font_id)`. Handles inline,
/// referenced, and inherited resource dictionaries.
pub(crate) fn add_page_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &[u8],
    name: &str,
    target: ObjectId,
) -> Result<(), PageDeckError> {
    flatten_inherited_attributes(doc, page_id);

    let resources = doc
        .get_object(page_id)
        .ok()
        .and_then(|obj| obj.as_dict().ok())
        .and_then(|page| page.get(b"Resources").ok().cloned());

    match resources {
        None => {
            let mut category_dict = Dictionary::new();
            category_dict.set(name, Object::Reference(target));
            let mut res = Dictionary::new();
            res.set(category.to_vec(), Object::Dictionary(category_dict));
            set_page_entry(doc, page_id, b"Resources", Object::Dictionary(res))
        }
        Some(Object::Dictionary(mut res)) => {
            upsert_category(doc, &mut res, category, name, target);
            set_page_entry(doc, page_id, b"Resources", Object::Dictionary(res))
        }
        Some(Object::Reference(res_id)) => {
            let mut res = doc
                .get_object(res_id)
                .and_then(Object::as_dict)
                .map(Dictionary::clone)
                .map_err(|_| {
                    PageDeckError::Operation("Page Resources reference is not a dictionary".into())
                })?;
            upsert_category(doc, &mut res, category, name, target);
            if let Ok(Object::Dictionary(stored)) = doc.get_object_mut(res_id) {
                *stored = res;
            }
            Ok(())
        }
        Some(_) => Err(PageDeckError::Operation(
            "Page Resources is not a dictionary".into(),
        )),
    }
}

fn upsert_category(
    doc: &mut Document,
    resources: &mut Dictionary,
    category: &[u8],
    name: &str,
    target: ObjectId,
) {
    match resources.get(category).ok().cloned() {
        Some(Object::Reference(category_id)) => {
            if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(category_id) {
                dict.set(name, Object::Reference(target));
            }
        }
        Some(Object::Dictionary(mut dict)) => {
            dict.set(name, Object::Reference(target));
            resources.set(category.to_vec(), Object::Dictionary(dict));
        }
        _ => {
            let mut dict = Dictionary::new();
            dict.set(name, Object::Reference(target));
            resources.set(category.to_vec(), Object::Dictionary(dict));
        }
    }
}

fn set_page_entry(
    doc: &mut Document,
    page_id: ObjectId,
    key: &[u8],
    value: Object,
) -> Result<(), PageDeckError> {
    match doc.get_object_mut(page_id) {
        Ok(Object::Dictionary(page)) => {
            page.set(key.to_vec(), value);
            Ok(())
        }
        _ => Err(PageDeckError::Operation(
            "Page object is not a dictionary".into(),
        )),
    }
}

/// Append a content stream after the page's existing `/Contents`. Existing
/// streams are never rewritten, only extended.
pub(crate) fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> Result<(), PageDeckError> {
    let content_id = doc.add_object(Object::Stream(lopdf::Stream::new(
        Dictionary::new(),
        content,
    )));

    let existing = doc
        .get_object(page_id)
        .ok()
        .and_then(|obj| obj.as_dict().ok())
        .and_then(|page| page.get(b"Contents").ok().cloned());

    let contents = match existing {
        Some(Object::Reference(existing_id)) => Object::Array(vec![
            Object::Reference(existing_id),
            Object::Reference(content_id),
        ]),
        Some(Object::Array(mut streams)) => {
            streams.push(Object::Reference(content_id));
            Object::Array(streams)
        }
        Some(Object::Stream(stream)) => {
            // Inline stream: hoist it so both can be referenced in order.
            let hoisted = doc.add_object(Object::Stream(stream));
            Object::Array(vec![
                Object::Reference(hoisted),
                Object::Reference(content_id),
            ])
        }
        _ => Object::Reference(content_id),
    };

    set_page_entry(doc, page_id, b"Contents", contents)
}

/// Serialize a finished document into a fresh byte buffer.
pub(crate) fn save_to_bytes(mut doc: Document) -> Result<Vec<u8>, PageDeckError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PageDeckError::Operation(format!("Failed to save PDF: {}", e)))?;
    Ok(buffer)
}
