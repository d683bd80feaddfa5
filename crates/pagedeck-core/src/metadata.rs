//! Document information dictionary access.
//!
//! Reads and writes the trailer `/Info` fields. Keywords are exposed as a
//! list, stored in the document as a single comma-separated string.

use crate::document;
use crate::error::PageDeckError;
use crate::loader;
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};

/// Document metadata fields. `None` means "absent" on read and "leave
/// untouched" on write; an empty string or empty list is a real value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub keywords: Option<Vec<String>>,
}

/// Read the metadata fields present in the document.
pub fn read_metadata(bytes: &[u8]) -> Result<DocumentMetadata, PageDeckError> {
    let doc = loader::load(bytes)?.into_document();

    let Some(info) = info_dict(&doc) else {
        return Ok(DocumentMetadata::default());
    };

    Ok(DocumentMetadata {
        title: string_field(&info, b"Title"),
        author: string_field(&info, b"Author"),
        subject: string_field(&info, b"Subject"),
        creator: string_field(&info, b"Creator"),
        keywords: string_field(&info, b"Keywords").map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_owned)
                .collect()
        }),
    })
}

/// Write the `Some` fields of `metadata` into the document's `/Info`
/// dictionary, creating it if absent. `None` fields keep their existing
/// values; `Some("")` and `Some(vec![])` overwrite with an empty value.
pub fn write_metadata(bytes: &[u8], metadata: &DocumentMetadata) -> Result<Vec<u8>, PageDeckError> {
    let mut doc = loader::load(bytes)?.into_document();
    let info_id = ensure_info_id(&mut doc)?;

    let keywords_joined = metadata.keywords.as_ref().map(|list| list.join(", "));

    if let Ok(Object::Dictionary(info)) = doc.get_object_mut(info_id) {
        set_string_field(info, "Title", metadata.title.as_deref());
        set_string_field(info, "Author", metadata.author.as_deref());
        set_string_field(info, "Subject", metadata.subject.as_deref());
        set_string_field(info, "Creator", metadata.creator.as_deref());
        set_string_field(info, "Keywords", keywords_joined.as_deref());
    }

    doc.compress();
    document::save_to_bytes(doc)
}

fn info_dict(doc: &Document) -> Option<Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc
            .get_object(*id)
            .ok()
            .and_then(|obj| obj.as_dict().ok())
            .cloned(),
        Object::Dictionary(dict) => Some(dict.clone()),
        _ => None,
    }
}

/// Resolve the `/Info` dictionary to an indirect object id, creating an
/// empty one (and hoisting an inline dictionary) if needed.
fn ensure_info_id(doc: &mut Document) -> Result<ObjectId, PageDeckError> {
    match doc.trailer.get(b"Info").ok().cloned() {
        Some(Object::Reference(id)) if matches!(doc.get_object(id), Ok(Object::Dictionary(_))) => {
            Ok(id)
        }
        Some(Object::Dictionary(dict)) => {
            let id = doc.add_object(Object::Dictionary(dict));
            doc.trailer.set("Info", Object::Reference(id));
            Ok(id)
        }
        _ => {
            let id = doc.add_object(Object::Dictionary(Dictionary::new()));
            doc.trailer.set("Info", Object::Reference(id));
            Ok(id)
        }
    }
}

/// Decode a string entry, preferring UTF-8 and falling back to Latin-1 for
/// legacy producers.
fn string_field(info: &Dictionary, key: &[u8]) -> Option<String> {
    match info.get(key).ok()? {
        Object::String(bytes, _) => Some(match String::from_utf8(bytes.clone()) {
            Ok(text) => text,
            Err(_) => bytes.iter().map(|&b| b as char).collect(),
        }),
        _ => None,
    }
}

fn set_string_field(info: &mut Dictionary, key: &str, value: Option<&str>) {
    if let Some(text) = value {
        info.set(key, Object::string_literal(text));
    }
}
