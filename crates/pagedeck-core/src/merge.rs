//! Merge: concatenate the pages of several documents, in order.
//!
//! Each source is loaded through the repairing loader, so a malformed file
//! in the middle of the list degrades to its rasterized form instead of
//! failing the whole merge.

use crate::document;
use crate::error::PageDeckError;
use crate::loader;
use lopdf::Object;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Merge documents into one, preserving source order and page order within
/// each source.
///
/// The algorithm:
/// 1. Start from a fresh document with an empty page tree (so an empty
///    source list yields a valid zero-page document).
/// 2. For each source: load (repairing if needed), offset its object ids
///    past the destination's current maximum, import every object with
///    remapped references, and append its page ids to the running list.
/// 3. Rewrite the destination page tree from the accumulated list, prune
///    orphaned source tree nodes, compress, serialize.
pub fn merge_documents(documents: &[Vec<u8>]) -> Result<Vec<u8>, PageDeckError> {
    let (mut dest, pages_id) = document::empty_document();
    let mut dest_max_id = dest.max_id;
    let mut dest_page_refs = Vec::new();

    for (index, bytes) in documents.iter().enumerate() {
        let loaded = loader::load(bytes)?;
        if loaded.was_repaired() {
            info!(source = index, "merging rasterized repair of source");
        }
        let source = loaded.into_document();

        let source_pages = document::page_ids(&source);
        let id_offset = dest_max_id;

        let mut remapped_objects = BTreeMap::new();
        for (old_id, object) in source.objects.into_iter() {
            let new_id = (old_id.0 + id_offset, old_id.1);
            remapped_objects.insert(new_id, remap_object_refs(object, id_offset));
        }
        for (id, object) in remapped_objects {
            dest.objects.insert(id, object);
        }

        debug!(source = index, pages = source_pages.len(), "imported source");
        for old_page_ref in source_pages {
            dest_page_refs.push((old_page_ref.0 + id_offset, old_page_ref.1));
        }

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
    }

    dest.max_id = dest_max_id;

    // Inherited attributes live on source tree nodes that are about to be
    // pruned; pin them to the pages first.
    for &page_id in &dest_page_refs {
        document::flatten_inherited_attributes(&mut dest, page_id);
    }
    document::set_page_tree(&mut dest, pages_id, dest_page_refs)?;

    dest.prune_objects();
    dest.compress();
    document::save_to_bytes(dest)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{create_test_pdf, page_markers};
    use lopdf::Document;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_empty_list_yields_empty_document() {
        let merged = merge_documents(&[]).unwrap();
        let doc = Document::load_mem(&merged).unwrap();
        assert_eq!(doc.get_pages().len(), 0);
    }

    #[test]
    fn test_merge_single_document_keeps_pages() {
        let pdf = create_test_pdf(2, "Single");
        let merged = merge_documents(&[pdf]).unwrap();

        let doc = Document::load_mem(&merged).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
        assert_eq!(page_markers(&merged), vec!["Single-Page-1", "Single-Page-2"]);
    }

    #[test]
    fn test_merge_two_documents_combines_pages() {
        let doc_a = create_test_pdf(2, "DocA");
        let doc_b = create_test_pdf(3, "DocB");

        let merged = merge_documents(&[doc_a, doc_b]).unwrap();

        let doc = Document::load_mem(&merged).unwrap();
        assert_eq!(doc.get_pages().len(), 5, "Merged document should have 5 pages");
    }

    #[test]
    fn test_merge_multiple_documents() {
        let docs: Vec<Vec<u8>> = (0..5)
            .map(|i| create_test_pdf(1, &format!("Doc{}", i)))
            .collect();

        let merged = merge_documents(&docs).unwrap();

        let doc = Document::load_mem(&merged).unwrap();
        assert_eq!(doc.get_pages().len(), 5);
    }

    #[test]
    fn test_merge_preserves_page_order() {
        let doc1 = create_test_pdf(2, "First");
        let doc2 = create_test_pdf(1, "Second");
        let doc3 = create_test_pdf(2, "Third");

        let merged = merge_documents(&[doc1, doc2, doc3]).unwrap();

        assert_eq!(
            page_markers(&merged),
            vec![
                "First-Page-1",
                "First-Page-2",
                "Second-Page-1",
                "Third-Page-1",
                "Third-Page-2",
            ]
        );
    }

    #[test]
    fn test_merge_handles_different_sizes() {
        let doc1 = create_test_pdf(10, "Large");
        let doc2 = create_test_pdf(1, "Small");
        let doc3 = create_test_pdf(5, "Medium");

        let merged = merge_documents(&[doc1, doc2, doc3]).unwrap();

        let doc = Document::load_mem(&merged).unwrap();
        assert_eq!(doc.get_pages().len(), 16);
    }

    #[test]
    fn test_merged_document_is_valid_pdf() {
        let doc1 = create_test_pdf(2, "Valid1");
        let doc2 = create_test_pdf(2, "Valid2");

        let merged = merge_documents(&[doc1, doc2]).unwrap();

        let doc = Document::load_mem(&merged);
        assert!(doc.is_ok(), "Merged document should be valid PDF");
        assert_eq!(doc.unwrap().get_pages().len(), 4);
    }

    #[test]
    fn test_merge_rejects_garbage_source() {
        let good = create_test_pdf(1, "Good");
        let garbage = b"not a pdf at all".to_vec();

        // With no pdfium available the repair path fails too and the merge
        // surfaces Unparseable; with pdfium the bytes still fail to open.
        let result = merge_documents(&[good, garbage]);
        assert!(result.is_err());
    }
}
