//! Page extraction and reordering.
//!
//! Both operations reduce to the same rebuild: validate a list of 0-based
//! page indices against the source, then rewrite the page tree root so its
//! kids are exactly those pages in the requested order. Duplicates are
//! allowed and become independent entries in the new tree.

use crate::document;
use crate::error::PageDeckError;
use crate::loader;
use tracing::debug;

/// Build a new document containing the pages at `indices` (0-based), in
/// the given order. Duplicate indices duplicate the page.
pub fn extract_pages(bytes: &[u8], indices: &[usize]) -> Result<Vec<u8>, PageDeckError> {
    debug!(count = indices.len(), "extracting pages");
    rebuild_with_pages(bytes, indices)
}

/// Reorder all pages of the document according to `order`, a permutation
/// of 0-based indices. The same rebuild as extraction; callers that pass a
/// non-permutation get extraction semantics (drops and duplicates).
pub fn reorder_pages(bytes: &[u8], order: &[usize]) -> Result<Vec<u8>, PageDeckError> {
    debug!(count = order.len(), "reordering pages");
    rebuild_with_pages(bytes, order)
}

fn rebuild_with_pages(bytes: &[u8], indices: &[usize]) -> Result<Vec<u8>, PageDeckError> {
    let mut doc = loader::load(bytes)?.into_document();
    let page_ids = document::page_ids(&doc);

    for &index in indices {
        document::validate_index(index, page_ids.len())?;
    }

    let selected: Vec<_> = indices.iter().map(|&i| page_ids[i]).collect();

    // Attributes inherited from intermediate tree nodes must land on the
    // pages before those nodes are pruned away.
    for &page_id in &selected {
        document::flatten_inherited_attributes(&mut doc, page_id);
    }

    let pages_id = document::pages_root(&doc)?;
    document::set_page_tree(&mut doc, pages_id, selected)?;

    doc.prune_objects();
    doc.compress();
    document::save_to_bytes(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{create_test_pdf, page_markers};
    use lopdf::Document;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_extract_subset_in_order() {
        let pdf = create_test_pdf(5, "Src");
        let out = extract_pages(&pdf, &[0, 2, 4]).unwrap();

        assert_eq!(
            page_markers(&out),
            vec!["Src-Page-1", "Src-Page-3", "Src-Page-5"]
        );
    }

    #[test]
    fn test_extract_respects_request_order() {
        let pdf = create_test_pdf(3, "Src");
        let out = extract_pages(&pdf, &[2, 0]).unwrap();

        assert_eq!(page_markers(&out), vec!["Src-Page-3", "Src-Page-1"]);
    }

    #[test]
    fn test_extract_duplicates_page() {
        let pdf = create_test_pdf(2, "Src");
        let out = extract_pages(&pdf, &[1, 1, 0]).unwrap();

        assert_eq!(
            page_markers(&out),
            vec!["Src-Page-2", "Src-Page-2", "Src-Page-1"]
        );
    }

    #[test]
    fn test_extract_empty_selection_yields_empty_document() {
        let pdf = create_test_pdf(3, "Src");
        let out = extract_pages(&pdf, &[]).unwrap();

        let doc = Document::load_mem(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 0);
    }

    #[test]
    fn test_extract_out_of_range_fails() {
        let pdf = create_test_pdf(3, "Src");
        let result = extract_pages(&pdf, &[0, 3]);

        assert!(matches!(
            result,
            Err(PageDeckError::InvalidPageReference {
                index: 3,
                page_count: 3
            })
        ));
    }

    #[test]
    fn test_reorder_reverses_pages() {
        let pdf = create_test_pdf(3, "Src");
        let out = reorder_pages(&pdf, &[2, 1, 0]).unwrap();

        assert_eq!(
            page_markers(&out),
            vec!["Src-Page-3", "Src-Page-2", "Src-Page-1"]
        );
    }

    #[test]
    fn test_reorder_identity_keeps_order() {
        let pdf = create_test_pdf(4, "Src");
        let out = reorder_pages(&pdf, &[0, 1, 2, 3]).unwrap();

        assert_eq!(page_markers(&out), page_markers(&pdf));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_reorder_any_permutation(order in Just((0..5usize).collect::<Vec<_>>()).prop_shuffle()) {
            let pdf = create_test_pdf(5, "Src");
            let out = reorder_pages(&pdf, &order).unwrap();

            let expected: Vec<String> = order
                .iter()
                .map(|&i| format!("Src-Page-{}", i + 1))
                .collect();
            prop_assert_eq!(page_markers(&out), expected);
        }
    }
}
