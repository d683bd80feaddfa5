//! In-place page mutations: rotation and removal.

use crate::document;
use crate::error::PageDeckError;
use crate::loader;
use lopdf::Object;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Apply rotation deltas, keyed by 0-based page index, in degrees. Each
/// delta is added to the page's current rotation and normalized into
/// `0..360`. Indices outside the document are logged and skipped, never an
/// error.
pub fn rotate_pages(bytes: &[u8], rotations: &BTreeMap<usize, i64>) -> Result<Vec<u8>, PageDeckError> {
    let mut doc = loader::load(bytes)?.into_document();
    let page_ids = document::page_ids(&doc);

    for (&index, &delta) in rotations {
        let Some(&page_id) = page_ids.get(index) else {
            warn!(index, page_count = page_ids.len(), "rotation index out of range, skipping");
            continue;
        };

        let current = document::page_attribute(&doc, page_id, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .unwrap_or(0);
        // Reduce both terms first so an extreme delta cannot overflow.
        let normalized = (current.rem_euclid(360) + delta.rem_euclid(360)).rem_euclid(360);

        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
            page.set("Rotate", Object::Integer(normalized));
        }
    }

    doc.compress();
    document::save_to_bytes(doc)
}

/// Remove the pages at the given 0-based indices. All indices are
/// validated up front; removal itself runs highest-first so earlier
/// removals do not shift later ones. Removing every page is allowed.
pub fn remove_pages(bytes: &[u8], indices: &BTreeSet<usize>) -> Result<Vec<u8>, PageDeckError> {
    let mut doc = loader::load(bytes)?.into_document();
    let page_count = doc.get_pages().len();

    for &index in indices {
        document::validate_index(index, page_count)?;
    }

    // lopdf takes 1-based page numbers.
    for &index in indices.iter().rev() {
        doc.delete_pages(&[(index + 1) as u32]);
    }

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

    fn rotation_of(bytes: &[u8], index: usize) -> i64 {
        let doc = Document::load_mem(bytes).unwrap();
        let page_id = crate::document::page_ids(&doc)[index];
        crate::document::page_attribute(&doc, page_id, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .unwrap_or(0)
    }

    #[test]
    fn test_rotate_sets_normalized_angle() {
        let pdf = create_test_pdf(2, "Src");
        let out = rotate_pages(&pdf, &BTreeMap::from([(0, 90), (1, -90)])).unwrap();

        assert_eq!(rotation_of(&out, 0), 90);
        assert_eq!(rotation_of(&out, 1), 270);
    }

    #[test]
    fn test_rotate_accumulates_on_existing_rotation() {
        let pdf = create_test_pdf(1, "Src");
        let once = rotate_pages(&pdf, &BTreeMap::from([(0, 90)])).unwrap();
        let twice = rotate_pages(&once, &BTreeMap::from([(0, 270)])).unwrap();

        assert_eq!(rotation_of(&twice, 0), 0);
    }

    #[test]
    fn test_rotate_extreme_delta_does_not_overflow() {
        let pdf = create_test_pdf(1, "Src");
        let prerotated = rotate_pages(&pdf, &BTreeMap::from([(0, 90)])).unwrap();

        let out = rotate_pages(&prerotated, &BTreeMap::from([(0, i64::MAX)])).unwrap();
        assert_eq!(rotation_of(&out, 0), (90 + i64::MAX.rem_euclid(360)).rem_euclid(360));

        let out = rotate_pages(&prerotated, &BTreeMap::from([(0, i64::MIN)])).unwrap();
        assert!((0..360).contains(&rotation_of(&out, 0)));
    }

    #[test]
    fn test_rotate_out_of_range_index_is_ignored() {
        let pdf = create_test_pdf(1, "Src");
        let out = rotate_pages(&pdf, &BTreeMap::from([(0, 180), (5, 90)])).unwrap();

        assert_eq!(rotation_of(&out, 0), 180);
        let doc = Document::load_mem(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_remove_middle_pages() {
        let pdf = create_test_pdf(5, "Src");
        let out = remove_pages(&pdf, &BTreeSet::from([1, 3])).unwrap();

        assert_eq!(
            page_markers(&out),
            vec!["Src-Page-1", "Src-Page-3", "Src-Page-5"]
        );
    }

    #[test]
    fn test_remove_all_pages_is_allowed() {
        let pdf = create_test_pdf(2, "Src");
        let out = remove_pages(&pdf, &BTreeSet::from([0, 1])).unwrap();

        let doc = Document::load_mem(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 0);
    }

    #[test]
    fn test_remove_out_of_range_fails_without_mutating() {
        let pdf = create_test_pdf(3, "Src");
        let result = remove_pages(&pdf, &BTreeSet::from([0, 7]));

        assert!(matches!(
            result,
            Err(PageDeckError::InvalidPageReference {
                index: 7,
                page_count: 3
            })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_rotate_deltas_compose_modulo_360(a in -720i64..720, b in -720i64..720) {
            let pdf = create_test_pdf(1, "Src");
            let separate = rotate_pages(
                &rotate_pages(&pdf, &BTreeMap::from([(0, a)])).unwrap(),
                &BTreeMap::from([(0, b)]),
            )
            .unwrap();
            let combined = rotate_pages(&pdf, &BTreeMap::from([(0, a + b)])).unwrap();

            prop_assert_eq!(rotation_of(&separate, 0), rotation_of(&combined, 0));
            prop_assert!((0..360).contains(&rotation_of(&separate, 0)));
        }
    }
}
