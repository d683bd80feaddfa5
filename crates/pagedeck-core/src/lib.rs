//! Client-side PDF transformation core.
//!
//! Documents are byte buffers in, byte buffers out; nothing here touches
//! the filesystem or network. Two readers back the operations:
//! - strict (lopdf): full object-graph parse, required for editing
//! - lenient (pdfium): rendering-only, tolerant of malformed files
//!
//! [`loader::load`] resolves the two: strict first, then a lossy repair
//! that rebuilds the document from page rasters.

pub mod command;
pub mod error;
pub mod extract;
pub mod images;
pub mod loader;
pub mod merge;
pub mod metadata;
pub mod order;
pub mod pages;
pub mod preview;
pub mod reconstruct;
pub mod stamp;

mod document;
mod fonts;
mod lenient;

#[cfg(test)]
mod test_fixtures;

pub use command::{execute, PdfCommand};
pub use error::PageDeckError;
pub use extract::{extract_pages, reorder_pages};
pub use images::{images_to_document, ImageInput};
pub use loader::{load, LoadedDocument};
pub use merge::merge_documents;
pub use metadata::{read_metadata, write_metadata, DocumentMetadata};
pub use order::{initialize_order, move_item, reset_order, reset_selection, toggle_selection};
pub use pages::{remove_pages, rotate_pages};
pub use preview::{render_thumbnails, render_thumbnails_with, RenderGeneration, ThumbnailOptions};
pub use stamp::{add_page_numbers, add_watermark, PageNumberOptions, PagePosition, WatermarkOptions};

/// Parse PDF bytes (repairing if needed) and return the page count.
pub fn page_count(bytes: &[u8]) -> Result<u32, PageDeckError> {
    let doc = loader::load(bytes)?.into_document();
    Ok(doc.get_pages().len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Document, Object};
    use test_fixtures::{corrupt_xref, create_test_pdf, pdfium_available};

    #[test]
    fn test_page_count_of_strict_document() {
        let pdf = create_test_pdf(4, "Src");
        assert_eq!(page_count(&pdf).unwrap(), 4);
    }

    #[test]
    fn test_load_tags_clean_document_as_strict() {
        let pdf = create_test_pdf(1, "Src");
        let loaded = load(&pdf).unwrap();
        assert!(!loaded.was_repaired());
    }

    #[test]
    fn test_load_repairs_corrupted_xref() {
        if !pdfium_available() {
            return;
        }

        let broken = corrupt_xref(create_test_pdf(2, "Src"));
        let loaded = load(&broken).unwrap();
        assert!(loaded.was_repaired());
        assert_eq!(loaded.into_document().get_pages().len(), 2);
    }

    #[test]
    fn test_load_garbage_is_unparseable() {
        let result = load(b"definitely not a pdf");
        assert!(matches!(result, Err(PageDeckError::Unparseable(_))));
    }

    #[test]
    fn test_load_rejects_catalog_without_page_tree() {
        // Intact xref and catalog, but no /Pages: the strict probe must not
        // hand this downstream as a zero-page document.
        let mut doc = Document::load_mem(&create_test_pdf(2, "Src")).unwrap();
        let catalog_id = doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .unwrap();
        if let Ok(Object::Dictionary(catalog)) = doc.get_object_mut(catalog_id) {
            catalog.remove(b"Pages");
        }
        let mut broken = Vec::new();
        doc.save_to(&mut broken).unwrap();

        match load(&broken) {
            Ok(loaded) => assert!(loaded.was_repaired()),
            Err(err) => assert!(matches!(err, PageDeckError::Unparseable(_))),
        }
    }

    #[test]
    fn test_load_rejects_page_tree_count_mismatch() {
        // Kids emptied while /Count still declares two pages.
        let mut doc = Document::load_mem(&create_test_pdf(2, "Src")).unwrap();
        let pages_id = doc
            .catalog()
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .unwrap();
        if let Ok(Object::Dictionary(pages)) = doc.get_object_mut(pages_id) {
            pages.set("Kids", Object::Array(vec![]));
        }
        let mut broken = Vec::new();
        doc.save_to(&mut broken).unwrap();

        match load(&broken) {
            Ok(loaded) => assert!(loaded.was_repaired()),
            Err(err) => assert!(matches!(err, PageDeckError::Unparseable(_))),
        }
    }
}
