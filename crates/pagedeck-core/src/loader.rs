//! Loader/repair resolver.
//!
//! The strict path decodes into an editable object graph but rejects many
//! malformed real-world files; the lenient path tolerates them but cannot
//! rewrite structure. `load` tries strict first and falls back to whole-
//! document rasterization, surfacing which path produced the handle.

use crate::document;
use crate::error::PageDeckError;
use crate::reconstruct;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, warn};

/// A decoded document handle, tagged with the path that produced it.
#[derive(Debug)]
pub enum LoadedDocument {
    /// Strict decode succeeded; the original object graph is editable.
    Strict(Document),
    /// Strict decode failed; the document was rebuilt from page rasters.
    Repaired(Document),
}

impl LoadedDocument {
    pub fn into_document(self) -> Document {
        match self {
            LoadedDocument::Strict(doc) | LoadedDocument::Repaired(doc) => doc,
        }
    }

    pub fn was_repaired(&self) -> bool {
        matches!(self, LoadedDocument::Repaired(_))
    }
}

/// Load `bytes`, repairing through the rasterizing reconstructor when the
/// strict parser fails. Fails with [`PageDeckError::Unparseable`] only when
/// both paths fail. Encryption is ignored, never removed: an encrypted file
/// the strict parser cannot materialize falls through to the lenient path.
pub fn load(bytes: &[u8]) -> Result<LoadedDocument, PageDeckError> {
    match strict_probe(bytes) {
        Ok(doc) => Ok(LoadedDocument::Strict(doc)),
        Err(strict_err) => {
            warn!(error = %strict_err, "strict decode failed, rasterizing");
            // The failed strict attempt is already dropped; the lenient
            // pass opens its own session over the untouched source bytes.
            match reconstruct::rasterize_to_document(bytes) {
                Ok(doc) => Ok(LoadedDocument::Repaired(doc)),
                Err(repair_err) => Err(PageDeckError::Unparseable(format!(
                    "strict: {}; lenient: {}",
                    strict_err, repair_err
                ))),
            }
        }
    }
}

/// Strict decode plus a page-tree probe: the tree root must resolve and
/// the pages it yields must match its declared `/Count`. `get_pages()`
/// swallows tree-walk failures into an empty map, so the cross-check is
/// what forces full structural resolution.
fn strict_probe(bytes: &[u8]) -> Result<Document, PageDeckError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| PageDeckError::Parse(e.to_string()))?;

    let pages_id = document::pages_root(&doc)
        .map_err(|e| PageDeckError::Parse(format!("No usable page tree: {}", e)))?;
    let declared = declared_page_count(&doc, pages_id)
        .ok_or_else(|| PageDeckError::Parse("Page tree root has no usable Count".into()))?;

    let resolved = doc.get_pages().len() as i64;
    if resolved != declared {
        return Err(PageDeckError::Parse(format!(
            "Page tree resolves {} pages but declares {}",
            resolved, declared
        )));
    }

    debug!(page_count = resolved, "strict decode ok");
    Ok(doc)
}

/// The `/Count` declared on the page tree root, resolving one level of
/// indirection.
fn declared_page_count(doc: &Document, pages_id: ObjectId) -> Option<i64> {
    let count = doc
        .get_object(pages_id)
        .ok()?
        .as_dict()
        .ok()?
        .get(b"Count")
        .ok()?;
    match count {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_i64().ok(),
        other => other.as_i64().ok(),
    }
}
