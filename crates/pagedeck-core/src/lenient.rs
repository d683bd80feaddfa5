//! Lenient reader session handling.
//!
//! pdfium renders pages from byte streams the strict parser rejects, but it
//! cannot rewrite document structure. Every consumer binds its own session
//! and releases it on drop; sessions are never shared between a preview
//! render and a repair pass, even for identical bytes.

use crate::error::PageDeckError;
use pdfium_render::prelude::*;

/// Bind a pdfium session, preferring a library shipped next to the binary
/// and falling back to the system install.
pub(crate) fn bind_session() -> Result<Pdfium, PageDeckError> {
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| PageDeckError::Lenient(format!("Failed to bind pdfium: {:?}", e)))
}

/// Decode arbitrary PDF bytes with the lenient reader. Encrypted inputs
/// are opened without a password; failures surface to the caller.
pub(crate) fn open_document<'a>(
    pdfium: &'a Pdfium,
    bytes: &'a [u8],
) -> Result<PdfDocument<'a>, PageDeckError> {
    pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| PageDeckError::Lenient(format!("Failed to open document: {:?}", e)))
}
