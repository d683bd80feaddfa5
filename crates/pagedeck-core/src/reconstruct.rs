//! Rasterizing reconstructor: rebuild a strict-compatible document from a
//! byte stream only the lenient reader can open.
//!
//! Each source page is rendered to a lossless raster at a fixed
//! supersampling multiplier, then re-embedded at the original page size in
//! points. The result loses text and vector content but preserves page
//! order, count, and geometry 1:1.

use crate::document;
use crate::error::PageDeckError;
use crate::images;
use crate::lenient;
use lopdf::Document;
use pdfium_render::prelude::*;
use tracing::debug;

/// Supersampling multiplier over the page's natural point size, for image
/// quality when the raster is viewed at 100%.
const RASTER_SCALE: f32 = 2.0;

/// Rebuild the document by rasterizing every page of `bytes`.
///
/// Zero-page sources yield a valid zero-page document, not an error. The
/// pdfium session is released on every exit path.
pub fn rasterize_to_document(bytes: &[u8]) -> Result<Document, PageDeckError> {
    let pdfium = lenient::bind_session()?;
    let source = lenient::open_document(&pdfium, bytes)?;

    let (mut doc, pages_id) = document::empty_document();
    let mut kids = Vec::new();

    for (index, page) in source.pages().iter().enumerate() {
        // Unscaled dimensions give the true page size in points; the
        // render target is scaled up independently.
        let width_pt = page.width().value;
        let height_pt = page.height().value;

        let target_width = (width_pt * RASTER_SCALE).round().max(1.0) as i32;
        let target_height = (height_pt * RASTER_SCALE).round().max(1.0) as i32;

        let bitmap = page
            .render_with_config(
                &PdfRenderConfig::new()
                    .set_target_width(target_width)
                    .set_target_height(target_height),
            )
            .map_err(|e| {
                PageDeckError::Lenient(format!("Failed to rasterize page {}: {:?}", index, e))
            })?;

        let rgb = bitmap.as_image().to_rgb8();
        debug!(
            page = index,
            width = rgb.width(),
            height = rgb.height(),
            "rasterized page for reconstruction"
        );

        let image_id = images::embed_flate_rgb(&mut doc, &rgb)?;
        kids.push(images::append_image_page(
            &mut doc, pages_id, image_id, width_pt, height_pt,
        )?);
    }

    document::set_page_tree(&mut doc, pages_id, kids)?;
    Ok(doc)
}
