//! Thumbnail rendering through the lenient reader, with generation-token
//! cancellation so a stale render never publishes over a newer one.

use crate::error::PageDeckError;
use crate::lenient;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Monotonic generation counter shared between the render loop and
/// whatever replaces the source document. Advancing it invalidates every
/// render started under an earlier snapshot.
#[derive(Debug, Clone, Default)]
pub struct RenderGeneration(Arc<AtomicU64>);

impl RenderGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate all in-flight renders.
    pub fn advance(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, snapshot: u64) -> bool {
        self.snapshot() == snapshot
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ThumbnailOptions {
    /// Scale relative to the page's natural size in points.
    pub scale: f32,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self { scale: 0.3 }
    }
}

/// Render a thumbnail for every page. Uncancellable convenience wrapper
/// over [`render_thumbnails_with`].
pub fn render_thumbnails(
    bytes: &[u8],
    options: &ThumbnailOptions,
) -> Result<Vec<DynamicImage>, PageDeckError> {
    let mut thumbnails = Vec::new();
    render_thumbnails_with(bytes, options, &RenderGeneration::new(), |_, image| {
        thumbnails.push(image)
    })?;
    Ok(thumbnails)
}

/// Render thumbnails page by page, delivering each through `sink` with its
/// 0-based page index. The token is snapshotted at entry and re-checked
/// before every delivery; if it advanced, rendering stops and no further
/// thumbnails are published. Returns the number of pages delivered.
pub fn render_thumbnails_with(
    bytes: &[u8],
    options: &ThumbnailOptions,
    token: &RenderGeneration,
    mut sink: impl FnMut(usize, DynamicImage),
) -> Result<usize, PageDeckError> {
    let generation = token.snapshot();
    let pdfium = lenient::bind_session()?;
    let document = lenient::open_document(&pdfium, bytes)?;

    let mut delivered = 0;
    for (index, page) in document.pages().iter().enumerate() {
        let width = (page.width().value * options.scale).round().max(1.0) as i32;
        let height = (page.height().value * options.scale).round().max(1.0) as i32;

        let bitmap = page
            .render_with_config(
                &PdfRenderConfig::new()
                    .set_target_width(width)
                    .set_target_height(height),
            )
            .map_err(|e| {
                PageDeckError::Lenient(format!("Failed to render page {}: {:?}", index, e))
            })?;

        if !token.is_current(generation) {
            debug!(page = index, "thumbnail render superseded, stopping");
            return Err(PageDeckError::PreviewCancelled);
        }
        sink(index, bitmap.as_image());
        delivered += 1;
    }

    debug!(pages = delivered, "thumbnail render complete");
    Ok(delivered)
}
