//! Stamping: page numbers and diagonal text watermarks.
//!
//! Both operations append a new content stream after each page's existing
//! content, so the stamp paints on top and the original streams are left
//! byte-identical.

use crate::document;
use crate::error::PageDeckError;
use crate::fonts::{self, StandardFont};
use crate::loader;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object};
use serde::Deserialize;
use tracing::debug;

/// Horizontal inset from the left/right media-box edges, in points.
const EDGE_INSET: f32 = 40.0;
/// Baseline distance below the top edge for top positions.
const TOP_INSET: f32 = 40.0;
/// Baseline height above the bottom edge for bottom positions.
const BOTTOM_BASELINE: f32 = 30.0;
/// Fill gray for page numbers.
const NUMBER_GRAY: f32 = 0.4;
/// Fill gray for watermarks.
const WATERMARK_GRAY: f32 = 0.5;

const NUMBER_FONT_RESOURCE: &str = "FpdNum";
const WATERMARK_FONT_RESOURCE: &str = "FpdWm";
const WATERMARK_GSTATE_RESOURCE: &str = "GpdWm";

/// Where on the page the number is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PagePosition {
    TopLeft,
    TopCenter,
    TopRight,
    BottomLeft,
    #[default]
    BottomCenter,
    BottomRight,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PageNumberOptions {
    pub position: PagePosition,
    pub font_size: f32,
    /// Number printed on the first page.
    pub start_from: u32,
}

impl Default for PageNumberOptions {
    fn default() -> Self {
        Self {
            position: PagePosition::default(),
            font_size: 12.0,
            start_from: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatermarkOptions {
    pub text: String,
    #[serde(default = "default_watermark_size")]
    pub font_size: f32,
    #[serde(default = "default_watermark_opacity")]
    pub opacity: f32,
    #[serde(default = "default_watermark_rotation")]
    pub rotation_degrees: f32,
}

fn default_watermark_size() -> f32 {
    60.0
}

fn default_watermark_opacity() -> f32 {
    0.15
}

fn default_watermark_rotation() -> f32 {
    45.0
}

/// Stamp a sequential number on every page.
pub fn add_page_numbers(bytes: &[u8], options: &PageNumberOptions) -> Result<Vec<u8>, PageDeckError> {
    let mut doc = loader::load(bytes)?.into_document();
    let page_ids = document::page_ids(&doc);
    debug!(pages = page_ids.len(), ?options.position, "stamping page numbers");

    let font = StandardFont::Helvetica;
    let font_id = fonts::add_standard_font(&mut doc, font);

    for (index, &page_id) in page_ids.iter().enumerate() {
        let text = (index as u64 + options.start_from as u64).to_string();
        let text_width = font.text_width(&text, options.font_size);

        let [x0, y0, x1, y1] = document::media_box(&doc, page_id);
        let x = match options.position {
            PagePosition::TopLeft | PagePosition::BottomLeft => x0 + EDGE_INSET,
            PagePosition::TopCenter | PagePosition::BottomCenter => {
                x0 + ((x1 - x0) - text_width) / 2.0
            }
            PagePosition::TopRight | PagePosition::BottomRight => x1 - EDGE_INSET - text_width,
        };
        let y = match options.position {
            PagePosition::TopLeft | PagePosition::TopCenter | PagePosition::TopRight => {
                y1 - TOP_INSET
            }
            _ => y0 + BOTTOM_BASELINE,
        };

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "rg",
                    vec![NUMBER_GRAY.into(), NUMBER_GRAY.into(), NUMBER_GRAY.into()],
                ),
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![
                        Object::Name(NUMBER_FONT_RESOURCE.as_bytes().to_vec()),
                        options.font_size.into(),
                    ],
                ),
                Operation::new("Td", vec![x.into(), y.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        };

        document::add_page_resource(&mut doc, page_id, b"Font", NUMBER_FONT_RESOURCE, font_id)?;
        document::append_page_content(&mut doc, page_id, encode(content)?)?;
    }

    doc.compress();
    document::save_to_bytes(doc)
}

/// Stamp a semi-transparent rotated text watermark across every page,
/// centered horizontally at mid-page height.
pub fn add_watermark(bytes: &[u8], options: &WatermarkOptions) -> Result<Vec<u8>, PageDeckError> {
    let mut doc = loader::load(bytes)?.into_document();
    let page_ids = document::page_ids(&doc);
    debug!(pages = page_ids.len(), text = %options.text, "stamping watermark");

    let font = StandardFont::HelveticaBold;
    let font_id = fonts::add_standard_font(&mut doc, font);

    let gstate_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"ExtGState".to_vec())),
        ("ca", Object::Real(options.opacity)),
        ("CA", Object::Real(options.opacity)),
    ]));

    let text_width = font.text_width(&options.text, options.font_size);
    let radians = options.rotation_degrees.to_radians();
    let (sin, cos) = radians.sin_cos();

    for &page_id in &page_ids {
        let [x0, y0, x1, y1] = document::media_box(&doc, page_id);
        let x = x0 + ((x1 - x0) - text_width) / 2.0;
        let y = y0 + (y1 - y0) / 2.0;

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "gs",
                    vec![Object::Name(WATERMARK_GSTATE_RESOURCE.as_bytes().to_vec())],
                ),
                Operation::new(
                    "rg",
                    vec![
                        WATERMARK_GRAY.into(),
                        WATERMARK_GRAY.into(),
                        WATERMARK_GRAY.into(),
                    ],
                ),
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![
                        Object::Name(WATERMARK_FONT_RESOURCE.as_bytes().to_vec()),
                        options.font_size.into(),
                    ],
                ),
                Operation::new(
                    "Tm",
                    vec![
                        cos.into(),
                        sin.into(),
                        (-sin).into(),
                        cos.into(),
                        x.into(),
                        y.into(),
                    ],
                ),
                Operation::new("Tj", vec![Object::string_literal(options.text.as_str())]),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        };

        document::add_page_resource(&mut doc, page_id, b"Font", WATERMARK_FONT_RESOURCE, font_id)?;
        document::add_page_resource(
            &mut doc,
            page_id,
            b"ExtGState",
            WATERMARK_GSTATE_RESOURCE,
            gstate_id,
        )?;
        document::append_page_content(&mut doc, page_id, encode(content)?)?;
    }

    doc.compress();
    document::save_to_bytes(doc)
}

fn encode(content: Content) -> Result<Vec<u8>, PageDeckError> {
    content
        .encode()
        .map_err(|e| PageDeckError::Operation(format!("Failed to encode content: {}", e)))
}
