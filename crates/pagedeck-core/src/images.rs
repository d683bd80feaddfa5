//! Image embedding: assemble PNG/JPEG byte buffers into a document, one
//! page per image at exact pixel dimensions, plus the XObject plumbing
//! shared with the rasterizing reconstructor.

use crate::document;
use crate::error::PageDeckError;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{GrayImage, ImageFormat, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::Deserialize;
use std::io::Write;
use tracing::warn;

/// Resource name under which each page's single image is registered.
const IMAGE_RESOURCE: &str = "Im0";

/// One source image for document assembly.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageInput {
    pub data: Vec<u8>,
    /// Mime type; selects the PNG or JPEG embed path. Anything that is not
    /// recognizably PNG falls back to JPEG embedding (a deliberate
    /// leniency carried over from the original behavior, logged but not
    /// rejected). Bytes that fail to decode still error.
    pub mime: String,
}

/// Assemble images into a new document, one page per image sized to the
/// image's exact pixel dimensions. An empty list yields an empty document.
pub fn images_to_document(images: &[ImageInput]) -> Result<Vec<u8>, PageDeckError> {
    let (mut doc, pages_id) = document::empty_document();
    let mut kids = Vec::new();

    for (index, input) in images.iter().enumerate() {
        let mime = input.mime.to_ascii_lowercase();
        let (image_id, width, height) = if mime.contains("png") {
            embed_png(&mut doc, &input.data, index)?
        } else {
            if !mime.contains("jpeg") && !mime.contains("jpg") {
                warn!(mime = %input.mime, index, "unrecognized image mime, defaulting to JPEG embed");
            }
            embed_jpeg(&mut doc, &input.data, index)?
        };

        kids.push(append_image_page(
            &mut doc,
            pages_id,
            image_id,
            width as f32,
            height as f32,
        )?);
    }

    document::set_page_tree(&mut doc, pages_id, kids)?;
    doc.compress();
    document::save_to_bytes(doc)
}

/// Decode PNG bytes and embed them losslessly, preserving alpha via a
/// soft-mask channel.
fn embed_png(
    doc: &mut Document,
    data: &[u8],
    index: usize,
) -> Result<(ObjectId, u32, u32), PageDeckError> {
    let decoded = image::load_from_memory_with_format(data, ImageFormat::Png)
        .map_err(|e| PageDeckError::ImageDecode(format!("image {}: {}", index, e)))?;
    let (width, height) = (decoded.width(), decoded.height());

    if decoded.color().has_alpha() {
        let rgba = decoded.to_rgba8();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }
        let rgb = RgbImage::from_raw(width, height, rgb)
            .ok_or_else(|| PageDeckError::ImageDecode(format!("image {}: bad RGBA data", index)))?;
        let alpha = GrayImage::from_raw(width, height, alpha)
            .ok_or_else(|| PageDeckError::ImageDecode(format!("image {}: bad alpha data", index)))?;

        let smask_id = embed_flate_gray(doc, &alpha)?;
        let image_id = embed_flate_rgb(doc, &rgb)?;
        if let Ok(Object::Stream(stream)) = doc.get_object_mut(image_id) {
            stream.dict.set("SMask", Object::Reference(smask_id));
        }
        Ok((image_id, width, height))
    } else {
        let image_id = embed_flate_rgb(doc, &decoded.to_rgb8())?;
        Ok((image_id, width, height))
    }
}

/// Embed JPEG bytes verbatim under DCTDecode; the decoder runs only to
/// probe dimensions and color layout.
fn embed_jpeg(
    doc: &mut Document,
    data: &[u8],
    index: usize,
) -> Result<(ObjectId, u32, u32), PageDeckError> {
    let decoded = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map_err(|e| PageDeckError::ImageDecode(format!("image {}: {}", index, e)))?;
    let (width, height) = (decoded.width(), decoded.height());

    // The decoder reports post-conversion channels, so CMYK sources must
    // be sniffed from the frame header. Verbatim embedding would label
    // them DeviceRGB and invert colors; transcode losslessly instead.
    if jpeg_component_count(data) == Some(4) {
        warn!(index, "four-component JPEG, transcoding to RGB");
        let image_id = embed_flate_rgb(doc, &decoded.to_rgb8())?;
        return Ok((image_id, width, height));
    }

    let color_space: &[u8] = if decoded.color().channel_count() == 1 {
        b"DeviceGray"
    } else {
        b"DeviceRGB"
    };

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

    let image_id = doc.add_object(Object::Stream(Stream::new(dict, data.to_vec())));
    Ok((image_id, width, height))
}

/// Embed an RGB raster as a FlateDecode image XObject (lossless).
pub(crate) fn embed_flate_rgb(
    doc: &mut Document,
    rgb: &RgbImage,
) -> Result<ObjectId, PageDeckError> {
    let data = deflate(rgb.as_raw())?;

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(rgb.width() as i64));
    dict.set("Height", Object::Integer(rgb.height() as i64));
    dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));

    Ok(doc.add_object(Object::Stream(Stream::new(dict, data))))
}

/// Embed a grayscale raster (used as the alpha soft mask).
fn embed_flate_gray(doc: &mut Document, gray: &GrayImage) -> Result<ObjectId, PageDeckError> {
    let data = deflate(gray.as_raw())?;

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(gray.width() as i64));
    dict.set("Height", Object::Integer(gray.height() as i64));
    dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));

    Ok(doc.add_object(Object::Stream(Stream::new(dict, data))))
}

/// Component count declared by the JPEG's start-of-frame segment, walking
/// the marker segments from SOI.
fn jpeg_component_count(data: &[u8]) -> Option<u8> {
    let mut pos = 2;
    while pos + 3 < data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // Standalone markers carry no length field.
        if marker == 0xFF || marker == 0x01 || (0xD0..=0xD8).contains(&marker) {
            pos += if marker == 0xFF { 1 } else { 2 };
            continue;
        }
        // SOF0..SOF15, excluding DHT, JPG, and DAC which share the range.
        if matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            // precision(1), height(2), width(2), components(1)
            return data.get(pos + 9).copied();
        }
        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        pos += 2 + length;
    }
    None
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, PageDeckError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| PageDeckError::Operation(format!("Failed to compress image data: {}", e)))
}

/// Add a page of `width` x `height` points whose sole content places the
/// image XObject over the full page extent. Returns the page's object id;
/// the caller finalizes the page tree.
pub(crate) fn append_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    image_id: ObjectId,
    width: f32,
    height: f32,
) -> Result<ObjectId, PageDeckError> {
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.into(),
                    0.into(),
                    height.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new(
                "Do",
                vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())],
            ),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Object::Stream(Stream::new(
        Dictionary::new(),
        content
            .encode()
            .map_err(|e| PageDeckError::Operation(format!("Failed to encode content: {}", e)))?,
    )));

    let mut xobjects = Dictionary::new();
    xobjects.set(IMAGE_RESOURCE, Object::Reference(image_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let page = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        (
            "MediaBox",
            Object::Array(vec![
                0.into(),
                0.into(),
                Object::Real(width),
                Object::Real(height),
            ]),
        ),
        ("Resources", Object::Dictionary(resources)),
        ("Contents", Object::Reference(content_id)),
    ]);

    Ok(doc.add_object(page))
}
