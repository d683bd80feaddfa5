//! Command envelope: a serializable description of one transformation,
//! dispatched to the corresponding operation.

use crate::error::PageDeckError;
use crate::images::ImageInput;
use crate::metadata::DocumentMetadata;
use crate::stamp::{PageNumberOptions, WatermarkOptions};
use crate::{extract, images, merge, metadata, pages, stamp};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum PdfCommand {
    Merge {
        files: Vec<Vec<u8>>,
    },
    Extract {
        file: Vec<u8>,
        indices: Vec<usize>,
    },
    Reorder {
        file: Vec<u8>,
        order: Vec<usize>,
    },
    Rotate {
        file: Vec<u8>,
        #[serde(deserialize_with = "deserialize_rotations")]
        rotations: BTreeMap<usize, i64>,
    },
    Remove {
        file: Vec<u8>,
        indices: BTreeSet<usize>,
    },
    ImagesToDocument {
        images: Vec<ImageInput>,
    },
    ReadMetadata {
        file: Vec<u8>,
    },
    WriteMetadata {
        file: Vec<u8>,
        metadata: DocumentMetadata,
    },
    AddPageNumbers {
        file: Vec<u8>,
        #[serde(default)]
        options: PageNumberOptions,
    },
    AddWatermark {
        file: Vec<u8>,
        options: WatermarkOptions,
    },
}

/// Internally tagged enums buffer their payload through serde's `Content`
/// representation, which presents JSON object keys as plain strings, so
/// `BTreeMap<usize, i64>` cannot deserialize directly. Accept string keys
/// and parse them as page indices.
fn deserialize_rotations<'de, D>(deserializer: D) -> Result<BTreeMap<usize, i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let raw = BTreeMap::<String, i64>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, value)| {
            key.parse::<usize>()
                .map(|index| (index, value))
                .map_err(|_| D::Error::custom(format!("invalid page index key: {key:?}")))
        })
        .collect()
}

impl PdfCommand {
    fn name(&self) -> &'static str {
        match self {
            PdfCommand::Merge { .. } => "merge",
            PdfCommand::Extract { .. } => "extract",
            PdfCommand::Reorder { .. } => "reorder",
            PdfCommand::Rotate { .. } => "rotate",
            PdfCommand::Remove { .. } => "remove",
            PdfCommand::ImagesToDocument { .. } => "images-to-document",
            PdfCommand::ReadMetadata { .. } => "read-metadata",
            PdfCommand::WriteMetadata { .. } => "write-metadata",
            PdfCommand::AddPageNumbers { .. } => "add-page-numbers",
            PdfCommand::AddWatermark { .. } => "add-watermark",
        }
    }
}

/// Execute a command. Document-producing commands return PDF bytes;
/// `ReadMetadata` returns JSON.
pub fn execute(command: PdfCommand) -> Result<Vec<u8>, PageDeckError> {
    info!(command = command.name(), "executing command");

    match command {
        PdfCommand::Merge { files } => merge::merge_documents(&files),
        PdfCommand::Extract { file, indices } => extract::extract_pages(&file, &indices),
        PdfCommand::Reorder { file, order } => extract::reorder_pages(&file, &order),
        PdfCommand::Rotate { file, rotations } => pages::rotate_pages(&file, &rotations),
        PdfCommand::Remove { file, indices } => pages::remove_pages(&file, &indices),
        PdfCommand::ImagesToDocument { images } => images::images_to_document(&images),
        PdfCommand::ReadMetadata { file } => {
            let meta = metadata::read_metadata(&file)?;
            serde_json::to_vec(&meta).map_err(|e| PageDeckError::Serialization(e.to_string()))
        }
        PdfCommand::WriteMetadata { file, metadata } => {
            metadata::write_metadata(&file, &metadata)
        }
        PdfCommand::AddPageNumbers { file, options } => stamp::add_page_numbers(&file, &options),
        PdfCommand::AddWatermark { file, options } => stamp::add_watermark(&file, &options),
    }
}
