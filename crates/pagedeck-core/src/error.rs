use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageDeckError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Document is unparseable by both the strict and lenient readers: {0}")]
    Unparseable(String),

    #[error("Invalid page reference: index {index} out of range for {page_count} pages")]
    InvalidPageReference { index: usize, page_count: usize },

    #[error("PDF operation failed: {0}")]
    Operation(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("Lenient reader failed: {0}")]
    Lenient(String),

    #[error("Preview render superseded by a newer source")]
    PreviewCancelled,

    #[error("Serialization error: {0}")]
    Serialization(String),
}
