//! Error types for the ribex-core library.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the ribex library.
#[derive(Error, Debug)]
pub enum RibexError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// RIB extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract images from PDF.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The OCR backend cannot run on this machine (missing binary, missing models).
    #[error("OCR backend unavailable: {0}")]
    Unavailable(String),

    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Rendering PDF pages to images failed.
    #[error("rasterization failed: {0}")]
    Rasterize(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// The backend cannot handle this kind of document.
    #[error("unsupported document: {0}")]
    UnsupportedDocument(String),

    /// Scratch file handling failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to RIB field extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The model reply did not contain a usable JSON object.
    #[error("malformed model reply: {0}")]
    MalformedReply(String),
}

/// Per-document soft failure carried on an output record.
///
/// These never abort a batch; the record is still emitted with every data
/// field absent.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DocumentError {
    /// OCR (or the text layer) produced nothing usable.
    #[error("OCR vide (aucun texte exploitable)")]
    EmptyText,

    /// The external OCR or model call did not answer in time.
    #[error("délai dépassé après {seconds}s")]
    Timeout { seconds: u64 },

    /// The model API returned an error object.
    #[error("erreur API: {0}")]
    ModelApi(String),

    /// The model API returned no candidate.
    #[error("aucun candidat renvoyé: {0}")]
    ModelNoCandidate(String),

    /// The model call failed before a reply was received.
    #[error("exception lors de l'appel: {0}")]
    ModelException(String),

    /// The model reply was not JSON.
    #[error("Réponse IA non JSON")]
    MalformedReply,

    /// The input could not be read or is not a supported format.
    #[error("document illisible: {0}")]
    Unreadable(String),
}

/// Result type for the ribex library.
pub type Result<T> = std::result::Result<T, RibexError>;
