//! OCR backends turning PDFs and images into raw text.
//!
//! The extraction rules treat OCR as a black box: a backend returns its best
//! effort text and the pipeline decides what an error or empty result means.

#[cfg(feature = "native")]
mod pure_engine;
#[cfg(feature = "native")]
mod tesseract;

#[cfg(feature = "native")]
pub use pure_engine::OnnxBackend;
#[cfg(feature = "native")]
pub use tesseract::TesseractBackend;

use crate::error::OcrError;
use crate::models::document::Document;
#[cfg(feature = "native")]
use crate::models::config::{OcrBackendKind, OcrConfig};

/// Result type for OCR operations.
pub type Result<T> = std::result::Result<T, OcrError>;

/// An OCR engine able to read documents.
pub trait OcrBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Check that the engine can run (binaries on PATH, models loaded).
    fn ensure_available(&self) -> Result<()>;

    /// Recognize the text of a PDF or image document.
    fn recognize(&self, document: &Document) -> Result<String>;
}

/// Build the backend selected in the configuration.
#[cfg(feature = "native")]
pub fn create_backend(config: &OcrConfig) -> Result<Box<dyn OcrBackend>> {
    let backend: Box<dyn OcrBackend> = match config.backend {
        OcrBackendKind::Tesseract => Box::new(TesseractBackend::new(config)),
        OcrBackendKind::Onnx => Box::new(OnnxBackend::from_config(config)?),
    };
    tracing::debug!("Using {} OCR backend", backend.name());
    Ok(backend)
}

/// Join page texts with a blank line, skipping pages without text.
pub fn join_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = String>,
{
    pages
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_pages() {
        let text = join_pages(vec!["IBAN FR76".to_string(), "  \n".to_string(), "BIC".to_string()]);
        assert_eq!(text, "IBAN FR76\n\nBIC");
        assert_eq!(join_pages(Vec::<String>::new()), "");
    }
}
