//! PDF text layer and embedded page images.

mod extractor;

pub use extractor::PdfExtractor;

use crate::error::PdfError;
use image::DynamicImage;

/// Type of PDF content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfType {
    /// Text layer long enough to parse directly.
    Text,
    /// Only page images (scanned RIB).
    Image,
    /// Both a usable text layer and page images.
    Hybrid,
    /// Empty or unreadable.
    Empty,
}

impl PdfType {
    /// Whether the text layer can be parsed without OCR.
    pub fn has_text_layer(self) -> bool {
        matches!(self, PdfType::Text | PdfType::Hybrid)
    }
}

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for PDF processing implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Analyze the PDF to determine its type.
    fn analyze(&self) -> PdfType;

    /// Extract the text layer of the entire PDF.
    fn extract_text(&self) -> Result<String>;

    /// Extract embedded images from a page (1-indexed).
    fn extract_images(&self, page: u32) -> Result<Vec<DynamicImage>>;
}
