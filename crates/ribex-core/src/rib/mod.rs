//! RIB field extraction module.

mod parser;
pub mod rules;
pub mod vision;

pub use parser::{reconcile, ExtractionResult, RibParser};

use crate::error::ExtractionError;
use crate::models::record::RibFields;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Trait for RIB field extractors.
pub trait RibExtractor {
    /// Extract RIB fields from OCR text.
    fn extract_from_text(&self, text: &str) -> RibFields;

    /// Extract RIB fields from a vision model's text reply.
    fn extract_from_reply(&self, reply: &str) -> Result<RibFields>;
}
