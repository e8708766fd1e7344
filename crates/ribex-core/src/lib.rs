//! Core library for French RIB (bank details) extraction.
//!
//! This crate provides:
//! - Text normalization for noisy OCR output
//! - French IBAN location, mod-97 validation, decomposition and rebuilding
//! - RIB key computation
//! - BIC/SWIFT location with false-positive rejection
//! - Label-based field extraction and IBAN/label reconciliation
//! - Vision-model reply parsing
//! - OCR backends and PDF text-layer reading

pub mod error;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod rib;

pub use error::{DocumentError, RibexError, Result};
pub use models::document::{Document, DocumentKind};
pub use models::record::{ExtractedRecord, RibFields, MISSING};
pub use ocr::OcrBackend;
#[cfg(feature = "native")]
pub use ocr::{create_backend, OnnxBackend, TesseractBackend};
pub use pdf::{PdfExtractor, PdfProcessor, PdfType};
pub use pipeline::{RibPipeline, TextReader};
pub use rib::{ExtractionResult, RibExtractor, RibParser};
pub use rib::vision::{ModelReply, EXTRACTION_PROMPT};
