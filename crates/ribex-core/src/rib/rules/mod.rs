//! Rule-based field extractors for French RIB documents.

pub mod bic;
pub mod iban;
pub mod labels;
pub mod patterns;
pub mod text;

pub use bic::{
    validate_bic, BicLocator, BicValidator, RegistryBicValidator, StructuralBicValidator,
    ADDRESS_WORDS,
};
pub use iban::{
    build_french_iban, compact_iban, compute_rib_key, decompose_french_iban,
    find_valid_french_iban, format_iban, is_valid_french_iban, validate_iban, IbanExtractor,
    IbanParts,
};
pub use labels::{
    extract_account_number, extract_bank_code, extract_branch_code, extract_domiciliation,
    extract_holder, extract_rib_key, LabelFields,
};
pub use text::{compact, normalize};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all candidates for the field, best first.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// Extraction context with confidence scores.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Byte span in the searched text, when it maps back to the input.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}
