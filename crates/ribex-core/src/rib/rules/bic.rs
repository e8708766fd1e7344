//! BIC/SWIFT location and validation.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::patterns::{BIC_COMPACT, BIC_LABEL, BIC_SEPARATORS, BIC_TOKEN};
use super::text::compact;
use super::{ExtractionMatch, FieldExtractor};
use crate::models::config::ExtractionConfig;

/// Words that look like a BIC once OCR glues them to the next token.
pub const ADDRESS_WORDS: [&str; 3] = ["PARIS", "BOULOGNE", "FRANCE"];

/// Country code a RIB's BIC must carry.
pub const BIC_COUNTRY: &str = "FR";

/// Lines after a BIC label that may still hold the code.
const LABEL_WINDOW_LINES: usize = 5;

/// Decides whether a structurally valid code is a real BIC.
pub trait BicValidator: Send + Sync {
    /// Check a normalized 8 or 11 character code.
    fn is_valid(&self, code: &str) -> bool;
}

/// Accepts every structurally valid code.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralBicValidator;

impl BicValidator for StructuralBicValidator {
    fn is_valid(&self, _code: &str) -> bool {
        true
    }
}

/// Accepts only codes listed in a registry.
///
/// An 8 character code matches an 11 character entry with the same first
/// 8 characters and the other way round.
#[derive(Debug, Clone, Default)]
pub struct RegistryBicValidator {
    codes: HashSet<String>,
}

impl RegistryBicValidator {
    /// Create a registry from an iterator of codes.
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = HashSet::new();
        for code in codes {
            let code = compact(code.as_ref()).to_ascii_uppercase();
            if code.len() == 8 || code.len() == 11 {
                set.insert(code[..8].to_string());
                set.insert(code);
            }
        }
        Self { codes: set }
    }

    /// Load a newline-separated registry. Blank lines and `#` comments are skipped.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let registry = Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#')),
        );
        debug!("Loaded {} BIC registry entries from {}", registry.len(), path.display());
        Ok(registry)
    }

    /// Number of stored entries (8 and 11 character forms).
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl BicValidator for RegistryBicValidator {
    fn is_valid(&self, code: &str) -> bool {
        if self.codes.contains(code) {
            return true;
        }
        code.len() == 11
            && code
                .get(..8)
                .is_some_and(|branchless| self.codes.contains(branchless))
    }
}

/// Validator described by the extraction configuration.
///
/// A registry that cannot be read is logged and replaced by the structural check.
pub fn validator_from_config(config: &ExtractionConfig) -> Arc<dyn BicValidator> {
    match &config.bic_registry {
        Some(path) => match RegistryBicValidator::from_file(path) {
            Ok(registry) => Arc::new(registry),
            Err(e) => {
                warn!("BIC registry {} unusable, using structural check: {}", path.display(), e);
                Arc::new(StructuralBicValidator)
            }
        },
        None => Arc::new(StructuralBicValidator),
    }
}

/// Validate a French BIC with the structural check only.
pub fn validate_bic(raw: &str) -> Option<String> {
    BicLocator::new().validate(raw)
}

/// Finds the BIC of a RIB in OCR text.
///
/// Labeled windows (`BIC`, `SWIFT`, `Code BIC`...) are searched first. Only
/// when no label yields a valid code is the whole text scanned.
#[derive(Clone)]
pub struct BicLocator {
    validator: Arc<dyn BicValidator>,
    address_words: Vec<String>,
}

impl BicLocator {
    pub fn new() -> Self {
        Self {
            validator: Arc::new(StructuralBicValidator),
            address_words: ADDRESS_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Set the validator consulted after the structural check.
    pub fn with_validator(mut self, validator: Arc<dyn BicValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Add words that must never be accepted as a BIC.
    pub fn with_address_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            let word = compact(word.as_ref()).to_ascii_uppercase();
            if !word.is_empty() && !self.address_words.contains(&word) {
                self.address_words.push(word);
            }
        }
        self
    }

    /// Normalize and validate a candidate BIC.
    ///
    /// The code must be 8 or 11 alphanumerics with an alphabetic bank part,
    /// the `FR` country code, not be an address word, and pass the validator.
    pub fn validate(&self, raw: &str) -> Option<String> {
        let code = compact(raw).to_ascii_uppercase();
        if code.len() != 8 && code.len() != 11 {
            return None;
        }
        if !code[..6].chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        if &code[4..6] != BIC_COUNTRY {
            return None;
        }
        if self.address_words.iter().any(|w| code.contains(w.as_str())) {
            return None;
        }
        self.validator.is_valid(&code).then_some(code)
    }

    /// First valid BIC in the text.
    pub fn locate(&self, text: &str) -> Option<String> {
        self.extract(text).map(|m| m.value)
    }

    /// Each BIC label line, extended by the following lines.
    fn labeled_windows(&self, text: &str) -> Vec<String> {
        let lines: Vec<&str> = text.lines().collect();
        let mut windows = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if !BIC_LABEL.is_match(line) {
                continue;
            }
            let end = (i + 1 + LABEL_WINDOW_LINES).min(lines.len());
            let window = &lines[i..end];
            windows.push(window.join("\n").to_uppercase());
        }
        windows
    }

    /// Candidates in one uppercased span: whole tokens, or when there are
    /// none, codes split by OCR spacing.
    fn candidates_in(&self, upper: &str, confidence: f32) -> Vec<ExtractionMatch<String>> {
        let mut found = Vec::new();
        for m in BIC_TOKEN.find_iter(upper) {
            match self.validate(m.as_str()) {
                Some(code) => found.push(ExtractionMatch::new(code, confidence, m.as_str())),
                None => trace!("Rejected BIC candidate {}", m.as_str()),
            }
        }
        if !found.is_empty() {
            return found;
        }

        let squeezed = compact(upper);
        for segment in BIC_SEPARATORS.split(&squeezed).filter(|s| !s.is_empty()) {
            for m in BIC_COMPACT.find_iter(segment) {
                if let Some(code) = self.validate(m.as_str()) {
                    found.push(ExtractionMatch::new(code, confidence * 0.9, m.as_str()));
                }
            }
        }
        found
    }

    fn labeled_candidates(&self, text: &str) -> Vec<ExtractionMatch<String>> {
        self.labeled_windows(text)
            .iter()
            .flat_map(|w| self.candidates_in(w, 0.9))
            .collect()
    }

    fn unlabeled_candidates(&self, text: &str) -> Vec<ExtractionMatch<String>> {
        self.candidates_in(&text.to_uppercase(), 0.6)
    }
}

impl Default for BicLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BicLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BicLocator")
            .field("address_words", &self.address_words)
            .finish_non_exhaustive()
    }
}

impl FieldExtractor for BicLocator {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.labeled_candidates(text)
            .into_iter()
            .next()
            .or_else(|| self.unlabeled_candidates(text).into_iter().next())
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<ExtractionMatch<String>> = Vec::new();
        for candidate in self
            .labeled_candidates(text)
            .into_iter()
            .chain(self.unlabeled_candidates(text))
        {
            if !results.iter().any(|r| r.value == candidate.value) {
                results.push(candidate);
            }
        }
        results
    }
}
