//! RIB parser reconciling IBAN-derived and label-derived fields.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::models::config::ExtractionConfig;
use crate::models::record::RibFields;

use super::rules::bic::validator_from_config;
use super::rules::{
    build_french_iban, compute_rib_key, decompose_french_iban, extract_domiciliation,
    extract_holder, find_valid_french_iban, normalize, BicLocator, BicValidator, LabelFields,
};
use super::vision::ModelFields;
use super::{Result, RibExtractor};

/// Result of RIB extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Merged RIB fields.
    pub fields: RibFields,
    /// Raw input text.
    pub raw_text: String,
    /// Missing fields and gap-filling notes.
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Rule-based RIB parser.
///
/// Runs the IBAN engine, the label extractor and the BIC locator over the
/// same normalized text and merges their findings into one field set.
#[derive(Debug, Clone, Default)]
pub struct RibParser {
    bic: BicLocator,
}

impl RibParser {
    /// Create a parser with structural BIC validation.
    pub fn new() -> Self {
        Self {
            bic: BicLocator::new(),
        }
    }

    /// Create a parser from the extraction configuration.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new()
            .with_bic_validator(validator_from_config(config))
            .with_address_words(&config.extra_address_words)
    }

    /// Set the BIC validator.
    pub fn with_bic_validator(mut self, validator: Arc<dyn BicValidator>) -> Self {
        self.bic = self.bic.with_validator(validator);
        self
    }

    /// Add words never accepted as a BIC.
    pub fn with_address_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.bic = self.bic.with_address_words(words);
        self
    }

    /// Parse OCR text into RIB fields.
    pub fn parse(&self, text: &str) -> ExtractionResult {
        let start = Instant::now();
        let mut warnings = Vec::new();

        info!("Parsing RIB from {} characters of text", text.len());

        let clean = normalize(text);
        let iban = find_valid_french_iban(&clean);
        let mut labels = LabelFields::from_text(&clean);
        if labels.holder_name.is_none() {
            labels.holder_name = extract_holder(text);
        }
        if labels.domiciliation.is_none() {
            labels.domiciliation = extract_domiciliation(text);
        }
        let bic = self.bic.locate(&clean);

        let fields = reconcile(iban, labels, bic, &mut warnings);
        push_missing(&fields, &mut warnings);

        debug!(
            "Extracted RIB with {} of 8 fields",
            8 - fields.missing_fields().len()
        );

        ExtractionResult {
            fields,
            raw_text: text.to_string(),
            warnings,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Parse a vision model's text reply into RIB fields.
    pub fn parse_reply(&self, reply: &str) -> Result<ExtractionResult> {
        let start = Instant::now();
        let mut warnings = Vec::new();

        let model = ModelFields::from_reply(reply)?;
        let fields = reconcile(model.iban, model.labels, model.bic, &mut warnings);
        push_missing(&fields, &mut warnings);

        Ok(ExtractionResult {
            fields,
            raw_text: reply.to_string(),
            warnings,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

impl RibExtractor for RibParser {
    fn extract_from_text(&self, text: &str) -> RibFields {
        self.parse(text).fields
    }

    fn extract_from_reply(&self, reply: &str) -> Result<RibFields> {
        self.parse_reply(reply).map(|r| r.fields)
    }
}

/// Merge an IBAN, label values and a BIC into one field set.
///
/// Values decomposed from a French IBAN win over label values. A missing
/// key is computed from bank, branch and account, and a missing IBAN is
/// rebuilt from all four. Each gap filled is noted in `notes`.
pub fn reconcile(
    iban: Option<String>,
    labels: LabelFields,
    bic: Option<String>,
    notes: &mut Vec<String>,
) -> RibFields {
    let parts = iban.as_deref().and_then(decompose_french_iban);

    let (mut bank_code, mut branch_code, mut account_number, mut rib_key) = (
        labels.bank_code,
        labels.branch_code,
        labels.account_number,
        labels.rib_key,
    );
    if let Some(parts) = parts {
        bank_code = Some(parts.bank_code);
        branch_code = Some(parts.branch_code);
        account_number = Some(parts.account_number);
        rib_key = Some(parts.rib_key);
    }

    if rib_key.is_none() {
        if let (Some(bank), Some(branch), Some(account)) = (&bank_code, &branch_code, &account_number) {
            rib_key = compute_rib_key(bank, branch, account);
            if rib_key.is_some() {
                notes.push("RIB key computed from bank, branch and account".to_string());
            }
        }
    }

    let mut iban = iban;
    if iban.is_none() {
        if let (Some(bank), Some(branch), Some(account), Some(key)) =
            (&bank_code, &branch_code, &account_number, &rib_key)
        {
            iban = build_french_iban(bank, branch, account, key);
            if iban.is_some() {
                notes.push("IBAN rebuilt from RIB components".to_string());
            }
        }
    }

    RibFields {
        holder_name: labels.holder_name,
        bank_code,
        branch_code,
        account_number,
        rib_key,
        iban,
        bic,
        domiciliation: labels.domiciliation,
    }
}

fn push_missing(fields: &RibFields, warnings: &mut Vec<String>) {
    for name in fields.missing_fields() {
        warnings.push(format!("Could not extract {}", name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rib::rules::RegistryBicValidator;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_iban_alone() {
        let result = RibParser::new().parse("IBAN: FR76 3000 6000 0112 3456 7890 189");
        let fields = result.fields;

        assert_eq!(fields.iban.as_deref(), Some("FR76 3000 6000 0112 3456 7890 189"));
        assert_eq!(fields.bank_code.as_deref(), Some("30006"));
        assert_eq!(fields.branch_code.as_deref(), Some("00001"));
        assert_eq!(fields.account_number.as_deref(), Some("12345678901"));
        assert_eq!(fields.rib_key.as_deref(), Some("89"));
        assert_eq!(fields.bic, None);
        assert_eq!(fields.holder_name, None);
        assert_eq!(fields.domiciliation, None);
        assert_eq!(result.warnings.len(), 3);
    }

    #[test]
    fn test_labels_only_rebuild_iban() {
        let text = "Code Banque 12345\nCode Guichet 67890\nCompte AB1234567890Z";
        let result = RibParser::new().parse(text);
        let fields = &result.fields;

        assert_eq!(fields.account_number.as_deref(), Some("1234567890Z"));
        assert_eq!(fields.rib_key.as_deref(), Some("53"));
        assert_eq!(fields.iban.as_deref(), Some("FR28 1234 5678 9012 3456 7890 Z53"));
        assert!(result.warnings.iter().any(|w| w.contains("RIB key computed")));
        assert!(result.warnings.iter().any(|w| w.contains("IBAN rebuilt")));
    }

    #[test]
    fn test_bic_two_lines_after_label() {
        let text = "BIC\n\nBOUSFRPPXXX";
        let fields = RibParser::new().parse(text).fields;
        assert_eq!(fields.bic.as_deref(), Some("BOUSFRPPXXX"));

        let parser = RibParser::new()
            .with_bic_validator(Arc::new(RegistryBicValidator::new(["AGRIFRPP"])));
        assert_eq!(parser.parse(text).fields.bic, None);
    }

    #[test]
    fn test_iban_wins_over_labels() {
        let text = "RELEVE D'IDENTITE BANCAIRE
Titulaire du compte : M. JEAN DUPONT
Domiciliation : CREDIT AGRICOLE
AGENCE PARIS OPERA
Code Banque Code Guichet Numéro de compte Clé RIB
30006 00001 12345678901 89
IBAN : FR76 3000 6000 0112 3456 7890 189
BIC : AGRIFRPP";
        let fields = RibParser::new().parse(text).fields;

        assert_eq!(fields.holder_name.as_deref(), Some("M. JEAN DUPONT"));
        assert_eq!(fields.branch_code.as_deref(), Some("00001"));
        assert_eq!(fields.account_number.as_deref(), Some("12345678901"));
        assert_eq!(fields.rib_key.as_deref(), Some("89"));
        assert_eq!(fields.bic.as_deref(), Some("AGRIFRPP"));
        assert_eq!(
            fields.domiciliation.as_deref(),
            Some("CREDIT AGRICOLE AGENCE PARIS OPERA")
        );
        assert!(fields.missing_fields().is_empty());
    }

    #[test]
    fn test_noisy_ocr_spacing() {
        let text = "Titulaire :   SAS  OPTIMA\r\nIBAN   FR76 3000\t6000 0112 3456 7890 189\r\nB.I.C :  BOUS FRPP XXX";
        let fields = RibParser::new().parse(text).fields;
        assert_eq!(fields.holder_name.as_deref(), Some("SAS OPTIMA"));
        assert_eq!(fields.iban.as_deref(), Some("FR76 3000 6000 0112 3456 7890 189"));
        assert_eq!(fields.bic.as_deref(), Some("BOUSFRPPXXX"));
    }

    #[test]
    fn test_partial_labels_no_guess() {
        let text = "Code Banque 12345\nCompte 1234567890Z";
        let fields = RibParser::new().parse(text).fields;
        assert_eq!(fields.bank_code.as_deref(), Some("12345"));
        assert_eq!(fields.branch_code, None);
        assert_eq!(fields.rib_key, None);
        assert_eq!(fields.iban, None);
    }

    #[test]
    fn test_reconcile_keeps_foreign_iban() {
        let labels = LabelFields {
            bank_code: Some("12345".to_string()),
            ..Default::default()
        };
        let mut notes = Vec::new();
        let fields = reconcile(
            Some("PL61 1090 1014 0000 0712 1981 2874".to_string()),
            labels,
            None,
            &mut notes,
        );
        assert_eq!(fields.iban.as_deref(), Some("PL61 1090 1014 0000 0712 1981 2874"));
        assert_eq!(fields.bank_code.as_deref(), Some("12345"));
        assert!(notes.is_empty());
    }

    #[test]
    fn test_extractor_trait() {
        let parser = RibParser::new();
        let fields = parser.extract_from_text("IBAN FR7630006000011234567890189");
        assert_eq!(fields.bank_code.as_deref(), Some("30006"));

        let fields = parser
            .extract_from_reply(r#"{"iban": "FR7630006000011234567890189", "bic": "agri frpp"}"#)
            .unwrap();
        assert_eq!(fields.rib_key.as_deref(), Some("89"));
        assert_eq!(fields.bic.as_deref(), Some("AGRIFRPP"));
    }
}
