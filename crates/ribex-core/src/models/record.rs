//! Output record for one processed RIB document.

use serde::{Deserialize, Serialize};

use crate::error::DocumentError;

/// Placeholder written in exports for an absent field.
pub const MISSING: &str = "MANQUANT";

/// Merged RIB fields before they are attached to a source document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RibFields {
    /// Account holder.
    pub holder_name: Option<String>,
    /// 5-digit bank code.
    pub bank_code: Option<String>,
    /// 5-digit branch code.
    pub branch_code: Option<String>,
    /// Account number (5-34 alphanumerics).
    pub account_number: Option<String>,
    /// 2-digit RIB key.
    pub rib_key: Option<String>,
    /// IBAN in groups of 4 characters.
    pub iban: Option<String>,
    /// BIC/SWIFT code (8 or 11 characters).
    pub bic: Option<String>,
    /// Bank branch address.
    pub domiciliation: Option<String>,
}

impl RibFields {
    /// Names of the fields that are still absent.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let fields = [
            ("holder_name", &self.holder_name),
            ("bank_code", &self.bank_code),
            ("branch_code", &self.branch_code),
            ("account_number", &self.account_number),
            ("rib_key", &self.rib_key),
            ("iban", &self.iban),
            ("bic", &self.bic),
            ("domiciliation", &self.domiciliation),
        ];
        for (name, value) in fields {
            if value.is_none() {
                missing.push(name);
            }
        }
        missing
    }
}

/// One output row per input document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Originating file name.
    pub source_name: String,
    pub holder_name: Option<String>,
    pub bank_code: Option<String>,
    pub branch_code: Option<String>,
    pub account_number: Option<String>,
    pub rib_key: Option<String>,
    pub iban: Option<String>,
    pub bic: Option<String>,
    pub domiciliation: Option<String>,
    /// Soft failure for this document, if any.
    pub error: Option<DocumentError>,
}

impl ExtractedRecord {
    /// Build a successful record from merged fields.
    pub fn from_fields(source_name: impl Into<String>, fields: RibFields) -> Self {
        Self {
            source_name: source_name.into(),
            holder_name: fields.holder_name,
            bank_code: fields.bank_code,
            branch_code: fields.branch_code,
            account_number: fields.account_number,
            rib_key: fields.rib_key,
            iban: fields.iban,
            bic: fields.bic,
            domiciliation: fields.domiciliation,
            error: None,
        }
    }

    /// Build a record for a document that could not be processed.
    ///
    /// Every data field is absent.
    pub fn failed(source_name: impl Into<String>, error: DocumentError) -> Self {
        let mut record = Self::from_fields(source_name, RibFields::default());
        record.error = Some(error);
        record
    }

    /// Whether processing succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Status cell for tabular exports: `OK` or `ERREUR: <message>`.
    pub fn status(&self) -> String {
        match &self.error {
            None => "OK".to_string(),
            Some(e) => format!("ERREUR: {}", e),
        }
    }

    /// Data fields in export column order, with absent values as [`MISSING`].
    pub fn columns(&self) -> [&str; 8] {
        fn show(v: &Option<String>) -> &str {
            match v.as_deref() {
                Some(s) if !s.is_empty() => s,
                _ => MISSING,
            }
        }
        [
            show(&self.holder_name),
            show(&self.bank_code),
            show(&self.branch_code),
            show(&self.account_number),
            show(&self.rib_key),
            show(&self.bic),
            show(&self.iban),
            show(&self.domiciliation),
        ]
    }
}

/// Export column headers matching [`ExtractedRecord::columns`], prefixed by file and status.
pub const EXPORT_HEADERS: [&str; 10] = [
    "Fichier",
    "Statut",
    "Titulaire du compte",
    "Code Banque",
    "Code Guichet",
    "N° de compte",
    "Clé RIB",
    "BIC / SWIFT",
    "IBAN",
    "Domiciliation",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_record_has_no_fields() {
        let record = ExtractedRecord::failed("scan.pdf", DocumentError::EmptyText);
        assert!(!record.is_ok());
        assert!(record.iban.is_none());
        assert!(record.columns().iter().all(|c| *c == MISSING));
        assert!(record.status().starts_with("ERREUR: OCR vide"));
    }

    #[test]
    fn test_columns_order() {
        let fields = RibFields {
            bank_code: Some("30006".to_string()),
            bic: Some("AGRIFRPP".to_string()),
            ..Default::default()
        };
        let record = ExtractedRecord::from_fields("a.pdf", fields);
        let cols = record.columns();
        assert_eq!(cols[1], "30006");
        assert_eq!(cols[5], "AGRIFRPP");
        assert_eq!(cols[6], MISSING);
        assert_eq!(record.status(), "OK");
    }

    #[test]
    fn test_missing_fields() {
        let fields = RibFields {
            iban: Some("FR76 3000 6000 0112 3456 7890 189".to_string()),
            ..Default::default()
        };
        let missing = fields.missing_fields();
        assert_eq!(missing.len(), 7);
        assert!(!missing.contains(&"iban"));
    }
}
