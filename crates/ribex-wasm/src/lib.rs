//! WASM bindings for French RIB extraction.
//!
//! OCR runs on the JavaScript side; these bindings take its text (or a
//! vision model's reply) and return the extracted bank details.

use std::sync::Arc;

use wasm_bindgen::prelude::*;

use ribex_core::models::config::PdfConfig;
use ribex_core::rib::rules::{self, RegistryBicValidator};
use ribex_core::{ExtractedRecord, ModelReply, RibParser, RibPipeline, TextReader};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn pipeline(parser: RibParser) -> RibPipeline {
    RibPipeline::new(TextReader::new(PdfConfig::default()), parser)
}

fn to_js(record: &ExtractedRecord) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(record).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Extract bank details from OCR text.
///
/// Returns the output record; empty text gives a record carrying an
/// `empty_text` error.
#[wasm_bindgen]
pub fn extract_rib_from_text(text: &str) -> Result<JsValue, JsValue> {
    to_js(&pipeline(RibParser::new()).record_from_text("text", text))
}

/// Turn a raw vision-model reply into a record for `name`.
#[wasm_bindgen]
pub fn parse_model_reply(name: &str, reply: &str) -> Result<JsValue, JsValue> {
    let reply = ModelReply::from_raw(reply);
    to_js(&pipeline(RibParser::new()).process_reply(name, &reply))
}

/// Check an IBAN's mod-97 checksum.
#[wasm_bindgen]
pub fn validate_iban(iban: &str) -> bool {
    rules::validate_iban(iban)
}

/// Format an IBAN in groups of 4.
#[wasm_bindgen]
pub fn format_iban(iban: &str) -> String {
    rules::format_iban(iban)
}

/// RIB key for a bank code, branch code and account number.
#[wasm_bindgen]
pub fn compute_rib_key(bank_code: &str, branch_code: &str, account_number: &str) -> Option<String> {
    rules::compute_rib_key(bank_code, branch_code, account_number)
}

/// French IBAN built from RIB components.
#[wasm_bindgen]
pub fn build_french_iban(
    bank_code: &str,
    branch_code: &str,
    account_number: &str,
    rib_key: &str,
) -> Option<String> {
    rules::build_french_iban(bank_code, branch_code, account_number, rib_key)
}

/// Normalized French BIC, or nothing when the code is rejected.
#[wasm_bindgen]
pub fn validate_bic(bic: &str) -> Option<String> {
    rules::validate_bic(bic)
}

/// RIB extractor class for browser use.
#[wasm_bindgen]
pub struct RibExtractor {
    parser: RibParser,
}

#[wasm_bindgen]
impl RibExtractor {
    /// Create an extractor with structural BIC validation.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            parser: RibParser::new(),
        }
    }

    /// Only accept BICs from this list.
    #[wasm_bindgen]
    pub fn set_known_bics(&mut self, codes: Vec<String>) {
        let registry = RegistryBicValidator::new(codes);
        self.parser = self.parser.clone().with_bic_validator(Arc::new(registry));
    }

    /// Never accept these words as a BIC.
    #[wasm_bindgen]
    pub fn add_address_words(&mut self, words: Vec<String>) {
        self.parser = self.parser.clone().with_address_words(words);
    }

    /// Extract the output record from OCR text.
    #[wasm_bindgen]
    pub fn extract(&self, text: &str) -> Result<JsValue, JsValue> {
        to_js(&pipeline(self.parser.clone()).record_from_text("text", text))
    }

    /// Extract fields along with gap-filling notes and timing.
    #[wasm_bindgen]
    pub fn extract_with_warnings(&self, text: &str) -> Result<JsValue, JsValue> {
        let result = self.parser.parse(text);

        #[derive(serde::Serialize)]
        struct ExtractResult {
            fields: ribex_core::RibFields,
            warnings: Vec<String>,
            processing_time_ms: u64,
        }

        let output = ExtractResult {
            fields: result.fields,
            warnings: result.warnings,
            processing_time_ms: result.processing_time_ms,
        };

        serde_wasm_bindgen::to_value(&output).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Names of the fields the text does not yield.
    #[wasm_bindgen]
    pub fn missing_fields(&self, text: &str) -> js_sys::Array {
        self.parser
            .parse(text)
            .fields
            .missing_fields()
            .into_iter()
            .map(JsValue::from_str)
            .collect()
    }
}

impl Default for RibExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_validate_iban() {
        assert!(validate_iban("FR76 3000 6000 0112 3456 7890 189"));
        assert!(!validate_iban("FR76 3000 6000 0112 3456 7890 188"));
    }

    #[wasm_bindgen_test]
    fn test_rib_key_and_iban() {
        assert_eq!(compute_rib_key("30006", "00001", "00000000083").as_deref(), Some("97"));
        assert_eq!(
            build_french_iban("12345", "67890", "1234567890Z", "53").as_deref(),
            Some("FR28 1234 5678 9012 3456 7890 Z53")
        );
    }

    #[wasm_bindgen_test]
    fn test_validate_bic() {
        assert_eq!(validate_bic("agri frpp").as_deref(), Some("AGRIFRPP"));
        assert_eq!(validate_bic("BOULOGNE"), None);
    }
}
