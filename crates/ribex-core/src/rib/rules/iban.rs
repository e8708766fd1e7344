//! IBAN detection, validation and French BBAN arithmetic.

use super::patterns::{IBAN_FR_COMPACT, IBAN_LABEL};
use super::text::compact;
use super::{ExtractionMatch, FieldExtractor};
use tracing::trace;

/// Length of a French IBAN without spaces.
pub const FRENCH_IBAN_LEN: usize = 27;

/// French BBAN decomposed from an IBAN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IbanParts {
    pub bank_code: String,
    pub branch_code: String,
    pub account_number: String,
    pub rib_key: String,
}

/// Finds valid French IBANs in OCR text.
///
/// Candidates are searched in the compacted text first, so IBANs split by
/// OCR spacing or punctuation are still found, then after an `IBAN` label.
pub struct IbanExtractor;

impl IbanExtractor {
    pub fn new() -> Self {
        Self
    }

    fn compact_candidates(&self, text: &str) -> Vec<ExtractionMatch<String>> {
        let squeezed = compact(text).to_uppercase();
        IBAN_FR_COMPACT
            .find_iter(&squeezed)
            .filter(|m| {
                let valid = is_valid_french_iban(m.as_str());
                if !valid {
                    trace!("Rejected IBAN candidate {}: bad checksum", m.as_str());
                }
                valid
            })
            .map(|m| ExtractionMatch::new(m.as_str().to_string(), 0.95, m.as_str()))
            .collect()
    }

    fn labeled_candidates(&self, text: &str) -> Vec<ExtractionMatch<String>> {
        let mut found = Vec::new();
        for caps in IBAN_LABEL.captures_iter(text) {
            let Some(span) = caps.get(1) else { continue };
            let mut candidate = compact(span.as_str()).to_uppercase();
            if !candidate.starts_with("FR") || candidate.len() < FRENCH_IBAN_LEN {
                continue;
            }
            candidate.truncate(FRENCH_IBAN_LEN);
            if is_valid_french_iban(&candidate) {
                found.push(
                    ExtractionMatch::new(candidate, 0.9, span.as_str())
                        .with_position(span.start(), span.end()),
                );
            }
        }
        found
    }
}

impl Default for IbanExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for IbanExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.compact_candidates(text)
            .into_iter()
            .next()
            .or_else(|| self.labeled_candidates(text).into_iter().next())
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<ExtractionMatch<String>> = Vec::new();
        for candidate in self
            .compact_candidates(text)
            .into_iter()
            .chain(self.labeled_candidates(text))
        {
            if !results.iter().any(|r| r.value == candidate.value) {
                results.push(candidate);
            }
        }
        results
    }
}

/// First valid French IBAN in the text, formatted in groups of 4.
pub fn find_valid_french_iban(text: &str) -> Option<String> {
    IbanExtractor::new()
        .extract(text)
        .map(|m| format_iban(&m.value))
}

/// Validate an IBAN using the checksum algorithm.
///
/// Algorithm:
/// 1. Move first 4 characters to the end
/// 2. Replace letters with numbers (A=10, B=11, ..., Z=35)
/// 3. The resulting number mod 97 should equal 1
pub fn validate_iban(iban: &str) -> bool {
    let iban: String = iban
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    if iban.len() < 5 || !iban.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    if !iban[..2].chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    if !iban[2..4].chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let rearranged = format!("{}{}", &iban[4..], &iban[..4]);
    mod97(&to_digits(&rearranged)) == 1
}

/// Whether the value is a French IBAN (27 characters) with a valid checksum.
pub fn is_valid_french_iban(iban: &str) -> bool {
    let iban = compact_iban(iban);
    iban.len() == FRENCH_IBAN_LEN && iban.starts_with("FR") && validate_iban(&iban)
}

/// Uppercase and drop everything that is not an ASCII letter or digit.
pub fn compact_iban(iban: &str) -> String {
    compact(iban).to_ascii_uppercase()
}

/// Format IBAN in groups of 4 characters.
pub fn format_iban(iban: &str) -> String {
    compact_iban(iban)
        .as_bytes()
        .chunks(4)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<String>>()
        .join(" ")
}

/// Split a valid French IBAN into its RIB components.
///
/// Layout after the `FRkk` prefix: bank (5), branch (5), account (11), key (2).
pub fn decompose_french_iban(iban: &str) -> Option<IbanParts> {
    let iban = compact_iban(iban);
    if !is_valid_french_iban(&iban) {
        return None;
    }
    Some(IbanParts {
        bank_code: iban[4..9].to_string(),
        branch_code: iban[9..14].to_string(),
        account_number: iban[14..25].to_string(),
        rib_key: iban[25..27].to_string(),
    })
}

/// Compute the 2-digit RIB key from bank, branch and account.
///
/// Letters of the account map to 10..35 like in IBAN arithmetic. The key is
/// `97 - (bank ++ branch ++ account) mod 97`, so it ranges over 01..97.
/// Returns `None` when a component is empty or the concatenation is not
/// purely numeric.
pub fn compute_rib_key(bank_code: &str, branch_code: &str, account_number: &str) -> Option<String> {
    let account: String = account_number
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase();
    if bank_code.is_empty() || branch_code.is_empty() || account.is_empty() {
        return None;
    }
    let base = format!("{}{}{}", bank_code, branch_code, to_digits(&account));
    if !base.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{:02}", 97 - mod97(&base)))
}

/// Build a French IBAN from RIB components.
///
/// Components must have the French BBAN shape (5 digits, 5 digits,
/// 11 alphanumerics, 2 digits). The result is validated and formatted in
/// groups of 4.
pub fn build_french_iban(
    bank_code: &str,
    branch_code: &str,
    account_number: &str,
    rib_key: &str,
) -> Option<String> {
    let digits = |s: &str, len: usize| s.len() == len && s.chars().all(|c| c.is_ascii_digit());
    let account = account_number.to_ascii_uppercase();
    if !digits(bank_code, 5)
        || !digits(branch_code, 5)
        || !digits(rib_key, 2)
        || account.len() != 11
        || !account.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }

    let bban = format!("{}{}{}{}", bank_code, branch_code, account, rib_key);
    let check = 98 - mod97(&to_digits(&format!("{}FR00", bban)));
    let iban = format!("FR{:02}{}", check, bban);

    is_valid_french_iban(&iban).then(|| format_iban(&iban))
}

/// Replace letters with their 10..35 value, keep digits.
fn to_digits(value: &str) -> String {
    let mut number_str = String::with_capacity(value.len() * 2);
    for c in value.chars() {
        if c.is_ascii_digit() {
            number_str.push(c);
        } else if c.is_ascii_alphabetic() {
            let n = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 10;
            number_str.push_str(&n.to_string());
        }
    }
    number_str
}

// Digit string is too large for u64, reduce one digit at a time.
fn mod97(number_str: &str) -> u32 {
    number_str
        .chars()
        .filter_map(|c| c.to_digit(10))
        .fold(0, |rem, digit| (rem * 10 + digit) % 97)
}
