//! Common regex patterns for French RIB extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Labeled RIB components. `\D*` skips anything that is not a digit, so
    // the value may sit on the next line or after letters glued to the label.
    pub static ref BANK_CODE: Regex = Regex::new(
        r"(?i)\b(code\s*banque|banque|code\s*bq)\b\D*([0-9]{5})"
    ).unwrap();

    pub static ref BRANCH_CODE: Regex = Regex::new(
        r"(?i)\b(code\s*guichet|guichet)\b\D*([0-9]{5})"
    ).unwrap();

    pub static ref ACCOUNT_NUMBER: Regex = Regex::new(
        r"(?i)\b(num(?:[ée]ro)?\s*de\s*compte|n[°\s]*compte|compte)\b\D*([A-Z0-9]{5,34})"
    ).unwrap();

    pub static ref RIB_KEY: Regex = Regex::new(
        r"(?i)\b(cl[ée]\s*rib|cl[ée])\b\D*([0-9]{2})"
    ).unwrap();

    // IBAN patterns
    pub static ref IBAN_FR_COMPACT: Regex = Regex::new(
        r"FR[0-9]{2}[A-Z0-9]{23}"
    ).unwrap();

    pub static ref IBAN_LABEL: Regex = Regex::new(
        r"(?i)\bIBAN\b\s*[:\-]?\s*([A-Z0-9 ]{8,50})"
    ).unwrap();

    // BIC / SWIFT label, tolerant to OCR spacing and dots (B.I.C, S W I F T)
    pub static ref BIC_LABEL: Regex = Regex::new(concat!(
        r"(?i)\b(",
        r"B[.\s]*I[.\s]*C(?:[\s./:-]*S[.\s]*W[.\s]*I[.\s]*F[.\s]*T(?:\s*CODE)?)?",
        r"|S[.\s]*W[.\s]*I[.\s]*F[.\s]*T(?:\s*CODE)?",
        r"|CODE\s*B[.\s]*I[.\s]*C",
        r"|ADRESSE\s*S[.\s]*W[.\s]*I[.\s]*F[.\s]*T",
        r")\b"
    )).unwrap();

    // BIC shape: 4 letters bank, 2 letters country, 2 alnum location, 3 optional alnum branch
    pub static ref BIC_TOKEN: Regex = Regex::new(
        r"\b[A-Z]{4}[A-Z]{2}[A-Z0-9]{2}(?:[A-Z0-9]{3})?\b"
    ).unwrap();

    pub static ref BIC_COMPACT: Regex = Regex::new(
        r"[A-Z]{4}[A-Z]{2}[A-Z0-9]{2}(?:[A-Z0-9]{3})?"
    ).unwrap();

    // Spans of compacted text that can never be part of a BIC
    pub static ref BIC_SEPARATORS: Regex = Regex::new(
        r"FR[0-9]{2}[A-Z0-9]{23}|IBAN|BIC|SWIFT"
    ).unwrap();

    // Account holder
    pub static ref HOLDER_LABEL: Regex = Regex::new(
        r"(?i)\b(titulaire(?:\s*du\s*compte)?|nom\s+du\s+titul(?:aire)?|b[ée]n[ée]ficiaire|au\s*nom\s*de)\b\s*[:\-]?\s*([A-ZÉÈÊÀÂÎÏÔÙÜÇa-z0-9.'\-\s]+)"
    ).unwrap();

    pub static ref HOLDER_BLEED: Regex = Regex::new(
        r"(?i)\b(BIC|IBAN|DOMICILIATION)\b"
    ).unwrap();

    pub static ref CIVILITY: Regex = Regex::new(
        r"(?i)\b(M\.|MME|MONSIEUR|MADAME|SARL|SAS|SA|EURL|SOCIETE)\b"
    ).unwrap();

    // Domiciliation
    pub static ref DOMICILIATION_LABEL: Regex = Regex::new(
        r"(?i)\b(domiciliation|agence|adresse)\b[:\-\s]*(.*)"
    ).unwrap();

    pub static ref RIB_SECTION_LABEL: Regex = Regex::new(
        r"(?i)\b(BIC|IBAN|TITULAIRE|COMPTE|CODE BANQUE|CLE RIB|CLÉ RIB|RIB)\b"
    ).unwrap();

    pub static ref STREET_LINE: Regex = Regex::new(
        r"(?i)\b([0-9]{1,4}\s+(rue|avenue|bd|boulevard|place|impasse))\b"
    ).unwrap();

    pub static ref SHORT_NUMBER: Regex = Regex::new(
        r"[0-9]{1,4}\s"
    ).unwrap();

    pub static ref MULTI_SPACE: Regex = Regex::new(
        r"\s{2,}"
    ).unwrap();

    // Normalization
    pub static ref HORIZONTAL_SPACE: Regex = Regex::new(
        r"[ \t]+"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bic_label_variants() {
        for label in ["BIC", "B.I.C", "b i c", "SWIFT", "Swift Code", "Code BIC", "Adresse SWIFT", "BIC/SWIFT"] {
            assert!(BIC_LABEL.is_match(label), "{label}");
        }
        assert!(!BIC_LABEL.is_match("PUBLIC"));
        assert!(!BIC_LABEL.is_match("Code Banque"));
    }

    #[test]
    fn test_account_label_skips_letters() {
        let caps = ACCOUNT_NUMBER.captures("Compte AB1234567890Z").unwrap();
        assert_eq!(&caps[2], "1234567890Z");
    }
}
