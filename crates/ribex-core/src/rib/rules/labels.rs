//! Label-driven extraction of RIB components.
//!
//! French RIBs print each component next to a label (`Code Banque`,
//! `Clé RIB`, `Titulaire`...). These extractors follow the labels and are
//! deliberately lenient about what sits between label and value.

use super::patterns::{
    ACCOUNT_NUMBER, BANK_CODE, BIC_LABEL, BRANCH_CODE, CIVILITY, DOMICILIATION_LABEL,
    HOLDER_BLEED, HOLDER_LABEL, MULTI_SPACE, RIB_KEY, RIB_SECTION_LABEL, SHORT_NUMBER,
    STREET_LINE,
};

/// Components read from labels. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelFields {
    pub bank_code: Option<String>,
    pub branch_code: Option<String>,
    pub account_number: Option<String>,
    pub rib_key: Option<String>,
    pub holder_name: Option<String>,
    pub domiciliation: Option<String>,
}

impl LabelFields {
    /// Run every label extractor over normalized text.
    pub fn from_text(text: &str) -> Self {
        Self {
            bank_code: extract_bank_code(text),
            branch_code: extract_branch_code(text),
            account_number: extract_account_number(text),
            rib_key: extract_rib_key(text),
            holder_name: extract_holder(text),
            domiciliation: extract_domiciliation(text),
        }
    }
}

/// 5-digit bank code after `Code Banque`, `Banque` or `Code BQ`.
pub fn extract_bank_code(text: &str) -> Option<String> {
    BANK_CODE.captures(text).map(|caps| caps[2].to_string())
}

/// 5-digit branch code after `Code Guichet` or `Guichet`.
pub fn extract_branch_code(text: &str) -> Option<String> {
    BRANCH_CODE.captures(text).map(|caps| caps[2].to_string())
}

/// Account number after a `Compte` label, uppercased, alphanumerics only.
///
/// Everything up to the first digit is skipped, so letters printed right
/// after the label are dropped (`Compte AB123...` reads `123...`).
pub fn extract_account_number(text: &str) -> Option<String> {
    let caps = ACCOUNT_NUMBER.captures(text)?;
    let account: String = caps[2]
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    (!account.is_empty()).then_some(account)
}

/// 2-digit key after `Clé RIB` or `Clé`.
pub fn extract_rib_key(text: &str) -> Option<String> {
    RIB_KEY.captures(text).map(|caps| caps[2].to_string())
}

/// Account holder.
///
/// The first line after a holder label wins when it is longer than 3
/// characters and does not bleed into another section. Otherwise the first
/// line with a civility or company-form marker is used.
pub fn extract_holder(text: &str) -> Option<String> {
    if let Some(caps) = HOLDER_LABEL.captures(text) {
        let value = caps[2].trim().lines().next().unwrap_or_default().trim();
        if value.chars().count() > 3 && !HOLDER_BLEED.is_match(value) {
            return Some(value.to_string());
        }
    }

    text.lines()
        .find(|line| CIVILITY.is_match(line))
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
}

/// Bank branch address.
///
/// Starts at the first `Domiciliation`/`Agence`/`Adresse` line and keeps
/// following lines until another RIB section or a line under 3 characters.
/// Without such a label, a street line or the text after `RIB` on a line
/// holding a number is used.
pub fn extract_domiciliation(text: &str) -> Option<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    for (i, line) in lines.iter().enumerate() {
        let Some(caps) = DOMICILIATION_LABEL.captures(line) else { continue };
        // "Adresse SWIFT" introduces a BIC, not an address
        if BIC_LABEL.is_match(line) {
            continue;
        }

        let mut parts: Vec<&str> = Vec::new();
        let after = caps.get(2).map_or("", |m| m.as_str().trim());
        if !after.is_empty() {
            parts.push(after);
        }
        for next in &lines[i + 1..] {
            if RIB_SECTION_LABEL.is_match(next) || next.chars().count() < 3 {
                break;
            }
            parts.push(*next);
        }

        let joined = parts.join(" ");
        let collapsed = MULTI_SPACE.replace_all(&joined, " ");
        let collapsed = collapsed.trim();
        if !collapsed.is_empty() {
            return Some(collapsed.to_string());
        }
    }

    if let Some(line) = lines.iter().find(|l| STREET_LINE.is_match(l)) {
        return Some(line.to_string());
    }

    lines
        .iter()
        .find(|l| l.to_uppercase().contains("RIB") && SHORT_NUMBER.is_match(l))
        .map(|l| {
            let tail = l.split_once("RIB").map_or(*l, |(_, after)| after);
            tail.trim_matches(|c: char| matches!(c, ' ' | ':' | '.' | '-')).to_string()
        })
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL_RIB: &str = "RELEVE D'IDENTITE BANCAIRE
Titulaire du compte : M. JEAN DUPONT
Domiciliation : CREDIT AGRICOLE
AGENCE PARIS OPERA
12 RUE DE LA PAIX
Code Banque Code Guichet Numéro de compte Clé RIB
30006 00001 12345678901 89
IBAN : FR76 3000 6000 0112 3456 7890 189
BIC : AGRIFRPP";

    #[test]
    fn test_labeled_codes() {
        let text = "Code Banque 12345\nCode Guichet 67890\nCompte AB1234567890Z\nClé RIB : 53";
        let fields = LabelFields::from_text(text);
        assert_eq!(fields.bank_code.as_deref(), Some("12345"));
        assert_eq!(fields.branch_code.as_deref(), Some("67890"));
        assert_eq!(fields.account_number.as_deref(), Some("1234567890Z"));
        assert_eq!(fields.rib_key.as_deref(), Some("53"));
    }

    #[test]
    fn test_value_on_next_line() {
        assert_eq!(extract_bank_code("Banque :\n 30004").as_deref(), Some("30004"));
        assert_eq!(extract_branch_code("Guichet\n00123").as_deref(), Some("00123"));
        assert_eq!(extract_bank_code("Code Banque : 3000"), None);
    }

    #[test]
    fn test_account_number_variants() {
        assert_eq!(
            extract_account_number("N° compte : 00012345678").as_deref(),
            Some("00012345678")
        );
        assert_eq!(
            extract_account_number("Numéro de compte 0001234567x").as_deref(),
            Some("0001234567X")
        );
    }

    #[test]
    fn test_holder_after_label() {
        assert_eq!(extract_holder(FULL_RIB).as_deref(), Some("M. JEAN DUPONT"));
        assert_eq!(
            extract_holder("Bénéficiaire :\nSARL LES JARDINS\nIBAN").as_deref(),
            Some("SARL LES JARDINS")
        );
    }

    #[test]
    fn test_holder_rejects_bleed_and_uses_civility() {
        let text = "Titulaire : IBAN\nMADAME MARIE CURIE\n";
        assert_eq!(extract_holder(text).as_deref(), Some("MADAME MARIE CURIE"));
        assert_eq!(extract_holder("Titulaire : ABC"), None);
        assert_eq!(extract_holder(""), None);
    }

    #[test]
    fn test_domiciliation_multiline() {
        assert_eq!(
            extract_domiciliation(FULL_RIB).as_deref(),
            Some("CREDIT AGRICOLE AGENCE PARIS OPERA 12 RUE DE LA PAIX")
        );
    }

    #[test]
    fn test_domiciliation_stops_on_short_line() {
        let text = "Agence :   BNP   PARIBAS\nOPERA\nxx\n75009 PARIS";
        assert_eq!(extract_domiciliation(text).as_deref(), Some("BNP PARIBAS OPERA"));
    }

    #[test]
    fn test_domiciliation_skips_swift_address() {
        let text = "Adresse SWIFT : BNPAFRPP\n5 avenue Foch";
        assert_eq!(extract_domiciliation(text).as_deref(), Some("5 avenue Foch"));
    }

    #[test]
    fn test_domiciliation_fallbacks() {
        assert_eq!(
            extract_domiciliation("LCL\n18 boulevard Haussmann\n75009").as_deref(),
            Some("18 boulevard Haussmann")
        );
        assert_eq!(
            extract_domiciliation("Votre RIB : 8 cours Mirabeau").as_deref(),
            Some("8 cours Mirabeau")
        );
        assert_eq!(extract_domiciliation("IBAN FR76"), None);
    }
}
