//! Text normalization for OCR output.

use super::patterns::HORIZONTAL_SPACE;

/// Drop carriage returns and collapse runs of spaces/tabs into one space.
///
/// Line breaks are kept: several extractors work line by line.
pub fn normalize(raw: &str) -> String {
    let without_cr = raw.replace('\r', "");
    HORIZONTAL_SPACE.replace_all(&without_cr, " ").into_owned()
}

/// Keep only ASCII letters and digits.
pub fn compact(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Code \t Banque\r\n 30006"), "Code Banque\n 30006");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_compact() {
        assert_eq!(compact("FR76 3000-6000.0112/3456"), "FR763000600001123456");
        assert_eq!(compact("Clé: 89"), "Cl89");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "  IBAN :\tFR76  3000 6000\r\n\r\nBIC   AGRIFRPP ",
            "\t\t\r",
            "Société Générale — agence Opéra",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
            let once = compact(s);
            assert_eq!(compact(&once), once);
        }
    }
}
