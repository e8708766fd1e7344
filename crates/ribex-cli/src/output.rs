//! Output formats for extracted records.

use std::fmt::Write as _;

use ribex_core::models::record::EXPORT_HEADERS;
use ribex_core::ExtractedRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON array of records
    Json,
    /// CSV table with French headers
    Csv,
    /// Plain text summary
    Text,
}

/// Render records in the requested format.
pub fn format_records(records: &[ExtractedRecord], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
        OutputFormat::Csv => format_csv(records),
        OutputFormat::Text => Ok(format_text(records)),
    }
}

fn format_csv(records: &[ExtractedRecord]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(EXPORT_HEADERS)?;

    for record in records {
        let status = record.status();
        let mut row = vec![record.source_name.as_str(), status.as_str()];
        row.extend(record.columns());
        wtr.write_record(&row)?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(records: &[ExtractedRecord]) -> String {
    let mut output = String::new();

    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        let _ = writeln!(output, "{} [{}]", record.source_name, record.status());
        if !record.is_ok() {
            continue;
        }
        for (label, value) in EXPORT_HEADERS[2..].iter().zip(record.columns()) {
            // Multi-line domiciliation stays aligned under its label
            let value = value.replace('\n', "\n                       ");
            let _ = writeln!(output, "  {:<20} {}", format!("{}:", label), value);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use ribex_core::{DocumentError, RibFields, MISSING};

    fn records() -> Vec<ExtractedRecord> {
        let fields = RibFields {
            holder_name: Some("M. JEAN DUPONT".to_string()),
            iban: Some("FR76 3000 6000 0112 3456 7890 189".to_string()),
            ..Default::default()
        };
        vec![
            ExtractedRecord::from_fields("rib.pdf", fields),
            ExtractedRecord::failed("scan.png", DocumentError::EmptyText),
        ]
    }

    #[test]
    fn test_csv_layout() {
        let csv = format_records(&records(), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Fichier,Statut,Titulaire du compte,Code Banque"));
        assert!(lines[1].starts_with("rib.pdf,OK,M. JEAN DUPONT,MANQUANT"));
        assert!(lines[1].contains("FR76 3000 6000 0112 3456 7890 189"));
        assert!(lines[2].starts_with("scan.png,ERREUR: OCR vide"));
        assert_eq!(lines[2].matches(MISSING).count(), 8);
    }

    #[test]
    fn test_json_array() {
        let json = format_records(&records(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().map(|a| a.len()), Some(2));
        assert_eq!(value[0]["holder_name"], "M. JEAN DUPONT");
        assert_eq!(value[1]["error"]["kind"], "empty_text");
    }

    #[test]
    fn test_text_summary() {
        let text = format_records(&records(), OutputFormat::Text).unwrap();
        assert!(text.contains("rib.pdf [OK]"));
        assert!(text.contains("IBAN:"));
        assert!(text.contains("scan.png [ERREUR: OCR vide"));
    }
}
