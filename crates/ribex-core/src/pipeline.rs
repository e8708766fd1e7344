//! Document-to-record pipeline.
//!
//! Turns each input document into exactly one [`ExtractedRecord`], either
//! through text (embedded PDF text layer or OCR) and the rule-based parser,
//! or through a vision model's reply.

use tracing::{debug, info, warn};

use crate::error::DocumentError;
use crate::models::config::{PdfConfig, RibexConfig};
use crate::models::document::{Document, DocumentKind};
use crate::models::record::ExtractedRecord;
use crate::ocr::OcrBackend;
use crate::pdf::{PdfExtractor, PdfProcessor};
use crate::rib::rules::normalize;
use crate::rib::vision::ModelReply;
use crate::rib::RibParser;

/// Obtains the raw text of a document.
pub struct TextReader {
    backend: Option<Box<dyn OcrBackend>>,
    pdf: PdfConfig,
}

impl TextReader {
    /// Create a reader without OCR; only text documents and PDF text layers
    /// can be read.
    pub fn new(pdf: PdfConfig) -> Self {
        Self { backend: None, pdf }
    }

    /// Set the OCR backend used for images and scanned PDFs.
    pub fn with_backend(mut self, backend: Box<dyn OcrBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Read a document's text.
    ///
    /// OCR failures are logged and read as empty text. Only unsupported
    /// inputs are an error.
    pub fn read(&self, document: &Document) -> Result<String, DocumentError> {
        match document.kind() {
            DocumentKind::Text => Ok(String::from_utf8_lossy(&document.bytes).into_owned()),
            DocumentKind::Pdf => {
                if self.pdf.prefer_embedded_text {
                    if let Some(text) = self.embedded_text(document) {
                        return Ok(text);
                    }
                }
                Ok(self.ocr(document))
            }
            DocumentKind::Image => Ok(self.ocr(document)),
            DocumentKind::Unsupported => Err(DocumentError::Unreadable(format!(
                "unsupported file type: {}",
                document.mime_type
            ))),
        }
    }

    /// The PDF text layer, when it is long enough to skip OCR.
    fn embedded_text(&self, document: &Document) -> Option<String> {
        let mut extractor = PdfExtractor::new().with_min_text_length(self.pdf.min_text_length);
        if let Err(e) = extractor.load(&document.bytes) {
            warn!("Cannot read PDF structure of {}: {}", document.name, e);
            return None;
        }

        let pdf_type = extractor.analyze();
        debug!("{} analyzed as {:?}", document.name, pdf_type);
        if !pdf_type.has_text_layer() {
            return None;
        }

        match extractor.extract_text() {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Text layer extraction failed for {}: {}", document.name, e);
                None
            }
        }
    }

    fn ocr(&self, document: &Document) -> String {
        let Some(backend) = &self.backend else {
            warn!("No OCR backend configured, cannot read {}", document.name);
            return String::new();
        };

        match backend.recognize(document) {
            Ok(text) => {
                debug!("{} OCR read {} chars from {}", backend.name(), text.len(), document.name);
                text
            }
            Err(e) => {
                warn!("OCR failed for {}: {}", document.name, e);
                String::new()
            }
        }
    }
}

/// End-to-end RIB extraction for documents and model replies.
pub struct RibPipeline {
    reader: TextReader,
    parser: RibParser,
}

impl RibPipeline {
    /// Create a pipeline from its parts.
    pub fn new(reader: TextReader, parser: RibParser) -> Self {
        Self { reader, parser }
    }

    /// Create a pipeline from the configuration and an optional OCR backend.
    pub fn from_config(config: &RibexConfig, backend: Option<Box<dyn OcrBackend>>) -> Self {
        let mut reader = TextReader::new(config.pdf.clone());
        if let Some(backend) = backend {
            reader = reader.with_backend(backend);
        }
        Self::new(reader, RibParser::from_config(&config.extraction))
    }

    /// The rule-based parser.
    pub fn parser(&self) -> &RibParser {
        &self.parser
    }

    /// Read a document's text without parsing it.
    pub fn read_text(&self, document: &Document) -> Result<String, DocumentError> {
        self.reader.read(document)
    }

    /// Process one document through text and the rule-based parser.
    pub fn process(&self, document: &Document) -> ExtractedRecord {
        info!("Processing {}", document.name);
        match self.read_text(document) {
            Ok(text) => self.record_from_text(&document.name, &text),
            Err(e) => {
                warn!("{}: {}", document.name, e);
                ExtractedRecord::failed(&document.name, e)
            }
        }
    }

    /// Parse already-read text into a record.
    pub fn record_from_text(&self, source_name: &str, text: &str) -> ExtractedRecord {
        if normalize(text).trim().is_empty() {
            warn!("{}: no usable text", source_name);
            return ExtractedRecord::failed(source_name, DocumentError::EmptyText);
        }

        let result = self.parser.parse(text);
        for warning in &result.warnings {
            debug!("{}: {}", source_name, warning);
        }
        ExtractedRecord::from_fields(source_name, result.fields)
    }

    /// Turn a vision model's reply into a record.
    pub fn process_reply(&self, source_name: &str, reply: &ModelReply) -> ExtractedRecord {
        let text = match reply.text() {
            Ok(text) => text,
            Err(e) => {
                warn!("{}: {}", source_name, e);
                return ExtractedRecord::failed(source_name, e);
            }
        };

        match self.parser.parse_reply(text) {
            Ok(result) => ExtractedRecord::from_fields(source_name, result.fields),
            Err(e) => {
                warn!("{}: {}", source_name, e);
                ExtractedRecord::failed(source_name, DocumentError::MalformedReply)
            }
        }
    }

    /// Process documents one after another, one record per document in
    /// input order.
    pub fn process_batch(&self, documents: &[Document]) -> Vec<ExtractedRecord> {
        let records: Vec<ExtractedRecord> = documents.iter().map(|d| self.process(d)).collect();
        let failed = records.iter().filter(|r| !r.is_ok()).count();
        info!("Processed {} documents, {} failed", records.len(), failed);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::models::record::MISSING;
    use pretty_assertions::assert_eq;

    struct FixedOcr(std::result::Result<&'static str, &'static str>);

    impl OcrBackend for FixedOcr {
        fn name(&self) -> &str {
            "fixed"
        }

        fn ensure_available(&self) -> std::result::Result<(), OcrError> {
            Ok(())
        }

        fn recognize(&self, _document: &Document) -> std::result::Result<String, OcrError> {
            self.0
                .map(str::to_string)
                .map_err(|e| OcrError::Recognition(e.to_string()))
        }
    }

    fn pipeline(ocr: std::result::Result<&'static str, &'static str>) -> RibPipeline {
        RibPipeline::from_config(&RibexConfig::default(), Some(Box::new(FixedOcr(ocr))))
    }

    fn scan() -> Document {
        Document::new("scan.png", "image/png", vec![0; 8])
    }

    #[test]
    fn test_empty_ocr_text() {
        let record = pipeline(Ok("  \n\t ")).process(&scan());
        assert_eq!(record.error, Some(DocumentError::EmptyText));
        assert!(record.status().starts_with("ERREUR: OCR vide"));
        assert!(record.columns().iter().all(|c| *c == MISSING));
    }

    #[test]
    fn test_ocr_failure_reads_as_empty() {
        let record = pipeline(Err("engine crashed")).process(&scan());
        assert_eq!(record.error, Some(DocumentError::EmptyText));
    }

    #[test]
    fn test_image_through_ocr() {
        let record = pipeline(Ok("IBAN FR76 3000 6000 0112 3456 7890 189\nBIC : AGRIFRPP")).process(&scan());
        assert!(record.is_ok());
        assert_eq!(record.source_name, "scan.png");
        assert_eq!(record.bank_code.as_deref(), Some("30006"));
        assert_eq!(record.bic.as_deref(), Some("AGRIFRPP"));
    }

    #[test]
    fn test_text_document_skips_ocr() {
        let doc = Document::from_text("rib.txt", "IBAN : FR7630006000011234567890189");
        let record = pipeline(Err("must not run")).process(&doc);
        assert_eq!(record.rib_key.as_deref(), Some("89"));
    }

    #[test]
    fn test_unsupported_document() {
        let doc = Document::new("rib.docx", "application/msword", vec![1, 2, 3]);
        let record = pipeline(Ok("IBAN")).process(&doc);
        assert!(matches!(record.error, Some(DocumentError::Unreadable(_))));
    }

    #[test]
    fn test_no_backend_reads_empty() {
        let pipeline = RibPipeline::new(TextReader::new(PdfConfig::default()), RibParser::new());
        assert_eq!(pipeline.read_text(&scan()), Ok(String::new()));
    }

    #[test]
    fn test_batch_keeps_order() {
        let docs = vec![
            Document::from_text("a.txt", "IBAN FR7630006000011234567890189"),
            Document::from_text("b.txt", ""),
            Document::new("c.zip", "application/zip", vec![]),
        ];
        let records = pipeline(Ok("")).process_batch(&docs);
        let names: Vec<&str> = records.iter().map(|r| r.source_name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.zip"]);
        assert!(records[0].is_ok());
        assert_eq!(records[1].error, Some(DocumentError::EmptyText));
        assert!(matches!(records[2].error, Some(DocumentError::Unreadable(_))));
    }

    #[test]
    fn test_process_reply() {
        let pipeline = pipeline(Ok(""));
        let reply = ModelReply::from_raw("```json\n{\"iban\": \"FR7630006000011234567890189\"}\n```");
        let record = pipeline.process_reply("scan.pdf", &reply);
        assert_eq!(record.iban.as_deref(), Some("FR76 3000 6000 0112 3456 7890 189"));

        let record = pipeline.process_reply("scan.pdf", &ModelReply::from_raw("pas de JSON ici"));
        assert_eq!(record.error, Some(DocumentError::MalformedReply));
        assert_eq!(record.status(), "ERREUR: Réponse IA non JSON");

        let record = pipeline.process_reply("scan.pdf", &ModelReply::ApiError("quota".to_string()));
        assert!(matches!(record.error, Some(DocumentError::ModelApi(_))));
    }
}
