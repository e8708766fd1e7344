//! Per-document work shared by `process` and `batch`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, warn};

use ribex_core::models::config::RibexConfig;
use ribex_core::models::document::mime_for_extension;
use ribex_core::{
    create_backend, Document, DocumentError, DocumentKind, ExtractedRecord, RibPipeline,
};

use crate::vision::GeminiClient;

/// Whether a file needs OCR (or a vision model) to yield text.
pub fn needs_ocr(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(mime_for_extension)
        .map(|mime| DocumentKind::from_mime(mime) != DocumentKind::Text)
        .unwrap_or(true)
}

/// Turns documents into records, one at a time or concurrently.
///
/// Every call yields a record; failures are carried on the record.
pub struct Worker {
    pipeline: Arc<RibPipeline>,
    vision: Option<GeminiClient>,
    ocr_timeout: Duration,
    vision_timeout: Duration,
}

impl Worker {
    /// Set up OCR or the vision client.
    ///
    /// Fails when the OCR backend cannot run or the vision API key is
    /// missing, before any document is touched. OCR is only set up when
    /// some input is not already text.
    pub fn new(config: &RibexConfig, use_vision: bool, needs_ocr: bool) -> anyhow::Result<Self> {
        let (backend, vision) = if use_vision {
            (None, Some(GeminiClient::from_config(&config.vision)?))
        } else if !needs_ocr {
            debug!("Text inputs only, OCR not needed");
            (None, None)
        } else {
            let backend = create_backend(&config.ocr).context("Cannot set up OCR")?;
            backend.ensure_available().context("OCR backend unavailable")?;
            info!("Using {} OCR", backend.name());
            (Some(backend), None)
        };

        Ok(Self {
            pipeline: Arc::new(RibPipeline::from_config(config, backend)),
            vision,
            ocr_timeout: Duration::from_secs(config.ocr.timeout_secs),
            vision_timeout: Duration::from_secs(config.vision.timeout_secs),
        })
    }

    /// Read a file and process it.
    pub async fn run_path(&self, path: &Path) -> ExtractedRecord {
        match Document::from_path(path) {
            Ok(document) => self.run(document).await,
            Err(e) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                warn!("Cannot read {}: {}", path.display(), e);
                ExtractedRecord::failed(name, DocumentError::Unreadable(e.to_string()))
            }
        }
    }

    /// Process one document.
    pub async fn run(&self, document: Document) -> ExtractedRecord {
        match &self.vision {
            Some(client) if document.kind() != DocumentKind::Text => {
                self.run_vision(client, document).await
            }
            _ => self.run_text(document).await,
        }
    }

    async fn run_text(&self, document: Document) -> ExtractedRecord {
        let name = document.name.clone();
        let pipeline = Arc::clone(&self.pipeline);
        let task = tokio::task::spawn_blocking(move || pipeline.process(&document));

        match tokio::time::timeout(self.ocr_timeout, task).await {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                warn!("Processing task for {} failed: {}", name, e);
                ExtractedRecord::failed(name, DocumentError::Unreadable(e.to_string()))
            }
            Err(_) => {
                warn!("{} timed out after {:?}", name, self.ocr_timeout);
                ExtractedRecord::failed(
                    name,
                    DocumentError::Timeout {
                        seconds: self.ocr_timeout.as_secs(),
                    },
                )
            }
        }
    }

    async fn run_vision(&self, client: &GeminiClient, document: Document) -> ExtractedRecord {
        match tokio::time::timeout(self.vision_timeout, client.extract(&document)).await {
            Ok(reply) => {
                debug!("Vision reply received for {}", document.name);
                self.pipeline.process_reply(&document.name, &reply)
            }
            Err(_) => {
                warn!("Vision call for {} timed out", document.name);
                ExtractedRecord::failed(
                    &document.name,
                    DocumentError::Timeout {
                        seconds: self.vision_timeout.as_secs(),
                    },
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_ocr() {
        assert!(!needs_ocr(Path::new("ocr/rib.TXT")));
        assert!(needs_ocr(Path::new("rib.pdf")));
        assert!(needs_ocr(Path::new("scan.jpeg")));
    }

    #[tokio::test]
    async fn test_text_document_without_ocr() {
        let worker = Worker::new(&RibexConfig::default(), false, false).unwrap();

        let record = worker
            .run(Document::from_text("rib.txt", "IBAN FR76 3000 6000 0112 3456 7890 189"))
            .await;
        assert!(record.is_ok());
        assert_eq!(record.account_number.as_deref(), Some("12345678901"));

        let record = worker.run(Document::new("scan.png", "image/png", vec![0; 4])).await;
        assert_eq!(record.error, Some(DocumentError::EmptyText));
    }

    #[tokio::test]
    async fn test_unreadable_path() {
        let worker = Worker::new(&RibexConfig::default(), false, false).unwrap();
        let record = worker.run_path(Path::new("/nonexistent/ribex/rib.pdf")).await;
        assert_eq!(record.source_name, "rib.pdf");
        assert!(matches!(record.error, Some(DocumentError::Unreadable(_))));
    }
}
