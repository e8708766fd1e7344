//! OCR through the `pdftoppm` and `tesseract` command-line tools.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, trace, warn};

use crate::error::OcrError;
use crate::models::config::OcrConfig;
use crate::models::document::{Document, DocumentKind};

use super::{join_pages, OcrBackend, Result};

/// Prefix of the page images written by `pdftoppm`.
const PAGE_PREFIX: &str = "page";

/// Tesseract CLI backend.
///
/// PDFs are rendered to PNG pages with `pdftoppm`, then every page goes
/// through `tesseract`, trying each configured language until one succeeds.
#[derive(Debug, Clone)]
pub struct TesseractBackend {
    languages: Vec<String>,
    dpi: u32,
    tesseract_bin: String,
    pdftoppm_bin: String,
}

impl TesseractBackend {
    /// Create a backend from the OCR configuration.
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            languages: config.languages.clone(),
            dpi: config.dpi,
            tesseract_bin: "tesseract".to_string(),
            pdftoppm_bin: "pdftoppm".to_string(),
        }
    }

    /// Use other executables for `tesseract` and `pdftoppm`.
    pub fn with_binaries(mut self, tesseract: impl Into<String>, pdftoppm: impl Into<String>) -> Self {
        self.tesseract_bin = tesseract.into();
        self.pdftoppm_bin = pdftoppm.into();
        self
    }

    fn locate(binary: &str) -> Result<PathBuf> {
        which::which(binary)
            .map_err(|e| OcrError::Unavailable(format!("{} not found on PATH: {}", binary, e)))
    }

    /// Render every PDF page to a PNG file in `dir`, in page order.
    fn rasterize(&self, pdftoppm: &Path, input: &Path, dir: &Path) -> Result<Vec<PathBuf>> {
        let output = Command::new(pdftoppm)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(input)
            .arg(dir.join(PAGE_PREFIX))
            .output()?;

        if !output.status.success() {
            return Err(OcrError::Rasterize(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let mut pages: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(PAGE_PREFIX) && n.ends_with(".png"))
                    .unwrap_or(false)
            })
            .collect();
        // pdftoppm zero-pads page numbers to a fixed width per document
        pages.sort();

        debug!("Rendered {} pages at {} dpi", pages.len(), self.dpi);
        Ok(pages)
    }

    /// Recognize one image, trying each language in order.
    fn recognize_image(&self, tesseract: &Path, image: &Path) -> Result<String> {
        let mut last_error = "no OCR language configured".to_string();

        for lang in &self.languages {
            let output = Command::new(tesseract)
                .arg(image)
                .arg("stdout")
                .arg("-l")
                .arg(lang)
                .output()?;

            if output.status.success() {
                trace!("tesseract succeeded on {} with '{}'", image.display(), lang);
                return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
            }

            last_error = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!("tesseract failed with '{}': {}", lang, last_error);
        }

        Err(OcrError::Recognition(last_error))
    }
}

impl OcrBackend for TesseractBackend {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn ensure_available(&self) -> Result<()> {
        Self::locate(&self.tesseract_bin)?;
        Self::locate(&self.pdftoppm_bin)?;
        Ok(())
    }

    fn recognize(&self, document: &Document) -> Result<String> {
        let kind = document.kind();
        if !matches!(kind, DocumentKind::Pdf | DocumentKind::Image) {
            return Err(OcrError::UnsupportedDocument(format!(
                "{} ({})",
                document.name, document.mime_type
            )));
        }

        let tesseract = Self::locate(&self.tesseract_bin)?;
        let dir = tempfile::tempdir()?;
        let input = dir
            .path()
            .join(format!("input.{}", document.scratch_extension()));
        std::fs::write(&input, &document.bytes)?;

        if kind == DocumentKind::Image {
            return self.recognize_image(&tesseract, &input);
        }

        let pdftoppm = Self::locate(&self.pdftoppm_bin)?;
        let pages = self.rasterize(&pdftoppm, &input, dir.path())?;
        if pages.is_empty() {
            return Err(OcrError::Rasterize("pdftoppm produced no pages".to_string()));
        }

        let mut texts = Vec::with_capacity(pages.len());
        let mut last_error = None;
        for page in &pages {
            match self.recognize_image(&tesseract, page) {
                Ok(text) => texts.push(text),
                Err(e) => {
                    warn!("OCR failed on {}: {}", page.display(), e);
                    last_error = Some(e);
                }
            }
        }

        match (texts.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(join_pages(texts)),
        }
    }
}
