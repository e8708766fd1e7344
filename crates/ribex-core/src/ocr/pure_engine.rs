//! Pure Rust OCR backend using `pure-onnx-ocr` and PaddleOCR models.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info, warn};

use crate::error::OcrError;
use crate::models::config::OcrConfig;
use crate::models::document::{Document, DocumentKind};
use crate::pdf::{PdfExtractor, PdfProcessor};

use super::{join_pages, OcrBackend, Result};

/// Height of a text row when ordering fragments, in pixels.
const ROW_HEIGHT: f64 = 20.0;

/// A recognized text fragment and its top-left corner.
#[derive(Debug, Clone)]
struct Fragment {
    text: String,
    x: f64,
    y: f64,
}

/// OCR backend backed by `pure-onnx-ocr` (no external runtime or binary).
pub struct OnnxBackend {
    engine: pure_onnx_ocr::engine::OcrEngine,
    model_dir: PathBuf,
    keep_unk: bool,
}

impl OnnxBackend {
    /// Load the detection, recognition and dictionary files named in the
    /// configuration from its model directory.
    pub fn from_config(config: &OcrConfig) -> Result<Self> {
        let det_path = config.model_path(&config.detection_model);
        let rec_path = config.model_path(&config.recognition_model);
        let dict_path = config.model_path(&config.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.is_file() {
                return Err(OcrError::Unavailable(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", config.model_dir.display());

        Ok(Self {
            engine,
            model_dir: config.model_dir.clone(),
            keep_unk: config.keep_unk,
        })
    }

    /// Directory the models were loaded from.
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Recognize one image, returning its lines in reading order.
    pub fn recognize_image(&self, image: &DynamicImage) -> Result<String> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let mut fragments: Vec<Fragment> = results
            .iter()
            .map(|r| {
                let (x, y) = top_left(&r.bounding_box);
                let text = if self.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                Fragment { text, x, y }
            })
            .collect();
        fragments.sort_by(reading_order);

        debug!(
            "Recognized {} fragments in {}x{} image in {}ms",
            fragments.len(),
            width,
            height,
            start.elapsed().as_millis()
        );

        Ok(fragments
            .into_iter()
            .map(|f| f.text)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn recognize_pdf(&self, bytes: &[u8]) -> Result<String> {
        let mut pdf = PdfExtractor::new();
        pdf.load(bytes)
            .map_err(|e| OcrError::UnsupportedDocument(e.to_string()))?;

        let mut pages = Vec::new();
        for page in 1..=pdf.page_count() {
            let images = match pdf.extract_images(page) {
                Ok(images) => images,
                Err(e) => {
                    warn!("Skipping page {}: {}", page, e);
                    continue;
                }
            };
            for image in &images {
                pages.push(self.recognize_image(image)?);
            }
        }

        if pages.is_empty() {
            return Err(OcrError::Rasterize(
                "no decodable page image in PDF".to_string(),
            ));
        }
        Ok(join_pages(pages))
    }
}

impl OcrBackend for OnnxBackend {
    fn name(&self) -> &str {
        "onnx"
    }

    fn ensure_available(&self) -> Result<()> {
        Ok(())
    }

    fn recognize(&self, document: &Document) -> Result<String> {
        match document.kind() {
            DocumentKind::Pdf => self.recognize_pdf(&document.bytes),
            DocumentKind::Image => {
                let image = image::load_from_memory(&document.bytes)
                    .map_err(|e| OcrError::UnsupportedDocument(e.to_string()))?;
                self.recognize_image(&image)
            }
            DocumentKind::Text | DocumentKind::Unsupported => Err(OcrError::UnsupportedDocument(
                format!("{} ({})", document.name, document.mime_type),
            )),
        }
    }
}

/// Smallest x and y over the polygon's exterior.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f64, f64) {
    polygon
        .exterior()
        .coords()
        .fold((f64::MAX, f64::MAX), |(x, y), c| (x.min(c.x), y.min(c.y)))
}

/// Row by row, then left to right.
fn reading_order(a: &Fragment, b: &Fragment) -> Ordering {
    let row_a = (a.y / ROW_HEIGHT) as i64;
    let row_b = (b.y / ROW_HEIGHT) as i64;
    row_a
        .cmp(&row_b)
        .then_with(|| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(text: &str, x: f64, y: f64) -> Fragment {
        Fragment {
            text: text.to_string(),
            x,
            y,
        }
    }

    #[test]
    fn test_reading_order() {
        let mut fragments = vec![
            fragment("AGRIFRPP", 120.0, 64.0),
            fragment("IBAN", 10.0, 22.0),
            fragment("BIC", 10.0, 61.0),
            fragment("FR76", 80.0, 25.0),
        ];
        fragments.sort_by(reading_order);
        let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["IBAN", "FR76", "BIC", "AGRIFRPP"]);
    }

    #[test]
    fn test_missing_models_unavailable() {
        let config = OcrConfig {
            model_dir: PathBuf::from("/nonexistent/ribex-models"),
            ..Default::default()
        };
        assert!(matches!(
            OnnxBackend::from_config(&config),
            Err(OcrError::Unavailable(_))
        ));
    }
}
