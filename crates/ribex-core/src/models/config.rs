//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Main configuration for ribex.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RibexConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Vision-model configuration.
    pub vision: VisionConfig,
}

/// Which OCR engine turns documents into text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackendKind {
    /// `pdftoppm` + `tesseract` command-line tools.
    #[default]
    Tesseract,
    /// Pure Rust ONNX engine (PaddleOCR models).
    Onnx,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Engine to use.
    pub backend: OcrBackendKind,

    /// Tesseract languages, tried in order until one succeeds.
    pub languages: Vec<String>,

    /// DPI for rendering PDF pages to images.
    pub dpi: u32,

    /// Upper bound for one document's OCR, in seconds.
    pub timeout_secs: u64,

    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` markers emitted by the ONNX recognizer.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackendKind::Tesseract,
            languages: vec!["fra".to_string(), "eng".to_string()],
            dpi: 300,
            timeout_secs: 120,
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Use the embedded text layer instead of OCR when it is long enough.
    pub prefer_embedded_text: bool,

    /// Minimum text length to consider the text layer usable.
    pub min_text_length: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            prefer_embedded_text: true,
            min_text_length: 50,
        }
    }
}

/// Field extraction configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Newline-separated list of known BICs. When set, BIC candidates must
    /// appear in it.
    pub bic_registry: Option<PathBuf>,

    /// Additional address words never accepted as a BIC.
    pub extra_address_words: Vec<String>,
}

/// Vision-model (Gemini REST) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Base URL of the model collection.
    pub endpoint: String,

    /// Model name.
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Upper bound for one request, in seconds.
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

impl RibexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl OcrConfig {
    /// Full path of a model file in the model directory.
    pub fn model_path(&self, file_name: &str) -> PathBuf {
        self.model_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RibexConfig =
            serde_json::from_str(r#"{"ocr": {"dpi": 200}, "vision": {"model": "other"}}"#).unwrap();
        assert_eq!(config.ocr.dpi, 200);
        assert_eq!(config.ocr.languages, vec!["fra", "eng"]);
        assert_eq!(config.ocr.backend, OcrBackendKind::Tesseract);
        assert_eq!(config.vision.model, "other");
        assert_eq!(config.vision.api_key_env, "GEMINI_API_KEY");
        assert!(config.pdf.prefer_embedded_text);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join(format!("ribex-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let mut config = RibexConfig::default();
        config.ocr.backend = OcrBackendKind::Onnx;
        config.extraction.extra_address_words = vec!["TOULOUSE".to_string()];
        config.save(&path).unwrap();

        let loaded = RibexConfig::from_file(&path).unwrap();
        assert_eq!(loaded.ocr.backend, OcrBackendKind::Onnx);
        assert_eq!(loaded.extraction.extra_address_words, vec!["TOULOUSE"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
