//! Input documents handed to the pipeline.

use std::path::Path;

/// Broad kind of an input document, which decides how text is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// PDF file (text layer or scanned pages).
    Pdf,
    /// Raster image (scan or photo).
    Image,
    /// Text already produced by an external OCR.
    Text,
    /// Anything else.
    Unsupported,
}

impl DocumentKind {
    /// Classify a MIME type.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        match mime.as_str() {
            "application/pdf" => DocumentKind::Pdf,
            m if m.starts_with("image/") => DocumentKind::Image,
            m if m.starts_with("text/") => DocumentKind::Text,
            _ => DocumentKind::Unsupported,
        }
    }
}

/// An in-memory input document with its declared MIME type.
#[derive(Debug, Clone)]
pub struct Document {
    /// Display name (usually the file name).
    pub name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl Document {
    /// Create a document from its parts.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Create a text document from already-recognized text.
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, "text/plain", text.as_bytes().to_vec())
    }

    /// Read a file from disk, guessing the MIME type from its extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(mime_for_extension)
            .unwrap_or("application/octet-stream");
        Ok(Self::new(name, mime, bytes))
    }

    /// Kind of this document.
    ///
    /// The declared MIME type wins; an unknown or generic MIME type falls
    /// back to the file name's extension.
    pub fn kind(&self) -> DocumentKind {
        match DocumentKind::from_mime(&self.mime_type) {
            DocumentKind::Unsupported => Path::new(&self.name)
                .extension()
                .and_then(|e| e.to_str())
                .and_then(mime_for_extension)
                .map(DocumentKind::from_mime)
                .unwrap_or(DocumentKind::Unsupported),
            kind => kind,
        }
    }

    /// Lower-case file extension matching the document kind, for scratch files.
    pub fn scratch_extension(&self) -> &'static str {
        match self.kind() {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Text => "txt",
            DocumentKind::Image => match self.mime_type.to_ascii_lowercase().as_str() {
                "image/jpeg" | "image/jpg" => "jpg",
                "image/tiff" => "tif",
                "image/bmp" => "bmp",
                "image/webp" => "webp",
                _ => "png",
            },
            DocumentKind::Unsupported => "bin",
        }
    }
}

/// MIME type for a supported file extension.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "tif" | "tiff" => Some("image/tiff"),
        "bmp" => Some("image/bmp"),
        "webp" => Some("image/webp"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_mime() {
        assert_eq!(DocumentKind::from_mime("application/pdf"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_mime("IMAGE/PNG"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_mime("text/plain"), DocumentKind::Text);
        assert_eq!(DocumentKind::from_mime("application/zip"), DocumentKind::Unsupported);
    }

    #[test]
    fn test_kind_falls_back_to_extension() {
        let doc = Document::new("rib.PDF", "application/octet-stream", vec![]);
        assert_eq!(doc.kind(), DocumentKind::Pdf);

        let doc = Document::new("notes.docx", "application/octet-stream", vec![]);
        assert_eq!(doc.kind(), DocumentKind::Unsupported);
    }

    #[test]
    fn test_scratch_extension() {
        assert_eq!(Document::new("a", "image/jpeg", vec![]).scratch_extension(), "jpg");
        assert_eq!(Document::from_text("a", "x").scratch_extension(), "txt");
    }
}
