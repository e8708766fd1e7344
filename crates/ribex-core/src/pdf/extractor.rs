//! PDF text and page-image extraction using lopdf and pdf-extract.

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{PdfProcessor, PdfType, Result};
use crate::error::PdfError;

/// Default minimum text layer length for [`PdfType::Text`].
const DEFAULT_MIN_TEXT_LENGTH: usize = 50;

/// PDF content extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
    min_text_length: usize,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
            min_text_length: DEFAULT_MIN_TEXT_LENGTH,
        }
    }

    /// Set the text layer length from which a PDF counts as text.
    pub fn with_min_text_length(mut self, min_text_length: usize) -> Self {
        self.min_text_length = min_text_length;
        self
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or_else(|| PdfError::Parse("no document loaded".to_string()))
    }

    fn page_has_images(&self, doc: &Document, page_id: ObjectId) -> bool {
        page_xobjects(doc, page_id)
            .iter()
            .any(|(_, obj)| is_image_stream(obj))
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Bank portals often emit PDFs encrypted with an empty user password
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn analyze(&self) -> PdfType {
        let Ok(doc) = self.document() else {
            return PdfType::Empty;
        };

        let text_len = self
            .extract_text()
            .map(|t| t.trim().chars().count())
            .unwrap_or(0);
        let has_text = text_len >= self.min_text_length;
        let has_images = doc
            .get_pages()
            .values()
            .any(|page_id| self.page_has_images(doc, *page_id));

        let pdf_type = match (has_text, has_images) {
            (true, false) => PdfType::Text,
            (false, true) => PdfType::Image,
            (true, true) => PdfType::Hybrid,
            (false, false) => PdfType::Empty,
        };

        debug!("PDF analysis: {} chars text, images={} -> {:?}", text_len, has_images, pdf_type);
        pdf_type
    }

    fn extract_text(&self) -> Result<String> {
        self.document()?;
        pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    fn extract_images(&self, page: u32) -> Result<Vec<DynamicImage>> {
        let doc = self.document()?;
        let pages = doc.get_pages();
        let page_id = pages.get(&page).ok_or(PdfError::InvalidPage(page))?;

        let images: Vec<DynamicImage> = page_xobjects(doc, *page_id)
            .iter()
            .filter_map(|(name, obj)| {
                let image = decode_image(doc, obj);
                if image.is_none() && is_image_stream(obj) {
                    trace!("Skipping undecodable image {} on page {}", name, page);
                }
                image
            })
            .collect();

        debug!("Extracted {} images from page {}", images.len(), page);
        Ok(images)
    }
}

/// Resources of a page, inherited from the page tree when absent on the page.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut node_id = page_id;
    // Bounded walk up the page tree; malformed files can loop.
    for _ in 0..32 {
        let Ok(Object::Dictionary(node)) = doc.get_object(node_id) else {
            return None;
        };
        if let Ok(resources) = node.get(b"Resources") {
            if let Ok((_, Object::Dictionary(dict))) = doc.dereference(resources) {
                return Some(dict.clone());
            }
        }
        match node.get(b"Parent") {
            Ok(Object::Reference(parent)) => node_id = *parent,
            _ => return None,
        }
    }
    None
}

/// XObjects referenced by a page, with their resource names.
fn page_xobjects(doc: &Document, page_id: ObjectId) -> Vec<(String, Object)> {
    let Some(resources) = page_resources(doc, page_id) else {
        return Vec::new();
    };
    let Ok(xobjects) = resources.get(b"XObject") else {
        return Vec::new();
    };
    let Ok((_, Object::Dictionary(xobjects))) = doc.dereference(xobjects) else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(name, reference)| {
            let (_, obj) = doc.dereference(reference).ok()?;
            Some((String::from_utf8_lossy(name).into_owned(), obj.clone()))
        })
        .collect()
}

fn is_image_stream(obj: &Object) -> bool {
    match obj {
        Object::Stream(stream) => stream
            .dict
            .get(b"Subtype")
            .and_then(|s| s.as_name())
            .map(|name| name == b"Image")
            .unwrap_or(false),
        _ => false,
    }
}

fn first_name<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a [u8]> {
    match obj {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(items) => items.first().and_then(|o| o.as_name().ok()),
        Object::Reference(id) => doc.get_object(*id).ok().and_then(|o| o.as_name().ok()),
        _ => None,
    }
}

/// Decode an image XObject: JPEG streams directly, raw 8-bit gray/RGB samples.
fn decode_image(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    if !is_image_stream(obj) {
        return None;
    }
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;

    match dict.get(b"Filter").ok().and_then(|f| first_name(doc, f)) {
        Some(b"DCTDecode") => {
            return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                .ok();
        }
        Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
            trace!("Unsupported image filter for {}x{} image", width, height);
            return None;
        }
        _ => {}
    }

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        return None;
    }

    let samples = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| first_name(doc, o))
        .unwrap_or(b"DeviceRGB");

    let pixels = (width as usize) * (height as usize);
    match color_space {
        b"DeviceGray" | b"G" if samples.len() >= pixels => {
            GrayImage::from_raw(width, height, samples[..pixels].to_vec()).map(DynamicImage::ImageLuma8)
        }
        b"DeviceRGB" | b"RGB" if samples.len() >= pixels * 3 => {
            RgbImage::from_raw(width, height, samples[..pixels * 3].to_vec())
                .map(DynamicImage::ImageRgb8)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn scanned_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 2,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0, 255, 255, 0],
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::new();
        assert!(extractor.document.is_none());
        assert_eq!(extractor.page_count(), 0);
        assert_eq!(extractor.analyze(), PdfType::Empty);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut extractor = PdfExtractor::new();
        assert!(matches!(extractor.load(b"not a pdf"), Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_inherited_page_image() {
        let mut extractor = PdfExtractor::new();
        extractor.load(&scanned_pdf()).unwrap();
        assert_eq!(extractor.page_count(), 1);

        let images = extractor.extract_images(1).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!((images[0].width(), images[0].height()), (2, 2));

        assert!(matches!(extractor.extract_images(2), Err(PdfError::InvalidPage(2))));
    }
}
