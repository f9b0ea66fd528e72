//! PDF loader: lopdf document to the in-memory model.

use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};
use rayon::prelude::*;

use super::content::{get_number, resolve_dict, ContentInterpreter};
use super::detect::{detect_version_from_bytes, detect_version_from_path};
use super::images::decode_image;
use super::options::{ErrorMode, LoadOptions};
use crate::error::{Error, Result};
use crate::model::{BBox, Document, EmbeddedImage, Metadata, Page};

/// Letter size, used when a page has no usable MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Loads PDF files into a [`Document`].
pub struct PdfLoader {
    doc: LopdfDocument,
    options: LoadOptions,
    version: String,
    source_path: Option<PathBuf>,
}

impl PdfLoader {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, LoadOptions::default())
    }

    /// Open a PDF file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let version = detect_version_from_path(path)?;
        let doc = LopdfDocument::load(path)?;

        Ok(Self {
            doc,
            options,
            version,
            source_path: Some(path.to_path_buf()),
        })
    }

    /// Load a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, LoadOptions::default())
    }

    /// Load a PDF from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: LoadOptions) -> Result<Self> {
        let version = detect_version_from_bytes(data)?;
        let doc = LopdfDocument::load_mem(data)?;

        Ok(Self {
            doc,
            options,
            version,
            source_path: None,
        })
    }

    /// Get the number of pages.
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Get the PDF version from the header.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Build the in-memory document.
    pub fn load(&self) -> Result<Document> {
        let selected: Vec<(u32, ObjectId)> = self
            .doc
            .get_pages()
            .into_iter()
            .filter(|(num, _)| self.options.pages.includes(*num))
            .collect();

        let results: Vec<Result<Option<Page>>> = if self.options.parallel {
            selected
                .par_iter()
                .map(|&(num, id)| self.load_page_checked(num, id))
                .collect()
        } else {
            selected
                .iter()
                .map(|&(num, id)| self.load_page_checked(num, id))
                .collect()
        };

        let mut document = Document::new();
        document.metadata = self.extract_metadata();
        document.source_path = self.source_path.clone();

        for page in results {
            if let Some(page) = page? {
                document.add_page(page);
            }
        }

        log::debug!(
            "Loaded {} pages, {} images",
            document.pages.len(),
            document.image_count()
        );
        Ok(document)
    }

    /// Load one page, applying the error mode.
    fn load_page_checked(&self, page_num: u32, page_id: ObjectId) -> Result<Option<Page>> {
        match self.load_page(page_num, page_id) {
            Ok(page) => Ok(Some(page)),
            Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                log::warn!("Skipping page {}: {}", page_num, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn load_page(&self, page_num: u32, page_id: ObjectId) -> Result<Page> {
        let index = page_num.saturating_sub(1) as usize;
        let [x0, y0, x1, y1] = self.media_box(page_id);
        let mut page = Page::new(index, x1 - x0, y1 - y0);

        let fonts = self.doc.get_page_fonts(page_id)?;
        let xobjects = self.page_xobjects(page_id);
        let content = self.doc.get_page_content(page_id)?;

        let interpreter = ContentInterpreter::new(&self.doc, fonts, x0, y1);
        let found = interpreter.run(&content, xobjects)?;
        page.spans = found.spans;

        if !self.options.extract_images {
            return Ok(page);
        }

        for placement in found.placements {
            match self.load_image(placement.id, index, placement.bbox) {
                Ok(image) => page.add_image(image),
                Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                    log::warn!("Skipping image on page {}: {}", page_num, e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(page)
    }

    fn load_image(&self, id: ObjectId, page: usize, bbox: BBox) -> Result<EmbeddedImage> {
        let stream = self
            .doc
            .get_object(id)
            .and_then(Object::as_stream)
            .map_err(|e| Error::CorruptImage {
                page,
                reason: e.to_string(),
            })?;

        let decoded = decode_image(&self.doc, stream, page)?;
        let mut image = EmbeddedImage::new(decoded.data, decoded.format, bbox);
        image.pixel_width = decoded.width;
        image.pixel_height = decoded.height;
        Ok(image)
    }

    /// MediaBox `[x0 y0 x1 y1]`, inherited through the page tree.
    fn media_box(&self, page_id: ObjectId) -> [f32; 4] {
        self.inherited(page_id, b"MediaBox")
            .and_then(|obj| match obj {
                Object::Reference(r) => self.doc.get_object(*r).ok(),
                other => Some(other),
            })
            .and_then(|obj| obj.as_array().ok())
            .filter(|arr| arr.len() >= 4)
            .and_then(|arr| {
                let v: Vec<f32> = arr[..4].iter().map(get_number).collect::<Option<_>>()?;
                Some([v[0].min(v[2]), v[1].min(v[3]), v[0].max(v[2]), v[1].max(v[3])])
            })
            .unwrap_or(DEFAULT_MEDIA_BOX)
    }

    /// XObject resources of a page, inherited through the page tree.
    fn page_xobjects(&self, page_id: ObjectId) -> Option<&Dictionary> {
        let resources = self.inherited(page_id, b"Resources")?;
        let resources = resolve_dict(&self.doc, resources)?;
        resolve_dict(&self.doc, resources.get(b"XObject").ok()?)
    }

    /// Look up a page attribute, walking `Parent` links.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut node = self.doc.get_dictionary(page_id).ok()?;
        // Page trees are shallow; the bound guards against cycles.
        for _ in 0..32 {
            if let Ok(value) = node.get(key) {
                return Some(value);
            }
            let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
            node = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    /// Extract document metadata.
    fn extract_metadata(&self) -> Metadata {
        let mut metadata = Metadata {
            pdf_version: self.version.clone(),
            page_count: self.page_count(),
            ..Metadata::default()
        };

        let info = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|info| resolve_dict(&self.doc, info));

        if let Some(info) = info {
            metadata.title = get_string_from_dict(info, b"Title");
            metadata.subject = get_string_from_dict(info, b"Subject");
            metadata.author = get_string_from_dict(info, b"Author");
        }

        metadata
    }
}

/// Helper to get a string from a PDF dictionary.
fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let value = match dict.get(key).ok()? {
        Object::String(bytes, _) => {
            if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
                let utf16: Vec<u16> = bytes[2..]
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&utf16).ok()?
            } else {
                // Latin-1
                bytes.iter().map(|&b| b as char).collect()
            }
        }
        Object::Name(bytes) => String::from_utf8(bytes.clone()).ok()?,
        _ => return None,
    };

    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_get_string_from_dict() {
        let dict = dictionary! {
            "Title" => Object::String(vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69], lopdf::StringFormat::Literal),
            "Subject" => Object::String(b"Caf\xe9".to_vec(), lopdf::StringFormat::Literal),
            "Author" => Object::String(b"   ".to_vec(), lopdf::StringFormat::Literal),
        };
        assert_eq!(get_string_from_dict(&dict, b"Title").as_deref(), Some("Hi"));
        assert_eq!(get_string_from_dict(&dict, b"Subject").as_deref(), Some("Café"));
        assert_eq!(get_string_from_dict(&dict, b"Author"), None);
        assert_eq!(get_string_from_dict(&dict, b"Missing"), None);
    }

    #[test]
    fn test_rejects_non_pdf_bytes() {
        assert!(matches!(
            PdfLoader::from_bytes(b"GIF89a not a pdf"),
            Err(Error::UnknownFormat)
        ));
    }
}
