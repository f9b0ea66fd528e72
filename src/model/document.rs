//! Document-level types and the document model seam.

use super::Page;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Read access to a paginated document.
///
/// The extraction engine only talks to documents through this trait, so a
/// caller can plug in any backend that exposes spans, images and geometry.
pub trait DocumentModel {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Page by 0-based index.
    fn page(&self, index: usize) -> Result<&Page>;

    /// Document metadata.
    fn metadata(&self) -> &Metadata;

    /// Source file stem, if the document came from a file.
    fn source_name(&self) -> Option<&str>;
}

/// An in-memory document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Document metadata
    pub metadata: Metadata,

    /// Pages in order
    pub pages: Vec<Page>,

    /// Path the document was loaded from
    pub source_path: Option<PathBuf>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page, renumbering it to its position.
    pub fn add_page(&mut self, mut page: Page) {
        page.index = self.pages.len();
        self.pages.push(page);
        self.metadata.page_count = self.pages.len();
    }

    /// Builder variant of [`Document::add_page`].
    pub fn with_page(mut self, page: Page) -> Self {
        self.add_page(page);
        self
    }

    /// Set the source path.
    pub fn with_source_path(mut self, path: impl AsRef<Path>) -> Self {
        self.source_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the metadata title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = Some(title.into());
        self
    }

    /// Set the metadata subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.metadata.subject = Some(subject.into());
        self
    }

    /// Total number of embedded images across pages.
    pub fn image_count(&self) -> usize {
        self.pages.iter().map(|p| p.images.len()).sum()
    }

    /// Check if the document has any pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl DocumentModel for Document {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<&Page> {
        self.pages
            .get(index)
            .ok_or(Error::PageOutOfRange(index, self.pages.len()))
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn source_name(&self) -> Option<&str> {
        self.source_path
            .as_deref()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
    }
}

/// Document metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title
    pub title: Option<String>,

    /// Document subject
    pub subject: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// PDF version (e.g., "1.7")
    #[serde(default)]
    pub pdf_version: String,

    /// Total number of pages
    #[serde(default)]
    pub page_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_page_renumbers() {
        let doc = Document::new()
            .with_page(Page::letter(7))
            .with_page(Page::letter(7));
        assert_eq!(doc.pages[0].index, 0);
        assert_eq!(doc.pages[1].index, 1);
        assert_eq!(doc.metadata.page_count, 2);
    }

    #[test]
    fn test_page_out_of_range() {
        let doc = Document::new().with_page(Page::letter(0));
        assert!(doc.page(0).is_ok());
        assert!(matches!(doc.page(3), Err(Error::PageOutOfRange(3, 1))));
    }

    #[test]
    fn test_source_name_is_stem() {
        let doc = Document::new().with_source_path("/tmp/PROCSG02_rev4.pdf");
        assert_eq!(doc.source_name(), Some("PROCSG02_rev4"));
        assert_eq!(Document::new().source_name(), None);
    }
}
