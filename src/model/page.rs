//! Page-level types.

use super::{BBox, EmbeddedImage};
use serde::{Deserialize, Serialize};

/// A run of text sharing one font, as exposed by the document model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    /// The text content
    pub text: String,

    /// Font size in points; `None` when the source carried no font metadata
    pub font_size: Option<f32>,

    /// Font name (e.g., "Helvetica-Bold")
    #[serde(default)]
    pub font_name: String,

    /// Whether the font is bold
    #[serde(default)]
    pub bold: bool,

    /// Whether the font is italic
    #[serde(default)]
    pub italic: bool,

    /// Bounding box on the page
    pub bbox: BBox,
}

impl TextSpan {
    /// Create a span, inferring bold/italic from the font name.
    pub fn new(text: impl Into<String>, font_size: f32, font_name: impl Into<String>, bbox: BBox) -> Self {
        let font_name = font_name.into();
        let lower = font_name.to_lowercase();
        let bold = lower.contains("bold") || lower.contains("black") || lower.contains("heavy");
        let italic = lower.contains("italic") || lower.contains("oblique");

        Self {
            text: text.into(),
            font_size: Some(font_size),
            font_name,
            bold,
            italic,
            bbox,
        }
    }

    /// Create a span with no font metadata.
    pub fn plain(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            font_size: None,
            font_name: String::new(),
            bold: false,
            italic: false,
            bbox,
        }
    }

    /// Force the bold flag.
    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    /// Force the italic flag.
    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    /// Text with surrounding whitespace removed.
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }
}

/// A single page in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Page index (0-based)
    pub index: usize,

    /// Page width in points
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Text spans in content-stream order
    #[serde(default)]
    pub spans: Vec<TextSpan>,

    /// Embedded images in enumeration order
    #[serde(default)]
    pub images: Vec<EmbeddedImage>,
}

impl Page {
    /// Create an empty page with the given dimensions.
    pub fn new(index: usize, width: f32, height: f32) -> Self {
        Self {
            index,
            width,
            height,
            spans: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Create an empty Letter page (8.5 x 11 inches).
    pub fn letter(index: usize) -> Self {
        Self::new(index, 612.0, 792.0)
    }

    /// Create an empty A4 page.
    pub fn a4(index: usize) -> Self {
        Self::new(index, 595.0, 842.0)
    }

    /// Add a text span.
    pub fn add_span(&mut self, span: TextSpan) {
        self.spans.push(span);
    }

    /// Add an embedded image.
    pub fn add_image(&mut self, image: EmbeddedImage) {
        self.images.push(image);
    }

    /// Builder variant of [`Page::add_span`].
    pub fn with_span(mut self, span: TextSpan) -> Self {
        self.add_span(span);
        self
    }

    /// Builder variant of [`Page::add_image`].
    pub fn with_image(mut self, image: EmbeddedImage) -> Self {
        self.add_image(image);
        self
    }

    /// The full page rectangle.
    pub fn rect(&self) -> BBox {
        BBox::new(0.0, 0.0, self.width, self.height)
    }

    /// Page dimensions as (width, height).
    pub fn dimensions(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_font_flags() {
        let span = TextSpan::new("2.4", 14.0, "Arial-BoldMT", BBox::default());
        assert!(span.bold);
        assert!(!span.italic);

        let span = TextSpan::new("note", 10.0, "Times-Oblique", BBox::default());
        assert!(!span.bold);
        assert!(span.italic);
    }

    #[test]
    fn test_plain_span_has_no_font() {
        let span = TextSpan::plain("x", BBox::default());
        assert!(span.font_size.is_none());
    }

    #[test]
    fn test_page_builders() {
        let page = Page::letter(0).with_span(TextSpan::plain(" hi ", BBox::default()));
        assert_eq!(page.dimensions(), (612.0, 792.0));
        assert_eq!(page.spans[0].trimmed(), "hi");
        assert_eq!(page.rect().area(), 612.0 * 792.0);
    }
}
