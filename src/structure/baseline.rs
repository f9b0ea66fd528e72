//! Baseline heading detection from numeral/title span pairs.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::config::SectionDetectorConfig;
use crate::error::{Error, Result};
use crate::model::{sort_and_dedup, DocumentModel, Page, Section, TextSpan};

/// Vertical distance under which two sections with the same number collapse.
pub const DEDUP_TOLERANCE: f32 = 10.0;

/// Scans span pairs for `<numeral> <title>` headings.
///
/// A pair matches when the first span is a bare dotted numeral, the second is
/// a plausible title, both sizes fall in the configured interval and, when
/// required, both spans are bold.
#[derive(Debug, Clone)]
pub struct SectionDetector {
    config: SectionDetectorConfig,
    number_re: Regex,
    title_re: Regex,
}

impl SectionDetector {
    /// Create a detector, compiling the configured numeral grammar.
    pub fn new(config: SectionDetectorConfig) -> Result<Self> {
        let number_re = Regex::new(&config.number_pattern)
            .map_err(|e| Error::Config(format!("invalid number_pattern: {e}")))?;

        Ok(Self {
            config,
            number_re,
            title_re: Regex::new(r"\p{L}{3,}").expect("valid regex"),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &SectionDetectorConfig {
        &self.config
    }

    /// A copy of this detector running with another configuration.
    ///
    /// The numeral grammar is kept; only thresholds change.
    pub fn with_thresholds(&self, config: SectionDetectorConfig) -> Self {
        Self {
            config: SectionDetectorConfig {
                number_pattern: self.config.number_pattern.clone(),
                ..config
            },
            number_re: self.number_re.clone(),
            title_re: self.title_re.clone(),
        }
    }

    /// Detect sections on every page, sorted by (page, position).
    pub fn detect_sections<D: DocumentModel + ?Sized>(&self, doc: &D) -> Result<Vec<Section>> {
        let mut sections = Vec::new();
        for index in 0..doc.page_count() {
            sections.extend(self.detect_page_sections(doc.page(index)?));
        }

        let sections = sort_and_dedup(sections, DEDUP_TOLERANCE);
        log::debug!("Baseline detector found {} sections", sections.len());
        Ok(sections)
    }

    /// Detect sections on a single page, in span order.
    pub fn detect_page_sections(&self, page: &Page) -> Vec<Section> {
        let spans = &page.spans;
        let mut sections = Vec::new();
        let mut i = 0;

        while i + 1 < spans.len() {
            let (number, title) = (&spans[i], &spans[i + 1]);
            if self.is_section_pair(number, title) {
                let section = Section::new(
                    number.trimmed(),
                    title.trimmed().nfc().collect::<String>(),
                    page.index,
                    number.bbox.y0,
                )
                .with_x(number.bbox.x0)
                .with_font(number.font_size, number.bold && title.bold);

                log::debug!(
                    "Section {} '{}' on page {}",
                    section.number,
                    section.title,
                    section.page
                );
                sections.push(section);
                // The title span cannot start another pair.
                i += 2;
            } else {
                i += 1;
            }
        }

        sections
    }

    /// Whether two consecutive spans form a heading.
    pub fn is_section_pair(&self, number: &TextSpan, title: &TextSpan) -> bool {
        let (Some(number_size), Some(title_size)) = (number.font_size, title.font_size) else {
            return false;
        };

        let title_text = title.trimmed();

        self.number_re.is_match(number.trimmed())
            && title_text.chars().count() >= self.config.title_min_length
            && self.title_re.is_match(title_text)
            && (!self.config.require_bold || (number.bold && title.bold))
            && self.config.accepts_size(number_size)
            && self.config.accepts_size(title_size)
    }
}

impl Default for SectionDetector {
    fn default() -> Self {
        Self {
            config: SectionDetectorConfig::default(),
            number_re: Regex::new(r"^\d+(\.\d+)*$").expect("valid regex"),
            title_re: Regex::new(r"\p{L}{3,}").expect("valid regex"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, Document};

    fn heading(text: &str, y: f32) -> TextSpan {
        TextSpan::new(text, 14.0, "Helvetica-Bold", BBox::new(72.0, y, 120.0, y + 14.0))
    }

    fn body(text: &str, y: f32) -> TextSpan {
        TextSpan::new(text, 10.0, "Helvetica", BBox::new(72.0, y, 400.0, y + 10.0))
    }

    #[test]
    fn test_detects_pairs() {
        let page = Page::letter(0)
            .with_span(heading("1.1", 100.0))
            .with_span(heading("Introduction", 100.0))
            .with_span(body("Some body text here.", 130.0))
            .with_span(heading("1.2", 300.0))
            .with_span(heading("Installation", 300.0));

        let sections = SectionDetector::default().detect_page_sections(&page);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].number, "1.1");
        assert_eq!(sections[0].title, "Introduction");
        assert_eq!(sections[0].position, 100.0);
        assert_eq!(sections[1].number, "1.2");
    }

    #[test]
    fn test_title_span_is_not_reused() {
        // "2" / "2.1" / "Wiring" must yield only one pair.
        let page = Page::letter(0)
            .with_span(heading("2", 100.0))
            .with_span(heading("2.1", 100.0))
            .with_span(heading("Wiring", 100.0));
        let sections = SectionDetector::default().detect_page_sections(&page);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].number, "2.1");
    }

    #[test]
    fn test_rejects_non_bold_and_out_of_range() {
        let detector = SectionDetector::default();
        assert!(!detector.is_section_pair(&body("1.1", 0.0), &body("Introduction", 0.0)));

        let big = TextSpan::new("Introduction", 24.0, "Helvetica-Bold", BBox::default());
        assert!(!detector.is_section_pair(&heading("1.1", 0.0), &big));
    }

    #[test]
    fn test_rejects_weak_titles() {
        let detector = SectionDetector::default();
        assert!(!detector.is_section_pair(&heading("1.1", 0.0), &heading("Abc", 0.0)));
        assert!(!detector.is_section_pair(&heading("1.1", 0.0), &heading("12 34 56", 0.0)));
        assert!(!detector.is_section_pair(&heading("1.a", 0.0), &heading("Introduction", 0.0)));
    }

    #[test]
    fn test_missing_font_metadata_skips_span() {
        let detector = SectionDetector::default();
        let no_font = TextSpan::plain("1.1", BBox::default());
        assert!(!detector.is_section_pair(&no_font, &heading("Introduction", 0.0)));

        let page = Page::letter(0)
            .with_span(no_font)
            .with_span(heading("1.2", 50.0))
            .with_span(heading("Scope of work", 50.0));
        let sections = detector.detect_page_sections(&page);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].number, "1.2");
    }

    #[test]
    fn test_document_sections_sorted() {
        let doc = Document::new()
            .with_page(
                Page::letter(0)
                    .with_span(heading("1.2", 400.0))
                    .with_span(heading("Later heading", 400.0))
                    .with_span(heading("1.1", 100.0))
                    .with_span(heading("Earlier heading", 100.0)),
            )
            .with_page(
                Page::letter(1)
                    .with_span(heading("2", 50.0))
                    .with_span(heading("Next chapter", 50.0)),
            );

        let sections = SectionDetector::default().detect_sections(&doc).unwrap();
        let numbers: Vec<&str> = sections.iter().map(|s| s.number.as_str()).collect();
        assert_eq!(numbers, vec!["1.1", "1.2", "2"]);
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let config = SectionDetectorConfig {
            number_pattern: "(".to_string(),
            ..SectionDetectorConfig::default()
        };
        assert!(matches!(SectionDetector::new(config), Err(Error::Config(_))));
    }
}
