//! Manual-name deduction.
//!
//! Each strategy proposes candidates in priority order; the first candidate
//! that passes the false-positive filter wins. When nothing passes, the
//! source file stem is used.

use regex::Regex;

use crate::model::DocumentModel;

/// Name used when the document has no source file name either.
pub const DEFAULT_MANUAL_NAME: &str = "MANUAL";

/// A source of manual-name candidates.
pub trait ManualNameStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Candidates in priority order.
    fn candidates(&self, doc: &dyn DocumentModel) -> Vec<String>;
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
}

fn first_captures(patterns: &[Regex], text: &str, out: &mut Vec<String>) {
    for re in patterns {
        if let Some(caps) = re.captures(text) {
            out.push(caps[1].to_string());
        }
    }
}

/// Codes printed in the page footer of the first pages.
pub struct FooterStrategy {
    patterns: Vec<Regex>,
    pages: usize,
    band: f32,
}

impl FooterStrategy {
    /// Scan the bottom 10% of the first three pages.
    pub fn new() -> Self {
        Self {
            patterns: compile(&[
                r"\b([A-Z]{2,}SG\d+)\b",
                r"\b([A-Z]{3,}\d+)\b",
                r"\b([A-Z]{2,}-[A-Z]{2,})\b",
                r"\b([A-Z]{2,}/[A-Z]{2,})\b",
            ]),
            pages: 3,
            band: 0.1,
        }
    }
}

impl Default for FooterStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualNameStrategy for FooterStrategy {
    fn name(&self) -> &'static str {
        "footer"
    }

    fn candidates(&self, doc: &dyn DocumentModel) -> Vec<String> {
        let mut out = Vec::new();
        for index in 0..doc.page_count().min(self.pages) {
            let Ok(page) = doc.page(index) else {
                continue;
            };
            let footer_top = page.height * (1.0 - self.band);
            for span in page.spans.iter().filter(|s| s.bbox.y0 >= footer_top) {
                first_captures(&self.patterns, span.trimmed(), &mut out);
            }
        }
        out
    }
}

/// Codes in the document title, then the subject.
pub struct MetadataStrategy {
    title_patterns: Vec<Regex>,
    subject_patterns: Vec<Regex>,
}

impl MetadataStrategy {
    /// Create the strategy.
    pub fn new() -> Self {
        Self {
            title_patterns: compile(&[
                r"\b([A-Z]{2,}SG\d+)\b",
                r"\b([A-Z]{3,}\d+)\b",
                r"\b([A-Z]{2,}-[A-Z]{2,})\b",
            ]),
            subject_patterns: compile(&[r"\b([A-Z]{2,}SG\d+)\b", r"\b([A-Z]{3,}\d+)\b"]),
        }
    }
}

impl Default for MetadataStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualNameStrategy for MetadataStrategy {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn candidates(&self, doc: &dyn DocumentModel) -> Vec<String> {
        let metadata = doc.metadata();
        let mut out = Vec::new();
        if let Some(title) = &metadata.title {
            first_captures(&self.title_patterns, title.trim(), &mut out);
        }
        if let Some(subject) = &metadata.subject {
            first_captures(&self.subject_patterns, subject.trim(), &mut out);
        }
        out
    }
}

/// Prefixes of the source file stem.
pub struct FilenameStrategy {
    patterns: Vec<Regex>,
}

impl FilenameStrategy {
    /// Create the strategy.
    pub fn new() -> Self {
        Self {
            patterns: compile(&[r"^([A-Z]+\d+)", r"^([A-Z]{2,})", r"^(\w+?)[-_]"]),
        }
    }
}

impl Default for FilenameStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualNameStrategy for FilenameStrategy {
    fn name(&self) -> &'static str {
        "filename"
    }

    fn candidates(&self, doc: &dyn DocumentModel) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(stem) = doc.source_name() {
            first_captures(&self.patterns, stem, &mut out);
        }
        out
    }
}

/// Rejects years, page/revision markers and bare numbers.
pub struct FalsePositiveFilter {
    rejects: Vec<Regex>,
}

impl FalsePositiveFilter {
    /// Create the filter.
    pub fn new() -> Self {
        Self {
            rejects: compile(&[
                r"^\d{4}$",
                r"^PAGE\d*$",
                r"^REV\d*$",
                r"^VER\d*$",
                r"^DOC\d*$",
                r"^\d+$",
            ]),
        }
    }

    /// Whether a candidate looks like a real manual code.
    pub fn accepts(&self, name: &str) -> bool {
        let len = name.chars().count();
        (3..=15).contains(&len)
            && name.chars().any(char::is_alphabetic)
            && !self.rejects.iter().any(|re| re.is_match(name))
    }
}

impl Default for FalsePositiveFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered strategies plus the filter.
pub struct ManualNameResolver {
    strategies: Vec<Box<dyn ManualNameStrategy>>,
    filter: FalsePositiveFilter,
}

impl ManualNameResolver {
    /// Footer, then metadata, then filename.
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(FooterStrategy::new()),
                Box::new(MetadataStrategy::new()),
                Box::new(FilenameStrategy::new()),
            ],
            filter: FalsePositiveFilter::new(),
        }
    }

    /// A resolver with a custom strategy list.
    pub fn with_strategies(strategies: Vec<Box<dyn ManualNameStrategy>>) -> Self {
        Self {
            strategies,
            filter: FalsePositiveFilter::new(),
        }
    }

    /// Deduce the manual name of a document.
    pub fn deduce(&self, doc: &dyn DocumentModel) -> String {
        for strategy in &self.strategies {
            if let Some(name) = strategy
                .candidates(doc)
                .into_iter()
                .find(|c| self.filter.accepts(c))
            {
                log::info!("Manual name '{}' from {}", name, strategy.name());
                return name;
            }
        }

        let fallback = match doc.source_name() {
            Some(stem) if !stem.is_empty() => stem.chars().take(10).collect::<String>().to_uppercase(),
            _ => DEFAULT_MANUAL_NAME.to_string(),
        };
        log::info!("Manual name fallback '{}'", fallback);
        fallback
    }
}

impl Default for ManualNameResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, Document, Page, TextSpan};

    fn footer_page(text: &str) -> Page {
        Page::letter(0)
            .with_span(TextSpan::new("PROCSG99 in body", 10.0, "Arial", BBox::new(72.0, 300.0, 300.0, 310.0)))
            .with_span(TextSpan::new(text, 8.0, "Arial", BBox::new(72.0, 760.0, 300.0, 768.0)))
    }

    #[test]
    fn test_filter() {
        let filter = FalsePositiveFilter::new();
        assert!(filter.accepts("PROCSG02"));
        assert!(filter.accepts("OMA-STC"));
        for rejected in ["2024", "PAGE12", "REV3", "VER", "DOC1", "123", "AB", "ABCDEFGHIJKLMNOP"] {
            assert!(!filter.accepts(rejected), "{rejected}");
        }
    }

    #[test]
    fn test_footer_wins() {
        let doc = Document::new()
            .with_page(footer_page("PAGE12 - PROCSG02 - 2024"))
            .with_title("Manual TITLE99")
            .with_source_path("/tmp/ABC12_manual.pdf");
        assert_eq!(ManualNameResolver::new().deduce(&doc), "PROCSG02");
    }

    #[test]
    fn test_footer_false_positive_skipped() {
        // "PAGE12" matches a footer pattern but is filtered out.
        let doc = Document::new()
            .with_page(footer_page("PAGE12"))
            .with_title("Operating manual STC0042");
        assert_eq!(ManualNameResolver::new().deduce(&doc), "STC0042");
    }

    #[test]
    fn test_filename_prefix() {
        let doc = Document::new()
            .with_page(Page::letter(0))
            .with_source_path("/manuals/OMA_pump_v2.pdf");
        assert_eq!(ManualNameResolver::new().deduce(&doc), "OMA");
    }

    #[test]
    fn test_stem_fallback() {
        let doc = Document::new()
            .with_page(Page::letter(0))
            .with_source_path("/manuals/xy.pdf");
        assert_eq!(ManualNameResolver::new().deduce(&doc), "XY");

        let doc = Document::new().with_page(Page::letter(0));
        assert_eq!(ManualNameResolver::new().deduce(&doc), DEFAULT_MANUAL_NAME);
    }
}
