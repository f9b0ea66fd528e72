//! Adaptive section detection.
//!
//! The detector learns the typography of a document's headings from a broad
//! candidate sweep, tunes the baseline detector to it, and promotes candidates
//! that fit the learned pattern but were missed by the baseline grammar.
//!
//! Detection runs in four passes:
//!
//! 1. candidate sweep over every page
//! 2. pattern learning from the surviving candidates
//! 3. adaptation of a per-run copy of the baseline configuration
//! 4. baseline re-detection merged with pattern-matching candidates
//!
//! A failure in passes 1 to 3 is logged and the unadapted baseline is used.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use super::baseline::SectionDetector;
use super::config::{AdaptiveConfig, SectionDetectorConfig};
use super::rules::{apply_rules, pattern_score, CANDIDATE_RULES};
use crate::error::{Error, Result};
use crate::model::{sort_and_dedup, DocumentModel, Page, Section, SectionOrigin, TextSpan};

/// Words that make a span a heading candidate on their own.
const SECTION_KEYWORDS: &[&str] = &[
    "OBJECTIF", "DOMAINE", "INTRODUCTION", "CONTEXTE", "ANNEXE", "CONCLUSION", "RÉSUMÉ",
    "SOMMAIRE", "CHAPITRE", "SECTION", "PARTIE", "OBJECTIVE", "SCOPE", "BACKGROUND",
    "APPENDIX", "SUMMARY", "CHAPTER", "PART",
];

/// Keywords that also raise a candidate's confidence.
const STRONG_KEYWORDS: &[&str] = &["ANNEXE", "CONCLUSION", "OBJECTIF", "APPENDIX", "OBJECTIVE"];

/// Numbering style of a heading candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberingKind {
    /// "3. Title"
    Numeric,
    /// "3.2 Title"
    Hierarchical,
    /// "IV. Title"
    Roman,
    /// "B. Title"
    Alphabetic,
}

/// A span that might be a heading, with its initial confidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionCandidate {
    /// Candidate text (numeral and title joined when split across spans)
    pub text: String,
    /// Font size in points
    pub font_size: f32,
    /// Font name
    pub font_name: String,
    /// Bold flag
    pub bold: bool,
    /// Italic flag
    pub italic: bool,
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Page index
    pub page: usize,
    /// Initial confidence in [0, 1]
    pub confidence: f32,
    /// Detected numbering style
    pub numbering: Option<NumberingKind>,
    /// Leading dotted numeral, without trailing dot
    pub leading_number: Option<String>,
    /// Contains a confidence-raising keyword
    pub strong_keyword: bool,
}

/// Typography learned from a document's heading candidates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentPattern {
    /// Up to three most frequent heading font sizes
    pub font_sizes: Vec<f32>,
    /// Font names seen on candidates
    pub font_names: BTreeSet<String>,
    /// Some candidate was bold
    pub bold: bool,
    /// Some candidate was italic
    pub italic: bool,
    /// Share of bold candidates
    pub bold_ratio: f32,
    /// Numbering styles seen on candidates
    pub numbering_kinds: BTreeSet<NumberingKind>,
    /// Number of candidates the pattern was learned from
    pub sample_count: usize,
    /// Overall confidence in [0, 1]
    pub confidence: f32,
}

impl DocumentPattern {
    /// Whether the pattern was learned from at least one candidate.
    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }
}

/// Everything an adaptive detection run decided.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    /// Final sections, sorted and deduplicated
    pub sections: Vec<Section>,
    /// Learned pattern, if learning ran and succeeded
    pub pattern: Option<DocumentPattern>,
    /// Whether the baseline thresholds were adapted
    pub adapted: bool,
    /// Baseline configuration actually used
    pub effective_config: SectionDetectorConfig,
    /// Sections promoted from the learned pattern
    pub adaptive_sections: usize,
    /// Why learning was abandoned, if it was
    pub degraded: Option<String>,
}

/// Detector that adapts the baseline to each document.
#[derive(Debug, Clone)]
pub struct AdaptiveDetector {
    baseline: SectionDetector,
    config: AdaptiveConfig,
    numeral_only_re: Regex,
    leading_number_re: Regex,
    hierarchical_re: Regex,
    numeric_re: Regex,
    roman_re: Regex,
    alphabetic_re: Regex,
    capitalized_re: Regex,
}

/// Output of passes 1 to 3.
struct Learned {
    candidates: Vec<SectionCandidate>,
    pattern: DocumentPattern,
    adapted: Option<SectionDetectorConfig>,
}

impl AdaptiveDetector {
    /// Create a detector around a baseline configuration.
    pub fn new(baseline: SectionDetectorConfig, config: AdaptiveConfig) -> Result<Self> {
        Ok(Self {
            baseline: SectionDetector::new(baseline)?,
            config,
            numeral_only_re: Regex::new(r"^\d+(\.\d+)*\.?$").expect("valid regex"),
            leading_number_re: Regex::new(r"^(\d+(?:\.\d+)*)\.?(?:\s|$)").expect("valid regex"),
            hierarchical_re: Regex::new(r"^\d+\.\d+").expect("valid regex"),
            numeric_re: Regex::new(r"^\d+\.").expect("valid regex"),
            roman_re: Regex::new(r"^[IVX]+\.").expect("valid regex"),
            alphabetic_re: Regex::new(r"^[A-Z]\.").expect("valid regex"),
            capitalized_re: Regex::new(r"^\p{Lu}\p{Ll}+").expect("valid regex"),
        })
    }

    /// The unadapted baseline detector.
    pub fn baseline(&self) -> &SectionDetector {
        &self.baseline
    }

    /// The adaptive configuration.
    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    /// Detect sections, adapting to the document.
    pub fn detect_sections_adaptive<D: DocumentModel + ?Sized>(&self, doc: &D) -> Result<Vec<Section>> {
        Ok(self.detect_with_report(doc)?.sections)
    }

    /// Detect sections and report what was learned.
    ///
    /// Errors while learning are recovered; errors from the baseline pass
    /// (an unreadable page) propagate.
    pub fn detect_with_report<D: DocumentModel + ?Sized>(&self, doc: &D) -> Result<DetectionReport> {
        let (learned, degraded) = if self.config.adaptation_enabled {
            match self.learn(doc) {
                Ok(learned) => (Some(learned), None),
                Err(e) => {
                    log::warn!("Adaptive analysis failed, using baseline detector: {}", e);
                    (None, Some(e.to_string()))
                }
            }
        } else {
            (None, None)
        };

        let detector = match learned.as_ref().and_then(|l| l.adapted.clone()) {
            Some(config) => self.baseline.with_thresholds(config),
            None => self.baseline.clone(),
        };
        let mut sections = detector.detect_sections(doc)?;

        let mut adaptive_sections = 0;
        if let Some(learned) = &learned {
            if !learned.pattern.is_empty() {
                let extra = self.pattern_sections(&learned.candidates, &sections, &learned.pattern);
                adaptive_sections = extra.len();
                sections.extend(extra);
            }
        }

        let sections = sort_and_dedup(sections, self.config.position_tolerance);
        log::info!(
            "Adaptive detection found {} sections ({} from learned pattern)",
            sections.len(),
            adaptive_sections
        );

        Ok(DetectionReport {
            sections,
            adapted: learned.as_ref().is_some_and(|l| l.adapted.is_some()),
            pattern: learned.map(|l| l.pattern),
            effective_config: detector.config().clone(),
            adaptive_sections,
            degraded,
        })
    }

    /// Passes 1 to 3.
    fn learn<D: DocumentModel + ?Sized>(&self, doc: &D) -> Result<Learned> {
        let mut candidates = Vec::new();
        for index in 0..doc.page_count() {
            candidates.extend(self.page_candidates(doc.page(index)?));
        }

        let pattern = self.learn_pattern(&candidates)?;
        log::debug!(
            "Learned pattern: sizes {:?}, bold {}, kinds {:?}, confidence {:.2}",
            pattern.font_sizes,
            pattern.bold,
            pattern.numbering_kinds,
            pattern.confidence
        );

        let adapted = self.adapt(&pattern)?;
        Ok(Learned {
            candidates,
            pattern,
            adapted,
        })
    }

    /// Pass 1 for one page: candidates above the minimum confidence, best first.
    pub fn page_candidates(&self, page: &Page) -> Vec<SectionCandidate> {
        let spans = &page.spans;
        let mut candidates = Vec::new();
        let mut i = 0;

        while i < spans.len() {
            let span = &spans[i];
            i += 1;

            let Some(size) = span.font_size.filter(|s| s.is_finite()) else {
                continue;
            };

            let mut text = span.trimmed().nfc().collect::<String>();
            if self.numeral_only_re.is_match(&text) {
                // Numeral and title split across spans.
                if let Some(next) = spans.get(i).filter(|n| !n.trimmed().is_empty()) {
                    text = format!("{} {}", text, next.trimmed().nfc().collect::<String>());
                    i += 1;
                }
            }

            if !self.is_potential_section_text(&text) {
                continue;
            }

            let candidate = self.build_candidate(text, span, size, page.index);
            if candidate.confidence >= self.config.candidate_min_confidence {
                candidates.push(candidate);
            }
        }

        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        candidates.truncate(self.config.max_candidates_per_page);
        candidates
    }

    fn build_candidate(&self, text: String, span: &TextSpan, size: f32, page: usize) -> SectionCandidate {
        let upper = text.to_uppercase();
        let mut candidate = SectionCandidate {
            font_size: size,
            font_name: span.font_name.clone(),
            bold: span.bold,
            italic: span.italic,
            x: span.bbox.x0,
            y: span.bbox.y0,
            page,
            confidence: 0.0,
            numbering: self.numbering_kind(&text),
            leading_number: self
                .leading_number_re
                .captures(&text)
                .map(|c| c[1].to_string()),
            strong_keyword: STRONG_KEYWORDS.iter().any(|k| upper.contains(k)),
            text,
        };
        candidate.confidence = apply_rules(CANDIDATE_RULES, &candidate).min(1.0);
        candidate
    }

    fn numbering_kind(&self, text: &str) -> Option<NumberingKind> {
        if self.hierarchical_re.is_match(text) {
            Some(NumberingKind::Hierarchical)
        } else if self.numeric_re.is_match(text) {
            Some(NumberingKind::Numeric)
        } else if self.roman_re.is_match(text) {
            Some(NumberingKind::Roman)
        } else if self.alphabetic_re.is_match(text) {
            Some(NumberingKind::Alphabetic)
        } else {
            None
        }
    }

    fn is_potential_section_text(&self, text: &str) -> bool {
        let (min_len, max_len) = self.config.text_length_range;
        let len = text.chars().count();
        if len < min_len || len > max_len {
            return false;
        }

        if self.numbering_kind(text).is_some()
            || self.leading_number_re.is_match(text)
            || self.capitalized_re.is_match(text)
        {
            return true;
        }

        let upper = text.to_uppercase();
        SECTION_KEYWORDS.iter().any(|k| upper.contains(k))
    }

    /// Pass 2: aggregate candidates into a document pattern.
    pub fn learn_pattern(&self, candidates: &[SectionCandidate]) -> Result<DocumentPattern> {
        if candidates.is_empty() {
            return Ok(DocumentPattern::default());
        }

        // Sizes bucketed to 0.1pt.
        let bucket = |size: f32| (size * 10.0).round() as i32;

        let mut histogram: BTreeMap<i32, usize> = BTreeMap::new();
        for c in candidates
            .iter()
            .filter(|c| c.confidence > self.config.histogram_min_confidence)
        {
            *histogram.entry(bucket(c.font_size)).or_insert(0) += 1;
        }

        let mut ranked: Vec<(i32, usize)> = histogram.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let font_sizes: Vec<f32> = ranked.iter().take(3).map(|(k, _)| *k as f32 / 10.0).collect();

        let distinct_sizes: BTreeSet<i32> = candidates.iter().map(|c| bucket(c.font_size)).collect();
        let total = candidates.len() as f32;
        let bold_count = candidates.iter().filter(|c| c.bold).count();
        let bold_ratio = bold_count as f32 / total;
        let mean_confidence = candidates.iter().map(|c| c.confidence).sum::<f32>() / total;

        let confidence = if candidates.len() < self.config.min_samples {
            0.0
        } else {
            let size_consistency = if font_sizes.is_empty() {
                0.0
            } else {
                font_sizes.len() as f32 / distinct_sizes.len() as f32
            };
            (0.4 * size_consistency + 0.3 * bold_ratio + 0.3 * mean_confidence).min(1.0)
        };

        if !confidence.is_finite() {
            return Err(Error::Detection(format!(
                "pattern confidence is not finite ({confidence})"
            )));
        }

        Ok(DocumentPattern {
            font_sizes,
            font_names: candidates.iter().map(|c| c.font_name.clone()).collect(),
            bold: bold_count > 0,
            italic: candidates.iter().any(|c| c.italic),
            bold_ratio,
            numbering_kinds: candidates.iter().filter_map(|c| c.numbering).collect(),
            sample_count: candidates.len(),
            confidence,
        })
    }

    /// Pass 3: the adapted baseline configuration, if the pattern is trusted.
    pub fn adapt(&self, pattern: &DocumentPattern) -> Result<Option<SectionDetectorConfig>> {
        if pattern.confidence <= self.config.confidence_threshold || pattern.font_sizes.is_empty() {
            return Ok(None);
        }

        let tolerance = self.config.font_size_tolerance;
        let learned_min = pattern.font_sizes.iter().copied().fold(f32::MAX, f32::min);
        let learned_max = pattern.font_sizes.iter().copied().fold(f32::MIN, f32::max);
        let min = (learned_min - tolerance).max(self.config.adapted_size_floor);
        let max = (learned_max + tolerance).min(self.config.adapted_size_ceiling);

        if min > max {
            return Err(Error::Detection(format!(
                "adapted font-size interval is empty [{min:.1}, {max:.1}]"
            )));
        }

        let mut config = self.baseline.config().clone().with_font_size_range(min, max);
        if pattern.bold_ratio > 0.5 {
            config.require_bold = true;
        }

        log::debug!(
            "Adapted baseline: size [{:.1}, {:.1}], bold required: {}",
            config.font_size_min,
            config.font_size_max,
            config.require_bold
        );
        Ok(Some(config))
    }

    /// Pass 4: candidates matching the pattern that no section covers yet.
    fn pattern_sections(
        &self,
        candidates: &[SectionCandidate],
        existing: &[Section],
        pattern: &DocumentPattern,
    ) -> Vec<Section> {
        let tolerance = self.config.position_tolerance;
        let covered = |sections: &[Section], c: &SectionCandidate| {
            sections
                .iter()
                .any(|s| s.page == c.page && (s.position - c.y).abs() < tolerance)
        };

        let mut added: Vec<Section> = Vec::new();
        for candidate in candidates {
            if covered(existing, candidate) || covered(&added, candidate) {
                continue;
            }
            // A section key must be a dotted numeral.
            let Some(number) = &candidate.leading_number else {
                continue;
            };

            let score = pattern_score(candidate, pattern, self.config.font_size_tolerance);
            if score < self.config.frequency_threshold {
                continue;
            }

            let title = candidate.text[number.len()..]
                .trim_start_matches('.')
                .trim()
                .to_string();
            log::debug!(
                "Promoting candidate '{}' on page {} (score {:.2})",
                candidate.text,
                candidate.page,
                score
            );
            added.push(
                Section::new(number.clone(), title, candidate.page, candidate.y)
                    .with_x(candidate.x)
                    .with_font(Some(candidate.font_size), candidate.bold)
                    .with_origin(SectionOrigin::Adaptive, candidate.confidence),
            );
        }

        added
    }
}

impl Default for AdaptiveDetector {
    fn default() -> Self {
        Self::new(SectionDetectorConfig::default(), AdaptiveConfig::default())
            .expect("default number pattern is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, Document};

    fn span(text: &str, size: f32, font: &str, x: f32, y: f32) -> TextSpan {
        TextSpan::new(text, size, font, BBox::new(x, y, x + 100.0, y + size))
    }

    fn candidate(size: f32, bold: bool, confidence: f32) -> SectionCandidate {
        SectionCandidate {
            text: "1.1 Title".to_string(),
            font_size: size,
            font_name: "F".to_string(),
            bold,
            italic: false,
            x: 72.0,
            y: 0.0,
            page: 0,
            confidence,
            numbering: Some(NumberingKind::Hierarchical),
            leading_number: Some("1.1".to_string()),
            strong_keyword: false,
        }
    }

    #[test]
    fn test_candidate_sweep_joins_split_numeral() {
        let page = Page::letter(0)
            .with_span(span("2.3", 14.0, "Arial-Bold", 72.0, 200.0))
            .with_span(span("Maintenance", 14.0, "Arial-Bold", 100.0, 200.0))
            .with_span(span("the pump is serviced yearly", 10.0, "Arial", 150.0, 230.0));

        let candidates = AdaptiveDetector::default().page_candidates(&page);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text, "2.3 Maintenance");
        assert_eq!(candidates[0].leading_number.as_deref(), Some("2.3"));
        assert_eq!(candidates[0].numbering, Some(NumberingKind::Hierarchical));
        assert_eq!(candidates[0].confidence, 1.0);
    }

    #[test]
    fn test_candidate_sweep_caps_per_page() {
        let mut page = Page::letter(0);
        for i in 0..15 {
            page.add_span(span(&format!("{}. Heading", i + 1), 14.0, "Arial-Bold", 72.0, i as f32 * 40.0));
        }
        let candidates = AdaptiveDetector::default().page_candidates(&page);
        assert_eq!(candidates.len(), 10);
    }

    #[test]
    fn test_few_samples_have_no_confidence() {
        let detector = AdaptiveDetector::default();
        let pattern = detector
            .learn_pattern(&[candidate(14.0, true, 1.0), candidate(14.0, true, 1.0)])
            .unwrap();
        assert_eq!(pattern.confidence, 0.0);
        assert_eq!(pattern.font_sizes, vec![14.0]);
        assert_eq!(detector.adapt(&pattern).unwrap(), None);
    }

    #[test]
    fn test_pattern_confidence_formula() {
        let detector = AdaptiveDetector::default();
        let candidates = vec![
            candidate(14.0, true, 1.0),
            candidate(14.0, true, 1.0),
            candidate(12.0, false, 0.8),
            candidate(18.0, true, 0.5),
        ];
        let pattern = detector.learn_pattern(&candidates).unwrap();

        // 18pt is below the histogram cut, so only 14 and 12 are common.
        assert_eq!(pattern.font_sizes, vec![14.0, 12.0]);
        let expected = 0.4 * (2.0 / 3.0) + 0.3 * 0.75 + 0.3 * (3.3 / 4.0);
        assert!((pattern.confidence - expected).abs() < 1e-5);
        assert!(pattern.bold);
        assert_eq!(pattern.sample_count, 4);
    }

    #[test]
    fn test_histogram_ties_break_by_size() {
        let detector = AdaptiveDetector::default();
        let candidates = vec![
            candidate(16.0, true, 1.0),
            candidate(12.0, true, 1.0),
            candidate(14.0, true, 1.0),
            candidate(13.0, true, 1.0),
        ];
        let pattern = detector.learn_pattern(&candidates).unwrap();
        assert_eq!(pattern.font_sizes, vec![12.0, 13.0, 14.0]);
    }

    #[test]
    fn test_adapt_clamps_interval() {
        let detector = AdaptiveDetector::default();
        let pattern = DocumentPattern {
            font_sizes: vec![7.0, 19.5],
            bold_ratio: 0.9,
            confidence: 0.9,
            sample_count: 5,
            ..DocumentPattern::default()
        };
        let config = detector.adapt(&pattern).unwrap().unwrap();
        assert_eq!(config.font_size_min, 8.0);
        assert_eq!(config.font_size_max, 20.0);
        assert!(config.require_bold);

        // The baseline itself is untouched.
        assert_eq!(detector.baseline().config().font_size_min, 12.0);
    }

    #[test]
    fn test_adapt_below_threshold() {
        let detector = AdaptiveDetector::default();
        let pattern = DocumentPattern {
            font_sizes: vec![14.0],
            confidence: 0.7,
            sample_count: 5,
            ..DocumentPattern::default()
        };
        assert_eq!(detector.adapt(&pattern).unwrap(), None);
    }

    #[test]
    fn test_empty_interval_degrades() {
        let config = AdaptiveConfig {
            adapted_size_floor: 30.0,
            ..AdaptiveConfig::default()
        };
        let detector = AdaptiveDetector::new(SectionDetectorConfig::default(), config).unwrap();
        let pattern = DocumentPattern {
            font_sizes: vec![14.0],
            confidence: 0.9,
            sample_count: 5,
            ..DocumentPattern::default()
        };
        assert!(matches!(detector.adapt(&pattern), Err(Error::Detection(_))));
    }

    /// A manual whose headings are 18pt bold: outside the baseline interval.
    fn large_heading_document() -> Document {
        let mut page = Page::letter(0);
        for (i, y) in [100.0, 300.0, 500.0].into_iter().enumerate() {
            page.add_span(span(&format!("1.{}", i + 1), 18.0, "Arial-Bold", 72.0, y));
            page.add_span(span("Heading title", 18.0, "Arial-Bold", 110.0, y));
            page.add_span(span("body text follows here", 10.0, "Arial", 150.0, y + 30.0));
        }
        Document::new().with_page(page)
    }

    #[test]
    fn test_adaptation_finds_sections_baseline_misses() {
        let doc = large_heading_document();
        let baseline = SectionDetector::default().detect_sections(&doc).unwrap();
        assert!(baseline.is_empty());

        let report = AdaptiveDetector::default().detect_with_report(&doc).unwrap();
        assert!(report.adapted);
        assert_eq!(report.effective_config.font_size_max, 20.0);
        let numbers: Vec<&str> = report.sections.iter().map(|s| s.number.as_str()).collect();
        assert_eq!(numbers, vec!["1.1", "1.2", "1.3"]);
    }

    #[test]
    fn test_disabled_adaptation_is_baseline() {
        let doc = large_heading_document();
        let detector = AdaptiveDetector::new(
            SectionDetectorConfig::default(),
            AdaptiveConfig::default().with_adaptation(false),
        )
        .unwrap();
        let report = detector.detect_with_report(&doc).unwrap();
        assert!(report.sections.is_empty());
        assert!(report.pattern.is_none());
        assert!(!report.adapted);
    }

    #[test]
    fn test_learning_failure_falls_back() {
        let config = AdaptiveConfig {
            adapted_size_floor: 30.0,
            ..AdaptiveConfig::default()
        };
        let detector = AdaptiveDetector::new(SectionDetectorConfig::default(), config).unwrap();
        let report = detector.detect_with_report(&large_heading_document()).unwrap();
        assert!(report.degraded.is_some());
        assert!(!report.adapted);
        assert!(report.sections.is_empty());
    }
}
