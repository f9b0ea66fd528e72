//! Detected section headings.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How a section was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionOrigin {
    /// Numeral/title span pair matched by the baseline detector
    Baseline,
    /// Candidate promoted from the learned document pattern
    Adaptive,
}

/// A numbered heading used as the grouping key for image naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Dotted hierarchical number, e.g. "2.4.3"
    pub number: String,

    /// Heading title
    pub title: String,

    /// Page index (0-based)
    pub page: usize,

    /// Vertical position (top of the numeral span)
    pub position: f32,

    /// Left edge of the numeral span
    pub x: f32,

    /// Font size of the heading, if known
    pub font_size: Option<f32>,

    /// Whether the heading is bold
    pub bold: bool,

    /// Detection confidence in [0, 1]
    pub confidence: f32,

    /// Which pass produced the section
    pub origin: SectionOrigin,
}

impl Section {
    /// Create a baseline section with full confidence.
    pub fn new(number: impl Into<String>, title: impl Into<String>, page: usize, position: f32) -> Self {
        Self {
            number: number.into(),
            title: title.into(),
            page,
            position,
            x: 0.0,
            font_size: None,
            bold: false,
            confidence: 1.0,
            origin: SectionOrigin::Baseline,
        }
    }

    /// Set the left edge.
    pub fn with_x(mut self, x: f32) -> Self {
        self.x = x;
        self
    }

    /// Set font metadata.
    pub fn with_font(mut self, font_size: Option<f32>, bold: bool) -> Self {
        self.font_size = font_size;
        self.bold = bold;
        self
    }

    /// Set confidence and origin.
    pub fn with_origin(mut self, origin: SectionOrigin, confidence: f32) -> Self {
        self.origin = origin;
        self.confidence = confidence;
        self
    }

    /// Nesting depth of the number ("2.4.3" is 3).
    pub fn depth(&self) -> usize {
        self.number.split('.').count()
    }

    /// Reading-order comparison by (page, position).
    pub fn reading_order(&self, other: &Section) -> Ordering {
        self.page
            .cmp(&other.page)
            .then(self.position.partial_cmp(&other.position).unwrap_or(Ordering::Equal))
    }

    /// Whether the section starts at or before `(page, y)` in reading order.
    pub fn precedes(&self, page: usize, y: f32) -> bool {
        self.page < page || (self.page == page && self.position <= y)
    }
}

/// Sort sections by (page, position) and drop near-duplicates.
///
/// Two sections are duplicates when they sit on the same page, less than
/// `tolerance` apart vertically, and carry the same number. The first one
/// in reading order is kept.
pub fn sort_and_dedup(mut sections: Vec<Section>, tolerance: f32) -> Vec<Section> {
    sections.sort_by(|a, b| a.reading_order(b));

    let mut unique: Vec<Section> = Vec::with_capacity(sections.len());
    for section in sections {
        let duplicate = unique.iter().any(|s| {
            s.page == section.page
                && (s.position - section.position).abs() < tolerance
                && s.number == section.number
        });
        if !duplicate {
            unique.push(section);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth() {
        assert_eq!(Section::new("2", "Scope", 0, 0.0).depth(), 1);
        assert_eq!(Section::new("2.4.3", "Wiring", 0, 0.0).depth(), 3);
    }

    #[test]
    fn test_precedes() {
        let s = Section::new("1.1", "Intro", 1, 100.0);
        assert!(s.precedes(1, 100.0));
        assert!(s.precedes(2, 0.0));
        assert!(!s.precedes(1, 99.0));
        assert!(!s.precedes(0, 500.0));
    }

    #[test]
    fn test_sort_and_dedup() {
        let sections = vec![
            Section::new("1.2", "Second", 0, 300.0),
            Section::new("1.1", "First", 0, 100.0),
            Section::new("1.1", "First again", 0, 105.0),
            Section::new("1.3", "Near but different", 0, 302.0),
            Section::new("2.1", "Next page", 1, 50.0),
        ];
        let out = sort_and_dedup(sections, 10.0);
        let numbers: Vec<&str> = out.iter().map(|s| s.number.as_str()).collect();
        assert_eq!(numbers, vec!["1.1", "1.2", "1.3", "2.1"]);
        assert_eq!(out[0].title, "First");
    }
}
