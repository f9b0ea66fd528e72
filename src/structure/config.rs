//! Section detection configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the baseline heading detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionDetectorConfig {
    /// Smallest accepted font size (inclusive)
    pub font_size_min: f32,

    /// Largest accepted font size (inclusive)
    pub font_size_max: f32,

    /// Require both the numeral and the title span to be bold
    pub require_bold: bool,

    /// Minimum title length in characters
    pub title_min_length: usize,

    /// Grammar for the numeral span
    pub number_pattern: String,
}

impl SectionDetectorConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the accepted font-size interval.
    pub fn with_font_size_range(mut self, min: f32, max: f32) -> Self {
        self.font_size_min = min;
        self.font_size_max = max;
        self
    }

    /// Set whether bold is required.
    pub fn with_require_bold(mut self, require: bool) -> Self {
        self.require_bold = require;
        self
    }

    /// Set the minimum title length.
    pub fn with_title_min_length(mut self, len: usize) -> Self {
        self.title_min_length = len;
        self
    }

    /// Check if a font size falls in the accepted interval.
    pub fn accepts_size(&self, size: f32) -> bool {
        size >= self.font_size_min && size <= self.font_size_max
    }
}

impl Default for SectionDetectorConfig {
    fn default() -> Self {
        Self {
            font_size_min: 12.0,
            font_size_max: 16.0,
            require_bold: true,
            title_min_length: 5,
            number_pattern: r"^\d+(\.\d+)*$".to_string(),
        }
    }
}

/// Configuration for the adaptive detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Run the learning passes at all
    pub adaptation_enabled: bool,

    /// Candidates needed before a pattern carries any confidence
    pub min_samples: usize,

    /// Pattern confidence needed before the baseline is adapted
    pub confidence_threshold: f32,

    /// Slack around learned font sizes
    pub font_size_tolerance: f32,

    /// Lower clamp for the adapted font-size interval
    pub adapted_size_floor: f32,

    /// Upper clamp for the adapted font-size interval
    pub adapted_size_ceiling: f32,

    /// Vertical distance under which a candidate overlaps an existing section
    pub position_tolerance: f32,

    /// Minimum learned-pattern match score for a synthetic section
    pub frequency_threshold: f32,

    /// Minimum initial confidence for a candidate to survive the sweep
    pub candidate_min_confidence: f32,

    /// Candidates kept per page, highest confidence first
    pub max_candidates_per_page: usize,

    /// Candidate text length bounds in characters (inclusive)
    pub text_length_range: (usize, usize),

    /// Only candidates above this confidence feed the font-size histogram
    pub histogram_min_confidence: f32,
}

impl AdaptiveConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable adaptation.
    pub fn with_adaptation(mut self, enabled: bool) -> Self {
        self.adaptation_enabled = enabled;
        self
    }

    /// Set the pattern confidence threshold.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the minimum number of samples.
    pub fn with_min_samples(mut self, samples: usize) -> Self {
        self.min_samples = samples;
        self
    }
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            adaptation_enabled: true,
            min_samples: 3,
            confidence_threshold: 0.7,
            font_size_tolerance: 2.0,
            adapted_size_floor: 8.0,
            adapted_size_ceiling: 20.0,
            position_tolerance: 10.0,
            frequency_threshold: 0.3,
            candidate_min_confidence: 0.5,
            max_candidates_per_page: 10,
            text_length_range: (5, 200),
            histogram_min_confidence: 0.6,
        }
    }
}
