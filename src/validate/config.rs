//! Image validation thresholds.

use serde::{Deserialize, Serialize};

/// Configuration for [`ImageValidator`](super::ImageValidator).
///
/// Sizes are in page units (points), measured on the placement box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Minimum placement width
    pub min_width: f32,

    /// Minimum placement height
    pub min_height: f32,

    /// Maximum placement width
    pub max_width: f32,

    /// Maximum placement height
    pub max_height: f32,

    /// Minimum placement area
    pub min_area: f32,

    /// Smallest accepted width/height ratio
    pub min_aspect_ratio: f32,

    /// Largest accepted width/height ratio
    pub max_aspect_ratio: f32,

    /// Quality below this is invalid content
    pub min_quality: f32,

    /// Relevance below this is invalid content
    pub min_relevance: f32,

    /// Area above which an image counts as large
    pub large_area: f32,

    /// Area above which an image counts as medium
    pub medium_area: f32,

    /// Share of the page height treated as header/footer band
    pub edge_band: f32,

    /// Quality multiplier inside the header/footer band
    pub edge_penalty: f32,

    /// Share of the page treated as margin by the decoration re-check
    pub decoration_margin: f32,

    /// Area under which an extreme ratio means decoration
    pub decoration_area: f32,

    /// Area under which a margin placement means decoration
    pub decoration_margin_area: f32,

    /// Run the decoration re-check
    pub decoration_filter: bool,

    /// Run the duplicate check
    pub duplicate_detection: bool,

    /// Nearby-text keywords that raise relevance
    pub keywords: Vec<String>,
}

impl ValidatorConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set minimum width and height.
    pub fn with_min_size(mut self, width: f32, height: f32) -> Self {
        self.min_width = width;
        self.min_height = height;
        self
    }

    /// Set maximum width and height.
    pub fn with_max_size(mut self, width: f32, height: f32) -> Self {
        self.max_width = width;
        self.max_height = height;
        self
    }

    /// Set the minimum area.
    pub fn with_min_area(mut self, area: f32) -> Self {
        self.min_area = area;
        self
    }

    /// Set the accepted aspect-ratio interval.
    pub fn with_aspect_ratio(mut self, min: f32, max: f32) -> Self {
        self.min_aspect_ratio = min;
        self.max_aspect_ratio = max;
        self
    }

    /// Set the quality and relevance floors.
    pub fn with_thresholds(mut self, quality: f32, relevance: f32) -> Self {
        self.min_quality = quality;
        self.min_relevance = relevance;
        self
    }

    /// Enable or disable duplicate detection.
    pub fn with_duplicate_detection(mut self, enabled: bool) -> Self {
        self.duplicate_detection = enabled;
        self
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_width: 50.0,
            min_height: 50.0,
            max_width: 2000.0,
            max_height: 2000.0,
            min_area: 5000.0,
            min_aspect_ratio: 0.1,
            max_aspect_ratio: 10.0,
            min_quality: 0.5,
            min_relevance: 0.4,
            large_area: 50_000.0,
            medium_area: 10_000.0,
            edge_band: 0.1,
            edge_penalty: 0.7,
            decoration_margin: 0.05,
            decoration_area: 5000.0,
            decoration_margin_area: 10_000.0,
            decoration_filter: true,
            duplicate_detection: true,
            keywords: [
                "figure",
                "schéma",
                "diagramme",
                "graphique",
                "tableau",
                "image",
                "photo",
                "illustration",
                "annexe",
                "exemple",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
        }
    }
}
