//! Layout analysis and association settings.

use serde::{Deserialize, Serialize};

/// What an image resolves to when no section precedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Leave it unassociated (section "0")
    #[default]
    Unassociated,
    /// Use the first section that follows it
    NearestSection,
}

/// Configuration for [`SpatialAnalyzer`](super::SpatialAnalyzer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Horizontal gap that starts a new column
    pub min_column_gap: f32,

    /// Detect more than one column per page
    pub multi_column: bool,

    /// Largest vertical gap between lines of one text block
    pub block_line_gap: f32,

    /// Left-edge drift allowed between lines of one text block
    pub block_align_tolerance: f32,

    /// Distance at which the proximity score reaches zero
    pub max_distance: f32,

    /// Bonus when image and section share a column
    pub same_column_bonus: f32,

    /// Score a section must exceed to be accepted
    pub association_threshold: f32,

    /// Margin around an image searched for nearby text
    pub context_radius: f32,

    /// Nearby text tokens kept per image
    pub max_nearby_tokens: usize,

    /// Tokens must be longer than this many characters
    pub min_token_length: usize,

    /// Resolution for images no section precedes
    pub orphan_policy: OrphanPolicy,
}

impl SpatialConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the orphan policy.
    pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.orphan_policy = policy;
        self
    }

    /// Set the column gap.
    pub fn with_min_column_gap(mut self, gap: f32) -> Self {
        self.min_column_gap = gap;
        self
    }

    /// Set the maximum association distance.
    pub fn with_max_distance(mut self, distance: f32) -> Self {
        self.max_distance = distance;
        self
    }
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            min_column_gap: 20.0,
            multi_column: true,
            block_line_gap: 4.0,
            block_align_tolerance: 2.0,
            max_distance: 200.0,
            same_column_bonus: 0.5,
            association_threshold: 0.3,
            context_radius: 50.0,
            max_nearby_tokens: 10,
            min_token_length: 2,
            orphan_policy: OrphanPolicy::Unassociated,
        }
    }
}
