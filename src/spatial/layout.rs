//! Page layout and per-image context.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::BBox;

/// A horizontal text column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Column {
    /// Left edge
    pub x0: f32,
    /// Right edge
    pub x1: f32,
}

impl Column {
    /// Create a column.
    pub fn new(x0: f32, x1: f32) -> Self {
        Self { x0, x1 }
    }

    /// Column width.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Whether `x` falls inside the column (edges included).
    pub fn contains(&self, x: f32) -> bool {
        self.x0 <= x && x <= self.x1
    }
}

/// Distance from the content extremes to the page edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

/// Reconstructed layout of one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLayout {
    /// Page index (0-based)
    pub page: usize,
    /// Page width
    pub width: f32,
    /// Page height
    pub height: f32,
    /// Columns, left to right
    pub columns: Vec<Column>,
    /// Content margins
    pub margins: Margins,
    /// Boxes of the text runs the layout was built from
    pub text_zones: Vec<BBox>,
}

impl PageLayout {
    /// Index of the column containing `x`.
    pub fn column_at(&self, x: f32) -> Option<usize> {
        self.columns.iter().position(|c| c.contains(x))
    }

    /// Whether the page has more than one column.
    pub fn is_multi_column(&self) -> bool {
        self.columns.len() > 1
    }
}

/// Spatial facts about one image, derived once and consumed by association.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageContext {
    /// Placement
    pub bbox: BBox,
    /// Page index
    pub page: usize,
    /// Placement area
    pub area: f32,
    /// Width / height (1.0 for a flat box)
    pub aspect_ratio: f32,
    /// Column containing the image center
    pub column: Option<usize>,
    /// Text tokens around the image
    pub nearby_text: Vec<String>,
    /// Distance to each scored section, by number
    pub section_distances: BTreeMap<String, f32>,
}

impl ImageContext {
    /// Nearby text joined and lowercased.
    pub fn nearby_joined(&self) -> String {
        self.nearby_text.join(" ").to_lowercase()
    }
}
