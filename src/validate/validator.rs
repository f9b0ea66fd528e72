//! Staged image validation.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use super::config::ValidatorConfig;
use crate::model::{geometry_hash, BBox, ImageRegion, Page};

/// Content class guessed from placement geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    Diagram,
    Chart,
    Photo,
    Logo,
    Decoration,
    Unknown,
}

/// Outcome of validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Accepted for extraction
    Valid,
    /// Width, height or area out of bounds
    InvalidSize,
    /// Width/height ratio out of bounds
    InvalidAspect,
    /// Quality or relevance below the floor
    InvalidContent,
    /// Same geometry already seen in this run
    Duplicate,
    /// Ornament, rule or logo
    Decoration,
}

impl Verdict {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Valid => "valid",
            Verdict::InvalidSize => "invalid_size",
            Verdict::InvalidAspect => "invalid_aspect",
            Verdict::InvalidContent => "invalid_content",
            Verdict::Duplicate => "duplicate",
            Verdict::Decoration => "decoration",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-image validation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageAnalysis {
    /// Guessed content class
    pub image_type: ImageType,
    /// Confidence in the content class
    pub confidence: f32,
    /// Quality score in [0, 1]
    pub quality: f32,
    /// Relevance score in [0, 1]
    pub relevance: f32,
    /// Final verdict
    pub verdict: Verdict,
    /// Human-readable reasons for a rejection
    pub issues: Vec<String>,
}

impl ImageAnalysis {
    fn pending() -> Self {
        Self {
            image_type: ImageType::Unknown,
            confidence: 0.0,
            quality: 0.0,
            relevance: 0.0,
            verdict: Verdict::Valid,
            issues: Vec::new(),
        }
    }

    fn reject(mut self, verdict: Verdict, issue: impl Into<String>) -> Self {
        self.verdict = verdict;
        self.issues.push(issue.into());
        self
    }

    /// Whether the image is accepted.
    pub fn is_valid(&self) -> bool {
        self.verdict == Verdict::Valid
    }
}

/// Surroundings of an image that influence its relevance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationContext {
    /// Some detected section precedes the image in reading order
    pub section_associated: bool,
    /// Text tokens near the image
    pub nearby_text: Vec<String>,
}

impl ValidationContext {
    /// Create a context.
    pub fn new(section_associated: bool, nearby_text: Vec<String>) -> Self {
        Self {
            section_associated,
            nearby_text,
        }
    }
}

/// Placement geometry seen by the content rules.
#[derive(Debug, Clone, Copy)]
pub struct Shape {
    pub area: f32,
    pub ratio: f32,
}

/// One row of the content decision table.
pub struct ContentRule {
    pub name: &'static str,
    pub applies: fn(&Shape, &ValidatorConfig) -> bool,
    pub image_type: ImageType,
    pub confidence: f32,
    pub quality: f32,
}

fn extreme_ratio(s: &Shape, _: &ValidatorConfig) -> bool {
    s.ratio > 4.0 || s.ratio < 0.25
}

fn large_balanced(s: &Shape, c: &ValidatorConfig) -> bool {
    s.area > c.large_area && (0.5..=2.0).contains(&s.ratio)
}

fn large_wide(s: &Shape, c: &ValidatorConfig) -> bool {
    s.area > c.large_area && s.ratio > 2.0
}

fn large(s: &Shape, c: &ValidatorConfig) -> bool {
    s.area > c.large_area
}

fn medium_square(s: &Shape, c: &ValidatorConfig) -> bool {
    s.area > c.medium_area && (0.8..=1.5).contains(&s.ratio)
}

fn medium(s: &Shape, c: &ValidatorConfig) -> bool {
    s.area > c.medium_area
}

fn small_thin(s: &Shape, _: &ValidatorConfig) -> bool {
    s.ratio > 3.0 || s.ratio < 0.3
}

fn any(_: &Shape, _: &ValidatorConfig) -> bool {
    true
}

/// Content classification. The first matching row wins.
pub static CONTENT_RULES: &[ContentRule] = &[
    ContentRule { name: "extreme-ratio", applies: extreme_ratio, image_type: ImageType::Decoration, confidence: 0.7, quality: 0.2 },
    ContentRule { name: "large-balanced", applies: large_balanced, image_type: ImageType::Diagram, confidence: 0.7, quality: 0.8 },
    ContentRule { name: "large-wide", applies: large_wide, image_type: ImageType::Chart, confidence: 0.6, quality: 0.7 },
    ContentRule { name: "large-narrow", applies: large, image_type: ImageType::Unknown, confidence: 0.0, quality: 0.5 },
    ContentRule { name: "medium-square", applies: medium_square, image_type: ImageType::Photo, confidence: 0.6, quality: 0.6 },
    ContentRule { name: "medium", applies: medium, image_type: ImageType::Diagram, confidence: 0.5, quality: 0.6 },
    ContentRule { name: "small-thin", applies: small_thin, image_type: ImageType::Decoration, confidence: 0.7, quality: 0.2 },
    ContentRule { name: "small", applies: any, image_type: ImageType::Logo, confidence: 0.4, quality: 0.5 },
];

/// Classifies image placements and filters out non-content.
///
/// The validator owns a duplicate cache scoped to one run. Use a fresh
/// validator per document, or call [`reset_duplicate_cache`](Self::reset_duplicate_cache)
/// between runs.
#[derive(Debug, Clone, Default)]
pub struct ImageValidator {
    config: ValidatorConfig,
    seen: HashSet<String>,
}

impl ImageValidator {
    /// Create a validator with the given configuration.
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
            seen: HashSet::new(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Number of geometry keys cached in this run.
    pub fn cached_count(&self) -> usize {
        self.seen.len()
    }

    /// Validate one placement on a page.
    ///
    /// Stages short-circuit on the first rejection. Only images that reach
    /// the duplicate stage are added to the cache.
    pub fn validate_image(&mut self, bbox: &BBox, page: &Page, context: Option<&ValidationContext>) -> ImageAnalysis {
        let analysis = self.run_stages(bbox, page, context);
        log::debug!(
            "Page {} image {:?}: {} ({:?}, quality {:.2}, relevance {:.2})",
            page.index,
            bbox,
            analysis.verdict,
            analysis.image_type,
            analysis.quality,
            analysis.relevance
        );
        analysis
    }

    fn run_stages(&mut self, bbox: &BBox, page: &Page, context: Option<&ValidationContext>) -> ImageAnalysis {
        let mut analysis = ImageAnalysis::pending();

        if !bbox.is_finite() {
            return analysis.reject(Verdict::InvalidSize, "Non-finite placement geometry");
        }

        let size_issues = self.size_issues(bbox);
        if !size_issues.is_empty() {
            analysis.verdict = Verdict::InvalidSize;
            analysis.issues = size_issues;
            return analysis;
        }

        let ratio = bbox.aspect_ratio().unwrap_or(f32::INFINITY);
        if ratio < self.config.min_aspect_ratio {
            return analysis.reject(
                Verdict::InvalidAspect,
                format!("Ratio too narrow: {:.2} < {}", ratio, self.config.min_aspect_ratio),
            );
        }
        if ratio > self.config.max_aspect_ratio {
            return analysis.reject(
                Verdict::InvalidAspect,
                format!("Ratio too wide: {:.2} > {}", ratio, self.config.max_aspect_ratio),
            );
        }

        let shape = Shape {
            area: bbox.area(),
            ratio,
        };
        let (image_type, confidence, quality) = self.classify(&shape, bbox, page);
        analysis.image_type = image_type;
        analysis.confidence = confidence;
        analysis.quality = quality;

        if self.config.decoration_filter && self.is_decoration(&shape, image_type, bbox, page) {
            return analysis.reject(Verdict::Decoration, "Detected as decorative element");
        }

        if self.config.duplicate_detection {
            let key = geometry_hash(bbox, page.width, page.height);
            if !self.seen.insert(key) {
                return analysis.reject(Verdict::Duplicate, "Duplicate placement geometry");
            }
        }

        analysis.relevance = self.relevance(bbox, page, context);

        if analysis.quality < self.config.min_quality {
            analysis.verdict = Verdict::InvalidContent;
            analysis.issues.push(format!("Quality too low: {:.2}", analysis.quality));
        }
        if analysis.relevance < self.config.min_relevance {
            analysis.verdict = Verdict::InvalidContent;
            analysis.issues.push(format!("Relevance too low: {:.2}", analysis.relevance));
        }

        analysis
    }

    /// Every violated size constraint.
    fn size_issues(&self, bbox: &BBox) -> Vec<String> {
        let c = &self.config;
        let (w, h, area) = (bbox.width(), bbox.height(), bbox.area());
        let mut issues = Vec::new();

        if w < c.min_width {
            issues.push(format!("Width too small: {w:.0} < {}", c.min_width));
        }
        if h < c.min_height {
            issues.push(format!("Height too small: {h:.0} < {}", c.min_height));
        }
        if w > c.max_width {
            issues.push(format!("Width too large: {w:.0} > {}", c.max_width));
        }
        if h > c.max_height {
            issues.push(format!("Height too large: {h:.0} > {}", c.max_height));
        }
        if area < c.min_area {
            issues.push(format!("Area too small: {area:.0} < {}", c.min_area));
        }

        issues
    }

    fn classify(&self, shape: &Shape, bbox: &BBox, page: &Page) -> (ImageType, f32, f32) {
        let (image_type, confidence, mut quality) = CONTENT_RULES
            .iter()
            .find(|rule| (rule.applies)(shape, &self.config))
            .map(|rule| (rule.image_type, rule.confidence, rule.quality))
            .unwrap_or((ImageType::Unknown, 0.0, 0.5));

        // Header/footer band.
        if page.height > 0.0 {
            let relative_y = bbox.y0 / page.height;
            let in_band = relative_y < self.config.edge_band || relative_y > 1.0 - self.config.edge_band;
            if in_band && !matches!(image_type, ImageType::Decoration | ImageType::Logo) {
                quality *= self.config.edge_penalty;
            }
        }

        (image_type, confidence, quality)
    }

    fn is_decoration(&self, shape: &Shape, image_type: ImageType, bbox: &BBox, page: &Page) -> bool {
        if image_type == ImageType::Decoration {
            return true;
        }

        if shape.area < self.config.decoration_area && (shape.ratio > 5.0 || shape.ratio < 0.2) {
            return true;
        }

        let m = self.config.decoration_margin;
        let in_margin = bbox.x0 < page.width * m
            || bbox.x1 > page.width * (1.0 - m)
            || bbox.y0 < page.height * m
            || bbox.y1 > page.height * (1.0 - m);

        // Margin placement alone is not enough.
        in_margin && shape.area < self.config.decoration_margin_area
    }

    fn relevance(&self, bbox: &BBox, page: &Page, context: Option<&ValidationContext>) -> f32 {
        let mut relevance = 0.5;

        if let Some(context) = context {
            if context.section_associated {
                relevance += 0.3;
            }
            for text in &context.nearby_text {
                let lower = text.to_lowercase();
                if self.config.keywords.iter().any(|k| lower.contains(k.as_str())) {
                    relevance += 0.1;
                }
            }
        }

        if page.width > 0.0 && page.height > 0.0 {
            let (cx, cy) = bbox.center();
            let half_w = page.width / 2.0;
            let half_h = page.height / 2.0;
            let distance = ((cx - half_w).abs() / half_w + (cy - half_h).abs() / half_h) / 2.0;
            relevance -= distance * 0.2;
        }

        relevance.clamp(0.0, 1.0)
    }

    /// Validate a page's regions and keep the accepted ones.
    pub fn filter_valid<'a>(
        &mut self,
        regions: &'a [ImageRegion],
        page: &Page,
        context: Option<&ValidationContext>,
    ) -> Vec<(&'a ImageRegion, ImageAnalysis)> {
        let mut valid = Vec::new();
        for region in regions {
            let analysis = self.validate_image(&region.bbox, page, context);
            if analysis.is_valid() {
                valid.push((region, analysis));
            } else {
                log::debug!("Image rejected: {} - {:?}", analysis.verdict, analysis.issues);
            }
        }

        log::info!("Images filtered: {}/{} valid", valid.len(), regions.len());
        valid
    }

    /// Forget every geometry key seen so far.
    pub fn reset_duplicate_cache(&mut self) {
        self.seen.clear();
        log::debug!("Duplicate cache reset");
    }
}
