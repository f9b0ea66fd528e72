//! Plans, results and run statistics.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::PipelineState;
use crate::model::{BBox, ImageRegion, Section};
use crate::structure::DocumentPattern;
use crate::validate::{ImageAnalysis, Verdict};

/// One written image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedFile {
    /// Output filename
    pub filename: String,

    /// Where the sink put it
    pub path: PathBuf,

    /// Page index (0-based)
    pub page: usize,

    /// Section key ("0" when unassociated)
    pub section: String,

    /// Payload size in bytes
    pub size_bytes: usize,

    /// 1-based position within the section
    pub counter: usize,
}

/// An accepted image with its final name, before any write.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedImage {
    pub region: ImageRegion,
    pub analysis: ImageAnalysis,
    /// Naming key ("0" when unassociated)
    pub section: String,
    /// Whether a detected section claimed the image
    pub associated: bool,
    pub counter: usize,
    pub filename: String,
}

/// An image the validator turned down.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedImage {
    pub page: usize,
    pub index: usize,
    pub bbox: BBox,
    pub analysis: ImageAnalysis,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStatistics {
    /// Sections detected
    pub sections_found: usize,

    /// Pages walked
    pub pages_processed: usize,

    /// Images enumerated
    pub images_total: usize,

    /// Images rejected by validation
    pub images_filtered_out: usize,

    /// Images written
    pub images_extracted: usize,

    /// Written images per section key
    pub images_by_section: BTreeMap<String, usize>,

    /// Rejections per verdict
    pub rejections_by_verdict: BTreeMap<String, usize>,

    /// Writes that failed
    pub persist_failures: usize,

    /// Wall-clock duration in milliseconds
    pub processing_time_ms: u64,
}

impl RunStatistics {
    /// Create empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a rejection.
    pub fn add_rejection(&mut self, verdict: Verdict) {
        self.images_filtered_out += 1;
        *self
            .rejections_by_verdict
            .entry(verdict.to_string())
            .or_insert(0) += 1;
    }

    /// Count a written image.
    pub fn add_extracted(&mut self, section: &str) {
        self.images_extracted += 1;
        *self.images_by_section.entry(section.to_string()).or_insert(0) += 1;
    }

    /// Count a failed write.
    pub fn add_persist_failure(&mut self) {
        self.persist_failures += 1;
    }
}

/// Everything decided before persistence.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionPlan {
    /// Manual name used in filenames
    pub manual_name: String,

    /// Detected sections in reading order
    pub sections: Vec<Section>,

    /// Learned heading pattern, if any
    pub pattern: Option<DocumentPattern>,

    /// Why adaptive detection fell back, if it did
    pub detection_degraded: Option<String>,

    /// Accepted images, named, in discovery order
    pub images: Vec<PlannedImage>,

    /// Rejected images with their analyses
    pub rejected: Vec<RejectedImage>,

    /// Counters up to naming
    pub statistics: RunStatistics,
}

impl ExtractionPlan {
    /// Planned filenames in order.
    pub fn filenames(&self) -> Vec<&str> {
        self.images.iter().map(|i| i.filename.as_str()).collect()
    }

    /// Planned images per section key.
    pub fn images_by_section(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for image in &self.images {
            *counts.entry(image.section.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Outcome of a full run.
///
/// A run never panics or returns `Err`; failure is reported here.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// No errors, or at least one image written
    pub success: bool,

    /// State the run ended in
    pub state: PipelineState,

    /// Manual name used, if the run got that far
    pub manual_name: Option<String>,

    /// Written files in order
    pub files: Vec<ExtractedFile>,

    /// Run counters
    pub statistics: RunStatistics,

    /// Errors met along the way
    pub errors: Vec<String>,

    /// Run start
    pub started_at: DateTime<Utc>,

    /// Run end
    pub finished_at: DateTime<Utc>,
}

impl ExtractionResult {
    /// A structured failure for a run that aborted.
    pub fn failed(error: String, started_at: DateTime<Utc>, statistics: RunStatistics) -> Self {
        Self {
            success: false,
            state: PipelineState::Error,
            manual_name: None,
            files: Vec::new(),
            statistics,
            errors: vec![error],
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Filenames written, in order.
    pub fn filenames(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.filename.as_str()).collect()
    }
}

/// Layout facts for one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutSummary {
    pub page: usize,
    pub columns: usize,
    pub text_zones: usize,
    pub images: usize,
}

/// Structure of a document, without validation or writes.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    pub page_count: usize,
    pub manual_name: String,
    pub sections: Vec<Section>,
    pub pattern: Option<DocumentPattern>,
    pub adapted: bool,
    pub layouts: Vec<LayoutSummary>,
    pub image_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_counters() {
        let mut stats = RunStatistics::new();
        stats.add_rejection(Verdict::Decoration);
        stats.add_rejection(Verdict::Decoration);
        stats.add_rejection(Verdict::InvalidSize);
        stats.add_extracted("1.1");
        stats.add_extracted("1.1");
        stats.add_extracted("0");

        assert_eq!(stats.images_filtered_out, 3);
        assert_eq!(stats.rejections_by_verdict.get("decoration"), Some(&2));
        assert_eq!(stats.images_by_section.get("1.1"), Some(&2));
        assert_eq!(stats.images_extracted, 3);
    }

    #[test]
    fn test_failed_result() {
        let result = ExtractionResult::failed("boom".into(), Utc::now(), RunStatistics::new());
        assert!(!result.success);
        assert_eq!(result.state, PipelineState::Error);
        assert!(result.files.is_empty());
    }
}
