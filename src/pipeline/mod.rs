//! Extraction orchestration.
//!
//! A run walks a fixed sequence of states:
//!
//! ```text
//! Init -> SectionDetection -> ImageEnumeration -> Validation
//!      -> Association -> Naming -> Persist -> Done
//! ```
//!
//! Any structural error moves the run to `Error` and nothing is written.
//! Names are final before the first write: association and counting finish
//! for the whole document, then each image is written once under its final
//! name.

pub mod manual;
pub mod naming;
mod result;
mod sink;

use std::fmt;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

pub use manual::{ManualNameResolver, ManualNameStrategy};
pub use naming::{Nomenclature, UNASSOCIATED};
pub use result::{
    DocumentAnalysis, ExtractedFile, ExtractionPlan, ExtractionResult, LayoutSummary,
    PlannedImage, RejectedImage, RunStatistics,
};
pub use sink::{DirectorySink, MemorySink, OutputSink};

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::model::{DocumentModel, ImageFormat, ImageRegion, Page, Section};
use crate::spatial::{ImageContext, PageLayout, SpatialAnalyzer};
use crate::structure::AdaptiveDetector;
use crate::validate::{ImageAnalysis, ImageValidator, ValidationContext};

/// Where a run is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    SectionDetection,
    ImageEnumeration,
    Validation,
    Association,
    Naming,
    Persist,
    Done,
    Error,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Init => "init",
            PipelineState::SectionDetection => "section_detection",
            PipelineState::ImageEnumeration => "image_enumeration",
            PipelineState::Validation => "validation",
            PipelineState::Association => "association",
            PipelineState::Naming => "naming",
            PipelineState::Persist => "persist",
            PipelineState::Done => "done",
            PipelineState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Enumerated page with its layout.
struct PageScan<'d> {
    page: &'d Page,
    layout: PageLayout,
    regions: Vec<ImageRegion>,
}

/// An accepted image waiting for association.
struct Accepted<'a> {
    region: &'a ImageRegion,
    analysis: ImageAnalysis,
    context: ImageContext,
    layout: &'a PageLayout,
}

/// Section detection, validation, association and naming for one document.
///
/// Detectors are built once; the duplicate cache and section counters are
/// rebuilt for every run, so repeated runs over the same document give the
/// same names.
pub struct ExtractionPipeline {
    config: ExtractionConfig,
    detector: AdaptiveDetector,
    spatial: SpatialAnalyzer,
    resolver: ManualNameResolver,
    state: PipelineState,
}

impl ExtractionPipeline {
    /// Create a pipeline, rejecting unusable configuration.
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        config.validate()?;
        let detector = AdaptiveDetector::new(config.detection.clone(), config.adaptive.clone())?;
        let spatial = SpatialAnalyzer::new(config.spatial.clone());

        Ok(Self {
            config,
            detector,
            spatial,
            resolver: ManualNameResolver::new(),
            state: PipelineState::Init,
        })
    }

    /// Replace the manual-name strategies.
    pub fn with_manual_resolver(mut self, resolver: ManualNameResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// State of the last run.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn enter(&mut self, next: PipelineState) {
        log::debug!("Pipeline {} -> {}", self.state, next);
        self.state = next;
    }

    /// The manual name a run would use.
    pub fn manual_name(&self, doc: &dyn DocumentModel) -> String {
        match &self.config.manual_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => self.resolver.deduce(doc),
        }
    }

    /// Run every stage up to naming without writing anything.
    pub fn plan(&mut self, doc: &dyn DocumentModel) -> Result<ExtractionPlan> {
        self.enter(PipelineState::Init);
        let plan = self.build_plan(doc);
        if let Err(e) = &plan {
            log::error!("Extraction failed during {}: {}", self.state, e);
            self.enter(PipelineState::Error);
        }
        plan
    }

    fn build_plan(&mut self, doc: &dyn DocumentModel) -> Result<ExtractionPlan> {
        let started = Instant::now();
        let mut stats = RunStatistics::new();

        self.enter(PipelineState::SectionDetection);
        let report = self.detector.detect_with_report(doc)?;
        let sections = report.sections;
        stats.sections_found = sections.len();

        self.enter(PipelineState::ImageEnumeration);
        let mut scans = Vec::with_capacity(doc.page_count());
        for index in 0..doc.page_count() {
            let page = doc.page(index)?;
            let layout = self.spatial.analyze_page_layout(page)?;
            let regions = ImageRegion::enumerate(page);
            stats.images_total += regions.len();
            scans.push(PageScan {
                page,
                layout,
                regions,
            });
        }
        stats.pages_processed = scans.len();

        self.enter(PipelineState::Validation);
        let mut validator = ImageValidator::new(self.config.validator.clone());
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for scan in &scans {
            for region in &scan.regions {
                let context = self
                    .spatial
                    .create_image_context(&region.bbox, scan.page, &scan.layout);
                let validation = ValidationContext::new(
                    sections
                        .iter()
                        .any(|s| s.precedes(region.page, region.bbox.y0)),
                    context.nearby_text.clone(),
                );

                let analysis = validator.validate_image(&region.bbox, scan.page, Some(&validation));
                if analysis.is_valid() {
                    accepted.push(Accepted {
                        region,
                        analysis,
                        context,
                        layout: &scan.layout,
                    });
                } else {
                    stats.add_rejection(analysis.verdict);
                    rejected.push(RejectedImage {
                        page: region.page,
                        index: region.index,
                        bbox: region.bbox,
                        analysis,
                    });
                }
            }
        }

        self.enter(PipelineState::Association);
        let mut associations = Vec::with_capacity(accepted.len());
        for item in &mut accepted {
            associations.push(
                self.spatial
                    .associate_image_to_section(&mut item.context, &sections, item.layout),
            );
        }

        self.enter(PipelineState::Naming);
        let nomenclature = Nomenclature::new(self.config.prefix.as_str(), self.manual_name(doc));
        let keys: Vec<(String, ImageFormat)> = accepted
            .iter()
            .zip(&associations)
            .map(|(item, section)| (section_key(*section).to_string(), item.region.format))
            .collect();
        let names = nomenclature.assign(&keys);

        let images = accepted
            .into_iter()
            .zip(associations)
            .zip(keys)
            .zip(names)
            .map(|(((item, section), (key, _)), name)| PlannedImage {
                region: item.region.clone(),
                analysis: item.analysis,
                section: key,
                associated: section.is_some(),
                counter: name.counter,
                filename: name.filename,
            })
            .collect::<Vec<_>>();

        stats.processing_time_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "Planned {} images ({} rejected) over {} sections",
            images.len(),
            rejected.len(),
            sections.len()
        );

        Ok(ExtractionPlan {
            manual_name: nomenclature.manual().to_string(),
            sections,
            pattern: report.pattern,
            detection_degraded: report.degraded,
            images,
            rejected,
            statistics: stats,
        })
    }

    /// Plan, then write every planned image to `sink`.
    ///
    /// Never returns an error: a structural failure yields a failed result
    /// with no files, and a failed write is recorded while the run goes on.
    pub fn run(&mut self, doc: &dyn DocumentModel, sink: &mut dyn OutputSink) -> ExtractionResult {
        let started_at = Utc::now();
        let started = Instant::now();

        let plan = match self.plan(doc) {
            Ok(plan) => plan,
            Err(e) => return ExtractionResult::failed(e.to_string(), started_at, RunStatistics::new()),
        };

        self.enter(PipelineState::Persist);
        let mut stats = plan.statistics;
        let mut files = Vec::with_capacity(plan.images.len());
        let mut errors = Vec::new();

        for image in plan.images {
            match sink.write(&image.filename, &image.region.data) {
                Ok(path) => {
                    stats.add_extracted(&image.section);
                    files.push(ExtractedFile {
                        filename: image.filename,
                        path,
                        page: image.region.page,
                        section: image.section,
                        size_bytes: image.region.size,
                        counter: image.counter,
                    });
                }
                Err(e) => {
                    log::warn!("Skipping image: {}", e);
                    stats.add_persist_failure();
                    errors.push(e.to_string());
                }
            }
        }

        self.enter(PipelineState::Done);
        stats.processing_time_ms = started.elapsed().as_millis() as u64;
        let success = errors.is_empty() || stats.images_extracted > 0;
        log::info!(
            "Extracted {}/{} images in {} ms",
            stats.images_extracted,
            stats.images_total,
            stats.processing_time_ms
        );

        ExtractionResult {
            success,
            state: self.state,
            manual_name: Some(plan.manual_name),
            files,
            statistics: stats,
            errors,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Sections, learned pattern and page layouts, without validation.
    pub fn analyze(&self, doc: &dyn DocumentModel) -> Result<DocumentAnalysis> {
        let report = self.detector.detect_with_report(doc)?;

        let mut layouts = Vec::with_capacity(doc.page_count());
        let mut image_count = 0;
        for index in 0..doc.page_count() {
            let page = doc.page(index)?;
            let layout = self.spatial.analyze_page_layout(page)?;
            image_count += page.images.len();
            layouts.push(LayoutSummary {
                page: page.index,
                columns: layout.columns.len(),
                text_zones: layout.text_zones.len(),
                images: page.images.len(),
            });
        }

        Ok(DocumentAnalysis {
            page_count: doc.page_count(),
            manual_name: self.manual_name(doc),
            sections: report.sections,
            pattern: report.pattern,
            adapted: report.adapted,
            layouts,
            image_count,
        })
    }
}

/// Naming key of an association.
///
/// A heading numbered "0" and the unassociated images share the key "0", so
/// they are counted as one group and every filename stays unique.
fn section_key(section: Option<&Section>) -> &str {
    section.map_or(UNASSOCIATED, |s| s.number.as_str())
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::new(ExtractionConfig::default()).expect("default configuration is valid")
    }
}
