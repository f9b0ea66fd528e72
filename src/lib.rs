//! # lenscrl
//!
//! Section-aware image extraction from technical PDF manuals.
//!
//! lenscrl finds the numbered section structure of a document, filters its
//! embedded images down to real content, assigns each image to the section it
//! illustrates and writes it under a deterministic CRL name:
//!
//! ```text
//! CRL-PROCSG02-2.4.png         only image of section 2.4
//! CRL-PROCSG02-3.1 n_1.jpg     first of several images of section 3.1
//! CRL-PROCSG02-0 n_2.png       second image no section claims
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use lenscrl::extract_images;
//!
//! fn main() -> lenscrl::Result<()> {
//!     let result = extract_images("PROCSG02_manual.pdf", "./images")?;
//!     for file in &result.files {
//!         println!("{} (page {})", file.filename, file.page + 1);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Components
//!
//! - [`source`]: lopdf adapter producing the in-memory [`Document`]
//! - [`structure`]: baseline and adaptive section detection
//! - [`validate`]: image classification and filtering
//! - [`spatial`]: column layout and image-to-section association
//! - [`pipeline`]: orchestration, naming and output sinks
//!
//! The engine only reads documents through [`DocumentModel`], so any backend
//! exposing spans, images and page geometry can feed it.

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod source;
pub mod spatial;
pub mod structure;
pub mod validate;

pub use config::ExtractionConfig;
pub use error::{Error, Result};
pub use model::{
    BBox, Document, DocumentModel, EmbeddedImage, ImageFormat, ImageRegion, Metadata, Page,
    Section, SectionOrigin, TextSpan,
};
pub use pipeline::{
    DirectorySink, DocumentAnalysis, ExtractedFile, ExtractionPipeline, ExtractionPlan,
    ExtractionResult, MemorySink, OutputSink, PipelineState, RunStatistics,
};
pub use source::{ErrorMode, LoadOptions, PageSelection, PdfLoader};
pub use spatial::{OrphanPolicy, SpatialAnalyzer, SpatialConfig};
pub use structure::{AdaptiveConfig, AdaptiveDetector, SectionDetector, SectionDetectorConfig};
pub use validate::{ImageAnalysis, ImageType, ImageValidator, ValidatorConfig, Verdict};

use std::path::Path;

use chrono::Utc;

/// Load a PDF file into the in-memory model.
///
/// # Example
///
/// ```no_run
/// use lenscrl::{load_file, DocumentModel};
///
/// let doc = load_file("manual.pdf").unwrap();
/// println!("Pages: {}", doc.page_count());
/// ```
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    PdfLoader::open(path)?.load()
}

/// Load a PDF file with custom options.
pub fn load_file_with_options<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<Document> {
    PdfLoader::open_with_options(path, options)?.load()
}

/// Load a PDF from bytes.
pub fn load_bytes(data: &[u8]) -> Result<Document> {
    PdfLoader::from_bytes(data)?.load()
}

/// Detect the sections of a PDF file.
///
/// ```no_run
/// let sections = lenscrl::detect_sections("manual.pdf").unwrap();
/// for s in &sections {
///     println!("{} {} (page {})", s.number, s.title, s.page + 1);
/// }
/// ```
pub fn detect_sections<P: AsRef<Path>>(path: P) -> Result<Vec<Section>> {
    let doc = load_file(path)?;
    AdaptiveDetector::default().detect_sections_adaptive(&doc)
}

/// Extract every valid image of a PDF into `out_dir` with default settings.
///
/// A source that cannot be read or decoded is reported as a failed
/// [`ExtractionResult`], like any other structural failure. `Err` is left for
/// configuration errors.
pub fn extract_images<P: AsRef<Path>, Q: AsRef<Path>>(path: P, out_dir: Q) -> Result<ExtractionResult> {
    LensCrl::new().extract(path, out_dir)
}

/// Builder for configured extraction runs.
///
/// # Example
///
/// ```no_run
/// use lenscrl::{LensCrl, OrphanPolicy};
///
/// let result = LensCrl::new()
///     .with_manual_name("PROCSG02")
///     .with_orphan_policy(OrphanPolicy::NearestSection)
///     .lenient()
///     .extract("manual.pdf", "./images")?;
/// println!("{} images", result.statistics.images_extracted);
/// # Ok::<(), lenscrl::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct LensCrl {
    config: ExtractionConfig,
}

impl LensCrl {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a full configuration.
    pub fn with_config(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Set the manual name instead of deducing it.
    pub fn with_manual_name(mut self, name: impl Into<String>) -> Self {
        self.config = self.config.with_manual_name(name);
        self
    }

    /// Set the filename prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config = self.config.with_prefix(prefix);
        self
    }

    /// Set the orphan policy.
    pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.config = self.config.with_orphan_policy(policy);
        self
    }

    /// Skip undecodable pages and images while loading.
    pub fn lenient(mut self) -> Self {
        self.config.load = self.config.load.lenient();
        self
    }

    /// Decode pages one at a time.
    pub fn sequential(mut self) -> Self {
        self.config.load = self.config.load.sequential();
        self
    }

    /// Restrict loading to some pages.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.config.load = self.config.load.with_pages(pages);
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    fn load<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        load_file_with_options(path, self.config.load.clone())
    }

    /// Extract a PDF file into a directory.
    ///
    /// Structural load errors end up in the returned result with
    /// `success == false`; only configuration errors are returned as `Err`.
    pub fn extract<P: AsRef<Path>, Q: AsRef<Path>>(self, path: P, out_dir: Q) -> Result<ExtractionResult> {
        let started_at = Utc::now();
        let mut pipeline = ExtractionPipeline::new(self.config.clone())?;

        let doc = match self.load(path.as_ref()) {
            Ok(doc) => doc,
            Err(e) if e.is_structural() => {
                log::error!("Cannot load {}: {}", path.as_ref().display(), e);
                return Ok(ExtractionResult::failed(e.to_string(), started_at, RunStatistics::new()));
            }
            Err(e) => return Err(e),
        };
        Ok(pipeline.run(&doc, &mut DirectorySink::new(out_dir)))
    }

    /// Name every image of a PDF file without writing.
    pub fn plan<P: AsRef<Path>>(self, path: P) -> Result<ExtractionPlan> {
        let doc = self.load(path)?;
        ExtractionPipeline::new(self.config)?.plan(&doc)
    }

    /// Analyze the structure of a PDF file.
    pub fn analyze<P: AsRef<Path>>(self, path: P) -> Result<DocumentAnalysis> {
        let doc = self.load(path)?;
        ExtractionPipeline::new(self.config)?.analyze(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_config() {
        let builder = LensCrl::new()
            .with_manual_name("OMA")
            .with_prefix("IMG")
            .with_orphan_policy(OrphanPolicy::NearestSection)
            .lenient()
            .sequential();

        let config = builder.config();
        assert_eq!(config.manual_name.as_deref(), Some("OMA"));
        assert_eq!(config.prefix, "IMG");
        assert_eq!(config.spatial.orphan_policy, OrphanPolicy::NearestSection);
        assert_eq!(config.load.error_mode, ErrorMode::Lenient);
        assert!(!config.load.parallel);
    }

    #[test]
    fn test_missing_file() {
        assert!(load_file("/nonexistent/manual.pdf").is_err());
    }

    #[test]
    fn test_extract_missing_file_is_failed_result() {
        let tmp = tempfile::tempdir().unwrap();
        let result = extract_images("/nonexistent/manual.pdf", tmp.path()).unwrap();

        assert!(!result.success);
        assert_eq!(result.state, PipelineState::Error);
        assert_eq!(result.errors.len(), 1);
        assert!(result.files.is_empty());
    }

    #[test]
    fn test_extract_invalid_config_is_err() {
        let tmp = tempfile::tempdir().unwrap();
        let result = LensCrl::new().with_prefix(" ").extract("/nonexistent/manual.pdf", tmp.path());
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
