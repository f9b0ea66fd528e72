//! Section structure inference.
//!
//! [`SectionDetector`] recognizes `<numeral> <title>` span pairs under fixed
//! thresholds. [`AdaptiveDetector`] learns a document's heading typography,
//! re-runs the baseline with adapted thresholds and merges in headings the
//! learned pattern recognizes.

mod adaptive;
mod baseline;
mod config;
pub mod rules;

pub use adaptive::{AdaptiveDetector, DetectionReport, DocumentPattern, NumberingKind, SectionCandidate};
pub use baseline::{SectionDetector, DEDUP_TOLERANCE};
pub use config::{AdaptiveConfig, SectionDetectorConfig};
