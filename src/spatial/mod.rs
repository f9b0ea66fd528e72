//! Page layout reconstruction and image-to-section association.

mod analyzer;
mod config;
mod layout;

pub use analyzer::SpatialAnalyzer;
pub use config::{OrphanPolicy, SpatialConfig};
pub use layout::{Column, ImageContext, Margins, PageLayout};
