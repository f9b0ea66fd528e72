//! Document model types.
//!
//! The model is the boundary between a document backend (the lopdf loader or
//! any other [`DocumentModel`] implementation) and the extraction engine. It
//! carries positioned text spans, positioned image payloads, page geometry
//! and the sections derived from them.

mod document;
mod geometry;
mod image;
mod page;
mod region;
mod section;

pub use document::{Document, DocumentModel, Metadata};
pub use geometry::BBox;
pub use image::{EmbeddedImage, ImageFormat};
pub use page::{Page, TextSpan};
pub use region::{geometry_hash, ImageRegion};
pub use section::{sort_and_dedup, Section, SectionOrigin};
