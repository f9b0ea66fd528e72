//! Image candidates enumerated from pages.

use super::{BBox, EmbeddedImage, ImageFormat, Page};
use serde::Serialize;

/// Coarse identity of an image placement: size plus relative page position.
///
/// The key ignores payload bytes and the page index, so the same logo placed
/// at the same spot on every page collapses to one key.
pub fn geometry_hash(bbox: &BBox, page_width: f32, page_height: f32) -> String {
    let rx = if page_width > 0.0 { bbox.x0 / page_width } else { 0.0 };
    let ry = if page_height > 0.0 { bbox.y0 / page_height } else { 0.0 };
    format!("{:.0}x{:.0}@{:.2},{:.2}", bbox.width(), bbox.height(), rx, ry)
}

/// One image candidate, created once during enumeration.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRegion {
    /// Page index (0-based)
    pub page: usize,

    /// Position in the page's enumeration order
    pub index: usize,

    /// Placement on the page
    pub bbox: BBox,

    /// Encoded payload
    #[serde(skip)]
    pub data: Vec<u8>,

    /// Payload format
    pub format: ImageFormat,

    /// Payload size in bytes
    pub size: usize,

    /// Pixel width, if known
    pub pixel_width: Option<u32>,

    /// Pixel height, if known
    pub pixel_height: Option<u32>,

    /// See [`geometry_hash`]
    pub geometry_hash: String,
}

impl ImageRegion {
    /// Build a region from a page's embedded image.
    pub fn from_embedded(page: &Page, index: usize, image: &EmbeddedImage) -> Self {
        Self {
            page: page.index,
            index,
            bbox: image.bbox,
            data: image.data.clone(),
            format: image.format,
            size: image.size(),
            pixel_width: image.pixel_width,
            pixel_height: image.pixel_height,
            geometry_hash: geometry_hash(&image.bbox, page.width, page.height),
        }
    }

    /// All regions of a page, in enumeration order.
    pub fn enumerate(page: &Page) -> Vec<Self> {
        page.images
            .iter()
            .enumerate()
            .map(|(i, image)| Self::from_embedded(page, i, image))
            .collect()
    }
}
