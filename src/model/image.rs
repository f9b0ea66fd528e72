//! Embedded image payloads.

use super::BBox;
use serde::{Deserialize, Serialize};

/// Encoded format of an embedded image payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG (DCTDecode)
    Jpeg,
    /// PNG (re-encoded raw samples)
    Png,
    /// JPEG 2000 (JPXDecode)
    Jpeg2000,
    /// TIFF
    Tiff,
    /// GIF
    Gif,
    /// BMP
    Bmp,
    /// WebP
    Webp,
    /// Undecoded stream data
    Raw,
}

impl ImageFormat {
    /// File extension used in output names.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Jpeg2000 => "jp2",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Webp => "webp",
            ImageFormat::Raw => "raw",
        }
    }

    /// MIME type of the payload.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg2000 => "image/jp2",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Raw => "application/octet-stream",
        }
    }

    /// Detect the format from magic bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(ImageFormat::Png);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(ImageFormat::Gif);
        }

        // TIFF, little- or big-endian
        if data.starts_with(&[0x49, 0x49, 0x2A, 0x00])
            || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            return Some(ImageFormat::Tiff);
        }

        if data.starts_with(b"BM") {
            return Some(ImageFormat::Bmp);
        }

        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::Webp);
        }

        // JPEG 2000 signature box
        if data.starts_with(&[0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20]) {
            return Some(ImageFormat::Jpeg2000);
        }

        None
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// An image placed on a page, as exposed by the document model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedImage {
    /// Encoded payload
    #[serde(skip_serializing, default)]
    pub data: Vec<u8>,

    /// Payload format
    pub format: ImageFormat,

    /// Placement on the page
    pub bbox: BBox,

    /// Width in pixels, if known
    pub pixel_width: Option<u32>,

    /// Height in pixels, if known
    pub pixel_height: Option<u32>,
}

impl EmbeddedImage {
    /// Create an image with the given payload and placement.
    pub fn new(data: Vec<u8>, format: ImageFormat, bbox: BBox) -> Self {
        Self {
            data,
            format,
            bbox,
            pixel_width: None,
            pixel_height: None,
        }
    }

    /// Create an image, detecting the format from the payload.
    pub fn detect(data: Vec<u8>, bbox: BBox) -> Self {
        let format = ImageFormat::detect(&data).unwrap_or(ImageFormat::Raw);
        Self::new(data, format, bbox)
    }

    /// Set pixel dimensions.
    pub fn with_pixels(mut self, width: u32, height: u32) -> Self {
        self.pixel_width = Some(width);
        self.pixel_height = Some(height);
        self
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        assert_eq!(ImageFormat::detect(&jpeg), Some(ImageFormat::Jpeg));

        let png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(ImageFormat::detect(&png), Some(ImageFormat::Png));

        assert_eq!(ImageFormat::detect(&[0u8; 4]), None);
    }

    #[test]
    fn test_extension() {
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!(ImageFormat::Jpeg2000.to_string(), "jp2");
    }

    #[test]
    fn test_unknown_payload_is_raw() {
        let img = EmbeddedImage::detect(vec![1, 2, 3], BBox::default());
        assert_eq!(img.format, ImageFormat::Raw);
        assert_eq!(img.size(), 3);
    }
}
