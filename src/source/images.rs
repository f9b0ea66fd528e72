//! Image XObject decoding.

use std::io::{Cursor, Read};

use flate2::read::ZlibDecoder;
use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

use crate::error::{Error, Result};
use crate::model::ImageFormat;

/// A decoded image payload, ready to be placed on a page.
#[derive(Debug, Clone)]
pub(crate) struct DecodedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Decode the payload of an image XObject.
///
/// JPEG and JPEG 2000 streams are passed through. Flate-compressed or
/// unfiltered 8-bit samples in a gray, RGB or CMYK space are re-encoded as
/// PNG. Anything else keeps the raw stream bytes.
pub(crate) fn decode_image(doc: &LopdfDocument, stream: &Stream, page: usize) -> Result<DecodedImage> {
    let dict = &stream.dict;
    let width = dict_u32(dict, b"Width");
    let height = dict_u32(dict, b"Height");
    let filters = filter_names(dict);

    let passthrough = |format| DecodedImage {
        data: stream.content.clone(),
        format,
        width,
        height,
    };

    if filters.iter().any(|f| f == "DCTDecode") && filters.len() == 1 {
        return Ok(passthrough(ImageFormat::Jpeg));
    }
    if filters.iter().any(|f| f == "JPXDecode") && filters.len() == 1 {
        return Ok(passthrough(ImageFormat::Jpeg2000));
    }
    if !filters.iter().all(|f| f == "FlateDecode") {
        log::debug!("Keeping raw stream for filters {:?}", filters);
        return Ok(passthrough(ImageFormat::Raw));
    }

    let samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        inflate(&stream.content).map_err(|reason| Error::CorruptImage { page, reason })?
    };

    let bits = dict_u32(dict, b"BitsPerComponent").unwrap_or(8);
    let components = color_components(doc, dict);

    match (width, height, components) {
        (Some(w), Some(h), Some(n)) if bits == 8 => {
            let data = encode_png(samples, w, h, n).map_err(|reason| Error::CorruptImage { page, reason })?;
            Ok(DecodedImage {
                data,
                format: ImageFormat::Png,
                width,
                height,
            })
        }
        _ => {
            log::debug!("Unsupported sample layout on page {page}, keeping raw samples");
            Ok(DecodedImage {
                data: samples,
                format: ImageFormat::Raw,
                width,
                height,
            })
        }
    }
}

fn inflate(data: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| format!("decompression failed: {e}"))?;
    Ok(out)
}

fn encode_png(mut samples: Vec<u8>, width: u32, height: u32, components: u8) -> std::result::Result<Vec<u8>, String> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(components as usize))
        .ok_or_else(|| format!("image dimensions {width}x{height}x{components} overflow"))?;
    if samples.len() < expected {
        return Err(format!(
            "sample buffer holds {} bytes, {}x{}x{} needs {}",
            samples.len(),
            width,
            height,
            components,
            expected
        ));
    }
    samples.truncate(expected);

    let img = match components {
        1 => image::GrayImage::from_raw(width, height, samples).map(image::DynamicImage::ImageLuma8),
        4 => image::RgbImage::from_raw(width, height, cmyk_to_rgb(&samples))
            .map(image::DynamicImage::ImageRgb8),
        _ => image::RgbImage::from_raw(width, height, samples).map(image::DynamicImage::ImageRgb8),
    };
    let img = img.ok_or_else(|| "failed to build image from samples".to_string())?;

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| format!("PNG encoding failed: {e}"))?;
    Ok(png)
}

/// Convert CMYK bytes to RGB.
fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((cmyk.len() / 4) * 3);
    for px in cmyk.chunks_exact(4) {
        let k = 1.0 - f32::from(px[3]) / 255.0;
        for &channel in &px[..3] {
            rgb.push((255.0 * (1.0 - f32::from(channel) / 255.0) * k) as u8);
        }
    }
    rgb
}

/// Number of color components, for the spaces that can be re-encoded.
fn color_components(doc: &LopdfDocument, dict: &Dictionary) -> Option<u8> {
    let cs = dict.get(b"ColorSpace").ok()?;
    let cs = match cs {
        Object::Reference(r) => doc.get_object(*r).ok()?,
        other => other,
    };

    match cs {
        Object::Name(name) => components_for(name),
        Object::Array(arr) => match arr.first().and_then(|o| o.as_name().ok())? {
            b"ICCBased" => {
                let profile = arr.get(1)?.as_reference().ok()?;
                let n = doc.get_object(profile).ok()?.as_stream().ok()?.dict.get(b"N").ok()?;
                match n.as_i64().ok()? {
                    1 => Some(1),
                    3 => Some(3),
                    4 => Some(4),
                    _ => None,
                }
            }
            name => components_for(name),
        },
        _ => None,
    }
}

fn components_for(name: &[u8]) -> Option<u8> {
    match name {
        b"DeviceGray" | b"CalGray" | b"G" => Some(1),
        b"DeviceRGB" | b"CalRGB" | b"RGB" => Some(3),
        b"DeviceCMYK" | b"CMYK" => Some(4),
        _ => None,
    }
}

fn filter_names(dict: &Dictionary) -> Vec<String> {
    match dict.get(b"Filter") {
        Ok(Object::Name(n)) => vec![String::from_utf8_lossy(n).to_string()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .collect(),
        _ => Vec::new(),
    }
}

fn dict_u32(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key)
        .ok()
        .and_then(|o| o.as_i64().ok())
        .and_then(|v| u32::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn image_stream(extra: Dictionary, content: Vec<u8>) -> Stream {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 2,
            "Height" => 2,
            "BitsPerComponent" => 8,
        };
        for (k, v) in extra.iter() {
            dict.set(k.clone(), v.clone());
        }
        Stream::new(dict, content)
    }

    #[test]
    fn test_jpeg_passthrough() {
        let doc = LopdfDocument::with_version("1.5");
        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4];
        let stream = image_stream(dictionary! { "Filter" => "DCTDecode" }, jpeg.clone());
        let img = decode_image(&doc, &stream, 0).unwrap();
        assert_eq!(img.format, ImageFormat::Jpeg);
        assert_eq!(img.data, jpeg);
        assert_eq!(img.width, Some(2));
    }

    #[test]
    fn test_raw_rgb_becomes_png() {
        let doc = LopdfDocument::with_version("1.5");
        let stream = image_stream(dictionary! { "ColorSpace" => "DeviceRGB" }, vec![200u8; 12]);
        let img = decode_image(&doc, &stream, 0).unwrap();
        assert_eq!(img.format, ImageFormat::Png);
        assert_eq!(ImageFormat::detect(&img.data), Some(ImageFormat::Png));
    }

    #[test]
    fn test_short_samples_are_corrupt() {
        let doc = LopdfDocument::with_version("1.5");
        let stream = image_stream(dictionary! { "ColorSpace" => "DeviceRGB" }, vec![0u8; 5]);
        let err = decode_image(&doc, &stream, 3).unwrap_err();
        assert!(matches!(err, Error::CorruptImage { page: 3, .. }));
    }

    #[test]
    fn test_oversized_dimensions_are_corrupt() {
        let doc = LopdfDocument::with_version("1.5");
        let stream = image_stream(
            dictionary! {
                "ColorSpace" => "DeviceCMYK",
                "Width" => 4_294_967_295i64,
                "Height" => 4_294_967_295i64,
            },
            vec![0u8; 16],
        );
        let err = decode_image(&doc, &stream, 1).unwrap_err();
        assert!(matches!(err, Error::CorruptImage { page: 1, .. }));
    }

    #[test]
    fn test_cmyk_to_rgb() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0]), vec![255, 255, 255]);
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 255]), vec![0, 0, 0]);
    }
}
