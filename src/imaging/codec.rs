//! Decoding and encoding of in-memory media with the `image` crate.
//!
//! | Format | Encoder |
//! |---|---|
//! | JPEG | `JpegEncoder::new_with_quality` (alpha dropped) |
//! | AVIF | `AvifEncoder` (rav1e, speed 6) |
//! | WebP, GIF | `write_to` on an RGBA8 copy |
//! | PNG, TIFF, BMP | `write_to` |

use super::filter::FilterError;
use super::params::Quality;
use crate::paths;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Decode media and report the format it was stored in.
pub fn decode(media: &[u8]) -> Result<(DynamicImage, ImageFormat), FilterError> {
    let format = image::guess_format(media).map_err(|e| FilterError::Decode(e.to_string()))?;
    let img = image::load_from_memory_with_format(media, format)
        .map_err(|e| FilterError::Decode(e.to_string()))?;
    Ok((img, format))
}

/// Format implied by the extension of `file_path`, or `fallback`.
pub fn output_format(file_path: &str, fallback: ImageFormat) -> ImageFormat {
    paths::extension(file_path)
        .and_then(|ext| ImageFormat::from_extension(ext))
        .unwrap_or(fallback)
}

/// Encode an image in `format`.
pub fn encode(
    img: &DynamicImage,
    format: ImageFormat,
    quality: Quality,
) -> Result<Vec<u8>, FilterError> {
    let mut buf = Cursor::new(Vec::new());
    let result = match format {
        ImageFormat::Jpeg => {
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                &mut buf,
                quality.value() as u8,
            );
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)
        }
        ImageFormat::Avif => {
            let encoder = image::codecs::avif::AvifEncoder::new_with_speed_quality(
                &mut buf,
                6,
                quality.value() as u8,
            );
            img.write_with_encoder(encoder)
        }
        ImageFormat::WebP | ImageFormat::Gif => {
            DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut buf, format)
        }
        other => img.write_to(&mut buf, other),
    };
    result.map_err(|e| FilterError::Encode(format!("{:?}: {}", format, e)))?;
    Ok(buf.into_inner())
}

/// Re-encode a transformed image for the context's destination.
pub fn encode_for_path(
    img: &DynamicImage,
    file_path: &str,
    source_format: ImageFormat,
    quality: Quality,
) -> Result<Vec<u8>, FilterError> {
    encode(img, output_format(file_path, source_format), quality)
}
