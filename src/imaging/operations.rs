//! Built-in filters.
//!
//! | Category / type | Parameters |
//! |---|---|
//! | `Transform/Resize` | `width`, `height`, `mode` (max, crop, pad, stretch), `padcolor`, `quality` |
//! | `Transform/Crop` | `left`, `top`, `width`, `height`, `quality` |
//! | `Transform/Format` | `format` (jpg, png, gif, webp, tiff, bmp, avif), `quality` |
//!
//! Each filter decodes the context media, transforms it and re-encodes it in
//! the format implied by the destination extension. Nothing is written to
//! the context until the new bytes are ready, so a failing filter leaves the
//! previous image in place.

use super::calculations::{
    calculate_cover_crop, calculate_fit_dimensions, center_offset, clamp_crop, resolve_box,
};
use super::codec;
use super::filter::{FilterContext, FilterDescriptor, FilterError};
use super::params::{PadColor, Quality, ResizeMode};
use crate::paths;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

pub const TRANSFORM: &str = "Transform";

/// Scale the image into a box. See [`ResizeMode`] for the fitting rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResizeFilter;

/// Cut a rectangle out of the image.
#[derive(Debug, Clone, Copy, Default)]
pub struct CropFilter;

/// Convert to another encoding and change the destination extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatFilter;

/// Resize a decoded image according to `mode`.
///
/// Returns `None` when the mode leaves the image unchanged (`max` with a
/// source that already fits).
pub fn resize_image(
    img: &DynamicImage,
    bounds: (u32, u32),
    mode: ResizeMode,
    pad_color: PadColor,
) -> Option<DynamicImage> {
    let source = (img.width(), img.height());
    match mode {
        ResizeMode::Max => {
            if source.0 <= bounds.0 && source.1 <= bounds.1 {
                return None;
            }
            let (w, h) = calculate_fit_dimensions(source, bounds);
            Some(img.resize_exact(w, h, FilterType::Lanczos3))
        }
        ResizeMode::Crop => {
            let region = calculate_cover_crop(source, bounds);
            let cropped = img.crop_imm(region.x, region.y, region.width, region.height);
            Some(cropped.resize_exact(bounds.0, bounds.1, FilterType::Lanczos3))
        }
        ResizeMode::Stretch => Some(img.resize_exact(bounds.0, bounds.1, FilterType::Lanczos3)),
        ResizeMode::Pad => {
            let (w, h) = calculate_fit_dimensions(source, bounds);
            let fitted = img.resize_exact(w, h, FilterType::Lanczos3).to_rgba8();
            let [r, g, b] = pad_color.0;
            let mut canvas = RgbaImage::from_pixel(bounds.0, bounds.1, Rgba([r, g, b, 255]));
            let (x, y) = center_offset(bounds, (w, h));
            image::imageops::overlay(&mut canvas, &fitted, x as i64, y as i64);
            Some(DynamicImage::ImageRgba8(canvas))
        }
    }
}

impl FilterDescriptor for ResizeFilter {
    fn category(&self) -> &str {
        TRANSFORM
    }

    fn filter_type(&self) -> &str {
        "Resize"
    }

    fn description(&self) -> &str {
        "Resize to a width and/or height (max, crop, pad, stretch)"
    }

    fn apply(&self, context: &mut FilterContext) -> Result<(), FilterError> {
        let state = &context.state;
        let width = state.get_dimension("width")?;
        let height = state.get_dimension("height")?;
        let mode = match state.get("mode") {
            Some(raw) => raw
                .parse::<ResizeMode>()
                .map_err(|_| FilterError::invalid("mode", raw))?,
            None => ResizeMode::default(),
        };
        let pad_color = match state.get("padcolor") {
            Some(raw) => raw
                .parse::<PadColor>()
                .map_err(|_| FilterError::invalid("padcolor", raw))?,
            None => PadColor::default(),
        };
        let quality = Quality::from_state(state)?;

        let (img, source_format) = codec::decode(&context.media)?;
        let Some(bounds) = resolve_box((img.width(), img.height()), width, height) else {
            return Ok(());
        };
        let Some(resized) = resize_image(&img, bounds, mode, pad_color) else {
            return Ok(());
        };

        context.media =
            codec::encode_for_path(&resized, &context.file_path, source_format, quality)?;
        Ok(())
    }
}

impl FilterDescriptor for CropFilter {
    fn category(&self) -> &str {
        TRANSFORM
    }

    fn filter_type(&self) -> &str {
        "Crop"
    }

    fn description(&self) -> &str {
        "Crop a rectangle given by left, top, width and height"
    }

    fn apply(&self, context: &mut FilterContext) -> Result<(), FilterError> {
        let state = &context.state;
        let left = state.get_parsed::<u32>("left")?.unwrap_or(0);
        let top = state.get_parsed::<u32>("top")?.unwrap_or(0);
        let width = state.get_dimension("width")?;
        let height = state.get_dimension("height")?;
        let quality = Quality::from_state(state)?;

        let (img, source_format) = codec::decode(&context.media)?;
        let rect = clamp_crop((img.width(), img.height()), left, top, width, height)
            .ok_or_else(|| FilterError::invalid("left/top", &format!("{left},{top}")))?;
        let cropped = img.crop_imm(rect.x, rect.y, rect.width, rect.height);

        context.media =
            codec::encode_for_path(&cropped, &context.file_path, source_format, quality)?;
        Ok(())
    }
}

impl FilterDescriptor for FormatFilter {
    fn category(&self) -> &str {
        TRANSFORM
    }

    fn filter_type(&self) -> &str {
        "Format"
    }

    fn description(&self) -> &str {
        "Convert to jpg, png, gif, webp, tiff, bmp or avif"
    }

    fn apply(&self, context: &mut FilterContext) -> Result<(), FilterError> {
        let state = &context.state;
        let Some(raw) = state.get("format") else {
            return Err(FilterError::invalid("format", ""));
        };
        let extension = raw.trim_start_matches('.').to_ascii_lowercase();
        let format = ImageFormat::from_extension(&extension)
            .filter(|f| f.writing_enabled())
            .ok_or_else(|| FilterError::invalid("format", raw))?;
        let quality = Quality::from_state(state)?;

        let (img, _) = codec::decode(&context.media)?;
        context.media = codec::encode(&img, format, quality)?;
        context.file_path = paths::with_extension(&context.file_path, &extension);
        Ok(())
    }
}
