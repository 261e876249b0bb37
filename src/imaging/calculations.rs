//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Largest width or height a filter may produce.
pub const MAX_DIMENSION: u32 = 4096;

/// Clamp a requested dimension to `1..=MAX_DIMENSION`.
pub fn clamp_dim(v: u32) -> u32 {
    v.clamp(1, MAX_DIMENSION)
}

/// Complete a requested box where one side may be unconstrained.
///
/// The missing side is derived from the source aspect ratio. Returns `None`
/// when neither side is given.
///
/// # Examples
/// ```
/// # use image_profiles::imaging::calculations::resolve_box;
/// assert_eq!(resolve_box((1600, 1200), Some(400), None), Some((400, 300)));
/// assert_eq!(resolve_box((1600, 1200), None, Some(600)), Some((800, 600)));
/// ```
pub fn resolve_box(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> Option<(u32, u32)> {
    let (src_w, src_h) = (source.0.max(1) as f64, source.1.max(1) as f64);
    match (width, height) {
        (None, None) => None,
        (Some(w), Some(h)) => Some((clamp_dim(w), clamp_dim(h))),
        (Some(w), None) => {
            let w = clamp_dim(w);
            Some((w, clamp_dim((w as f64 * src_h / src_w).round() as u32)))
        }
        (None, Some(h)) => {
            let h = clamp_dim(h);
            Some((clamp_dim((h as f64 * src_w / src_h).round() as u32), h))
        }
    }
}

/// Largest size with the source aspect ratio that fits inside `bounds`.
///
/// May enlarge; callers that must not upscale compare against the source.
pub fn calculate_fit_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = (source.0.max(1) as f64, source.1.max(1) as f64);
    let scale = (bounds.0 as f64 / src_w).min(bounds.1 as f64 / src_h);
    (
        ((src_w * scale).round() as u32).max(1),
        ((src_h * scale).round() as u32).max(1),
    )
}

/// Centered region of the source with the target aspect ratio (crop before
/// resize).
///
/// The region never exceeds the source, so scaling it to the target touches
/// at most `target` pixels whatever the two aspect ratios are.
pub fn calculate_cover_crop(source: (u32, u32), target: (u32, u32)) -> CropRect {
    let (src_w, src_h) = (source.0.max(1), source.1.max(1));
    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = target.0.max(1) as f64 / target.1.max(1) as f64;

    let (width, height) = if src_aspect > tgt_aspect {
        // Source is wider: keep the full height, trim the sides
        let w = (src_h as f64 * tgt_aspect).round() as u32;
        (w.clamp(1, src_w), src_h)
    } else {
        // Source is taller: keep the full width, trim top and bottom
        let h = (src_w as f64 / tgt_aspect).round() as u32;
        (src_w, h.clamp(1, src_h))
    };
    let (x, y) = center_offset((src_w, src_h), (width, height));
    CropRect { x, y, width, height }
}

/// Offset that centers `inner` within `outer`.
pub fn center_offset(outer: (u32, u32), inner: (u32, u32)) -> (u32, u32) {
    (
        outer.0.saturating_sub(inner.0) / 2,
        outer.1.saturating_sub(inner.1) / 2,
    )
}

/// A crop rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Clamp a requested crop to the source bounds.
///
/// Unconstrained width/height extend to the right/bottom edge. Returns `None`
/// when the origin lies outside the image.
pub fn clamp_crop(
    source: (u32, u32),
    left: u32,
    top: u32,
    width: Option<u32>,
    height: Option<u32>,
) -> Option<CropRect> {
    let (src_w, src_h) = source;
    if left >= src_w || top >= src_h {
        return None;
    }
    let max_w = src_w - left;
    let max_h = src_h - top;
    Some(CropRect {
        x: left,
        y: top,
        width: width.map_or(max_w, |w| w.min(max_w)),
        height: height.map_or(max_h, |h| h.min(max_h)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_dim_bounds() {
        assert_eq!(clamp_dim(0), 1);
        assert_eq!(clamp_dim(100), 100);
        assert_eq!(clamp_dim(4096), 4096);
        assert_eq!(clamp_dim(u32::MAX), MAX_DIMENSION);
    }

    #[test]
    fn resolve_box_both_sides() {
        assert_eq!(resolve_box((1600, 1200), Some(200), Some(200)), Some((200, 200)));
    }

    #[test]
    fn resolve_box_derives_missing_side() {
        assert_eq!(resolve_box((1600, 1200), Some(400), None), Some((400, 300)));
        assert_eq!(resolve_box((1600, 1200), None, Some(600)), Some((800, 600)));
    }

    #[test]
    fn resolve_box_unconstrained() {
        assert_eq!(resolve_box((1600, 1200), None, None), None);
    }

    #[test]
    fn resolve_box_clamps_huge_requests() {
        assert_eq!(
            resolve_box((100, 100), Some(100_000), None),
            Some((MAX_DIMENSION, MAX_DIMENSION))
        );
    }

    #[test]
    fn fit_landscape_into_square() {
        assert_eq!(calculate_fit_dimensions((1600, 1200), (200, 200)), (200, 150));
    }

    #[test]
    fn fit_portrait_into_square() {
        assert_eq!(calculate_fit_dimensions((1200, 1600), (200, 200)), (150, 200));
    }

    #[test]
    fn fit_can_enlarge() {
        assert_eq!(calculate_fit_dimensions((100, 50), (400, 400)), (400, 200));
    }

    #[test]
    fn cover_crop_landscape_source_portrait_target() {
        // 3:2 landscape into 4:5 portrait → full height, sides trimmed
        assert_eq!(
            calculate_cover_crop((3000, 2000), (400, 500)),
            CropRect { x: 700, y: 0, width: 1600, height: 2000 }
        );
    }

    #[test]
    fn cover_crop_portrait_source_landscape_target() {
        assert_eq!(
            calculate_cover_crop((2000, 3000), (400, 200)),
            CropRect { x: 0, y: 1000, width: 2000, height: 1000 }
        );
    }

    #[test]
    fn cover_crop_extreme_aspect_stays_inside_source() {
        assert_eq!(
            calculate_cover_crop((20000, 20), (1000, 1000)),
            CropRect { x: 9990, y: 0, width: 20, height: 20 }
        );
        assert_eq!(
            calculate_cover_crop((1, 30000), (4096, 1)),
            CropRect { x: 0, y: 15000, width: 1, height: 1 }
        );
    }

    #[test]
    fn center_offset_cases() {
        assert_eq!(center_offset((200, 200), (200, 150)), (0, 25));
        assert_eq!(center_offset((100, 100), (120, 120)), (0, 0));
    }

    #[test]
    fn crop_inside_bounds() {
        assert_eq!(
            clamp_crop((800, 600), 10, 20, Some(100), Some(50)),
            Some(CropRect { x: 10, y: 20, width: 100, height: 50 })
        );
    }

    #[test]
    fn crop_clamped_to_edges() {
        assert_eq!(
            clamp_crop((800, 600), 700, 500, Some(300), None),
            Some(CropRect { x: 700, y: 500, width: 100, height: 100 })
        );
    }

    #[test]
    fn crop_origin_outside_image() {
        assert_eq!(clamp_crop((800, 600), 800, 0, None, None), None);
        assert_eq!(clamp_crop((800, 600), 0, 601, None, None), None);
    }
}
