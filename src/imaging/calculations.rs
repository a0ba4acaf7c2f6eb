//! Pure calculation functions for crop regions and output dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{CropPreset, ScalePercent};

/// Sub-rectangle of the source image, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub fn full(source: (u32, u32)) -> Self {
        Self {
            x: 0,
            y: 0,
            width: source.0,
            height: source.1,
        }
    }
}

/// Calculate the center crop that fits `preset`'s ratio inside `source`.
///
/// Never letterboxes: the crop always fills the target ratio, keeping the
/// full extent of whichever axis is relatively shorter and trimming the other
/// equally from both sides. Side lengths are rounded to the nearest pixel,
/// offsets are `(full - kept) / 2` rounded down.
///
/// # Examples
/// ```
/// # use artifact_studio::imaging::{CropPreset, CropRegion, crop_region};
/// // 1920x1080 → square keeps full height, trims 420px each side
/// assert_eq!(
///     crop_region((1920, 1080), CropPreset::Square),
///     CropRegion { x: 420, y: 0, width: 1080, height: 1080 }
/// );
/// ```
pub fn crop_region(source: (u32, u32), preset: CropPreset) -> CropRegion {
    let (src_w, src_h) = source;
    let Some((ratio_w, ratio_h)) = preset.ratio() else {
        return CropRegion::full(source);
    };

    if src_w as u64 * ratio_h as u64 > src_h as u64 * ratio_w as u64 {
        // Source is wider than target: keep full height, trim width
        let width = scaled_side(src_h, ratio_w, ratio_h).min(src_w);
        CropRegion {
            x: (src_w - width) / 2,
            y: 0,
            width,
            height: src_h,
        }
    } else {
        // Source is taller (or equal): keep full width, trim height
        let height = scaled_side(src_w, ratio_h, ratio_w).min(src_h);
        CropRegion {
            x: 0,
            y: (src_h - height) / 2,
            width: src_w,
            height,
        }
    }
}

/// `round(side * num / den)`, at least 1.
fn scaled_side(side: u32, num: u32, den: u32) -> u32 {
    let side = side as f64 * num as f64 / den as f64;
    (side.round() as u32).max(1)
}

/// Calculate output pixel dimensions for a crop at `scale`.
///
/// Each side is `round(side * scale / 100)`, never less than 1px, so the same
/// inputs always produce the same canvas.
///
/// # Examples
/// ```
/// # use artifact_studio::imaging::{CropRegion, ScalePercent, output_dimensions};
/// let region = CropRegion { x: 420, y: 0, width: 1080, height: 1080 };
/// assert_eq!(output_dimensions(&region, ScalePercent::new(50)), (540, 540));
/// ```
pub fn output_dimensions(region: &CropRegion, scale: ScalePercent) -> (u32, u32) {
    let scale = scale.value() as u64;
    let side = |v: u32| (((v as u64 * scale + 50) / 100) as u32).max(1);
    (side(region.width), side(region.height))
}
