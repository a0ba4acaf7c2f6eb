//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which plans a render from a [`TransformSpec`]) and the
//! [`backend`](super::backend) (which does the actual pixel work). This
//! separation allows swapping backends (e.g. for testing with a mock) without
//! changing operation logic.
//!
//! ## Types
//!
//! - [`CropPreset`]: center-crop target: none, square, 16:9, 9:16, 3:2, 2:3.
//! - [`FilterPreset`]: named colour effect applied as one composite pass.
//! - [`ScalePercent`]: output scale, 10–100. Clamped on construction.
//! - [`TransformSpec`]: one edit session's crop + filter + scale.
//! - [`Quality`]: JPEG quality (1–100, default 92). Clamped on construction.
//! - [`Resample`]: resampling kernel used when scaling.
//! - [`RenderParams`]: full specification for one render: crop rectangle, output size, filter, kernel.

use super::calculations::CropRegion;
use super::filters::ColorMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParsePresetError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

/// Aspect ratio to center-crop to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CropPreset {
    #[default]
    None,
    Square,
    Landscape16x9,
    Portrait9x16,
    Landscape3x2,
    Portrait2x3,
}

impl CropPreset {
    pub const ALL: [CropPreset; 6] = [
        CropPreset::None,
        CropPreset::Square,
        CropPreset::Landscape16x9,
        CropPreset::Portrait9x16,
        CropPreset::Landscape3x2,
        CropPreset::Portrait2x3,
    ];

    /// Target ratio as `(width, height)`, or `None` to keep the full frame.
    pub fn ratio(self) -> Option<(u32, u32)> {
        match self {
            CropPreset::None => None,
            CropPreset::Square => Some((1, 1)),
            CropPreset::Landscape16x9 => Some((16, 9)),
            CropPreset::Portrait9x16 => Some((9, 16)),
            CropPreset::Landscape3x2 => Some((3, 2)),
            CropPreset::Portrait2x3 => Some((2, 3)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CropPreset::None => "none",
            CropPreset::Square => "square",
            CropPreset::Landscape16x9 => "16:9",
            CropPreset::Portrait9x16 => "9:16",
            CropPreset::Landscape3x2 => "3:2",
            CropPreset::Portrait2x3 => "2:3",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CropPreset::None => "Keep original dimensions",
            CropPreset::Square => "1:1, good for avatars",
            CropPreset::Landscape16x9 => "Cinematic widescreen",
            CropPreset::Portrait9x16 => "Mobile stories format",
            CropPreset::Landscape3x2 => "Classic photography landscape",
            CropPreset::Portrait2x3 => "Classic photography portrait",
        }
    }
}

impl fmt::Display for CropPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CropPreset {
    type Err = ParsePresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "original" => Ok(CropPreset::None),
            "square" | "1:1" => Ok(CropPreset::Square),
            "16:9" | "landscape" => Ok(CropPreset::Landscape16x9),
            "9:16" | "portrait" => Ok(CropPreset::Portrait9x16),
            "3:2" => Ok(CropPreset::Landscape3x2),
            "2:3" => Ok(CropPreset::Portrait2x3),
            _ => Err(ParsePresetError {
                kind: "crop preset",
                value: s.to_string(),
                expected: "none, square, 16:9, 9:16, 3:2, 2:3",
            }),
        }
    }
}

/// Named colour effect. Each maps to a fixed composite
/// [`ColorMatrix`](super::filters::ColorMatrix); nothing is user-tunable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterPreset {
    #[default]
    None,
    Grayscale,
    Sepia,
    Warm,
    Cool,
    Vintage,
    Invert,
}

impl FilterPreset {
    pub const ALL: [FilterPreset; 7] = [
        FilterPreset::None,
        FilterPreset::Grayscale,
        FilterPreset::Sepia,
        FilterPreset::Warm,
        FilterPreset::Cool,
        FilterPreset::Vintage,
        FilterPreset::Invert,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterPreset::None => "none",
            FilterPreset::Grayscale => "grayscale",
            FilterPreset::Sepia => "sepia",
            FilterPreset::Warm => "warm",
            FilterPreset::Cool => "cool",
            FilterPreset::Vintage => "vintage",
            FilterPreset::Invert => "invert",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FilterPreset::None => "No filter",
            FilterPreset::Grayscale => "Black and white",
            FilterPreset::Sepia => "Old-photo brown tone",
            FilterPreset::Warm => "Golden, saturated tones",
            FilterPreset::Cool => "Shifted hues, muted saturation",
            FilterPreset::Vintage => "Faded contrast-heavy look",
            FilterPreset::Invert => "Negative colours",
        }
    }

    /// The composite colour matrix for this preset, or `None` for identity.
    pub fn matrix(self) -> Option<ColorMatrix> {
        match self {
            FilterPreset::None => None,
            FilterPreset::Grayscale => Some(ColorMatrix::grayscale(1.0)),
            FilterPreset::Sepia => Some(ColorMatrix::sepia(1.0)),
            FilterPreset::Warm => Some(ColorMatrix::sepia(0.4).then(&ColorMatrix::saturate(1.5))),
            FilterPreset::Cool => {
                Some(ColorMatrix::hue_rotate(180.0).then(&ColorMatrix::saturate(0.8)))
            }
            FilterPreset::Vintage => Some(
                ColorMatrix::sepia(0.4)
                    .then(&ColorMatrix::contrast(1.2))
                    .then(&ColorMatrix::brightness(0.9)),
            ),
            FilterPreset::Invert => Some(ColorMatrix::invert(1.0)),
        }
    }
}

impl fmt::Display for FilterPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterPreset {
    type Err = ParsePresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(FilterPreset::None),
            "grayscale" | "greyscale" => Ok(FilterPreset::Grayscale),
            "sepia" => Ok(FilterPreset::Sepia),
            "warm" => Ok(FilterPreset::Warm),
            "cool" => Ok(FilterPreset::Cool),
            "vintage" => Ok(FilterPreset::Vintage),
            "invert" => Ok(FilterPreset::Invert),
            _ => Err(ParsePresetError {
                kind: "filter preset",
                value: s.to_string(),
                expected: "none, grayscale, sepia, warm, cool, vintage, invert",
            }),
        }
    }
}

/// Output scale as a percentage of the crop size (10-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalePercent(u32);

impl ScalePercent {
    pub const MIN: u32 = 10;
    pub const MAX: u32 = 100;

    pub fn new(value: u32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for ScalePercent {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl FromStr for ScalePercent {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_end_matches('%').parse().map(Self::new)
    }
}

/// Crop, filter and scale for one edit session. Default is the identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformSpec {
    pub crop: CropPreset,
    pub filter: FilterPreset,
    pub scale: ScalePercent,
}

impl TransformSpec {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(92)
    }
}

/// Resampling kernel used when the crop is scaled to the output size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resample {
    /// Bilinear.
    Triangle,
    /// Bicubic.
    #[default]
    CatmullRom,
    Lanczos3,
}

impl Resample {
    pub fn filter_type(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            Resample::Triangle => FilterType::Triangle,
            Resample::CatmullRom => FilterType::CatmullRom,
            Resample::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Parameters for one render: crop `region` of the source, scale it to
/// `width`×`height`, then apply `filter` if present.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub region: CropRegion,
    pub width: u32,
    pub height: u32,
    pub filter: Option<ColorMatrix>,
    pub resample: Resample,
}
