//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: decode a payload, render a planned crop/scale/filter, and encode
//! the result back into a payload.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording `MockBackend` below.

use super::params::{Quality, RenderParams};
use crate::payload::{PayloadError, PayloadFormat};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Invalid payload: {0}")]
    Payload(#[from] PayloadError),
    #[error("Could not decode source image: {0}")]
    Decode(String),
    #[error("Render failed: {0}")]
    Render(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A decoded source raster plus the media type it was decoded from.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub image: DynamicImage,
    pub mime: String,
}

impl SourceImage {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }
}

/// Trait for image processing backends.
///
/// Every backend must implement all three operations so the editor and the
/// CLI stay backend-agnostic.
pub trait ImageBackend: Sync {
    /// Decode an inline payload into a raster.
    fn decode(&self, payload: &str) -> Result<SourceImage, BackendError>;

    /// Crop, resample and filter `source` as described by `params`.
    fn render(&self, source: &SourceImage, params: &RenderParams)
    -> Result<DynamicImage, BackendError>;

    /// Encode a raster into a `data:` URI payload.
    fn encode(
        &self,
        image: &DynamicImage,
        format: PayloadFormat,
        quality: Quality,
    ) -> Result<String, BackendError>;
}
