//! High-level image operations.
//!
//! These functions combine calculations with backend execution. They take a
//! [`TransformSpec`], compute [`RenderParams`], and call the backend.

use super::backend::{BackendError, Dimensions, ImageBackend, SourceImage};
use super::calculations::{crop_region, output_dimensions};
use super::params::{Quality, RenderParams, Resample, TransformSpec};
use crate::payload::PayloadFormat;
use crate::types::{Artifact, Derivation};
use image::DynamicImage;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Encoder and resampler settings shared by every render in a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub quality: Quality,
    pub resample: Resample,
}

/// Plan a render without executing it.
///
/// Useful for testing parameter generation.
pub fn plan_render(source: Dimensions, spec: &TransformSpec, resample: Resample) -> RenderParams {
    let region = crop_region((source.width, source.height), spec.crop);
    let (width, height) = output_dimensions(&region, spec.scale);
    RenderParams {
        region,
        width,
        height,
        filter: spec.filter.matrix(),
        resample,
    }
}

/// Crop, scale and filter a decoded source.
pub fn render(
    backend: &impl ImageBackend,
    source: &SourceImage,
    spec: &TransformSpec,
    resample: Resample,
) -> Result<DynamicImage> {
    let params = plan_render(source.dimensions(), spec, resample);
    backend.render(source, &params)
}

/// Output encoding for a render.
///
/// Re-deriving from an existing payload keeps PNG as PNG and turns everything
/// else into JPEG; brand-new output is PNG.
pub fn output_format(source_payload: Option<&str>) -> PayloadFormat {
    source_payload
        .map(PayloadFormat::for_rederive)
        .unwrap_or(PayloadFormat::Png)
}

/// Encode a rendered image and fork it from `original` as an edited artifact.
pub fn export_edited(
    backend: &impl ImageBackend,
    original: &Artifact,
    rendered: &DynamicImage,
    quality: Quality,
) -> Result<Artifact> {
    let format = output_format(Some(&original.payload));
    let payload = backend.encode(rendered, format, quality)?;
    Ok(original.derive(payload, Derivation::Edited))
}

/// Decode, render and export in one step.
///
/// Equivalent to opening an edit session, applying `spec` and saving.
pub fn transform_artifact(
    backend: &impl ImageBackend,
    original: &Artifact,
    spec: &TransformSpec,
    options: RenderOptions,
) -> Result<Artifact> {
    let source = backend.decode(&original.payload)?;
    let rendered = render(backend, &source, spec, options.resample)?;
    export_edited(backend, original, &rendered, options.quality)
}
