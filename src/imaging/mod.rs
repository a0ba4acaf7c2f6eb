//! Image transform engine, pure Rust, built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` on a base64 data URI |
//! | **Crop** | center-crop-to-ratio, `DynamicImage::crop_imm` |
//! | **Scale** | `resize_exact` with a bicubic (Catmull-Rom) kernel |
//! | **Filter** | one composite colour matrix per preset |
//! | **Encode** | PNG stays PNG, everything else JPEG |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop and output-size math (unit testable)
//! - **Parameters**: Presets, scale and the per-session [`TransformSpec`]
//! - **Filters**: Composite [`ColorMatrix`] construction
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod filters;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, SourceImage};
pub use calculations::{CropRegion, crop_region, output_dimensions};
pub use filters::ColorMatrix;
pub use operations::{
    RenderOptions, export_edited, output_format, plan_render, render, transform_artifact,
};
pub use params::{
    CropPreset, FilterPreset, ParsePresetError, Quality, RenderParams, Resample, ScalePercent,
    TransformSpec,
};
pub use rust_backend::RustBackend;
