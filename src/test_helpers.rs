//! Shared test utilities for the studio test suite.
//!
//! Provides synthetic image payloads and artifact builders so tests never
//! depend on fixture files.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let art = artifact_with_payload("a fox", png_data_uri(64, 48));
//! let backend = RustBackend::new();
//! let source = backend.decode(&art.payload).unwrap();
//! ```

use crate::payload::to_data_uri;
use crate::types::{Artifact, ArtifactId};
use image::{ImageEncoder, RgbaImage};

// =========================================================================
// Synthetic payloads
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
            255,
        ])
    })
}

/// A colourful RGBA gradient encoded as a PNG data URI.
pub fn png_data_uri(width: u32, height: u32) -> String {
    let img = gradient(width, height);
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
    to_data_uri("image/png", &bytes)
}

/// The same gradient encoded as a JPEG data URI.
pub fn jpeg_data_uri(width: u32, height: u32) -> String {
    let img = image::DynamicImage::ImageRgba8(gradient(width, height)).to_rgb8();
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    to_data_uri("image/jpeg", &bytes)
}

// =========================================================================
// Artifact builders
// =========================================================================

/// A local-only artifact with a tiny placeholder payload.
pub fn sample_artifact(description: &str) -> Artifact {
    artifact_with_payload(description, "data:image/png;base64,AA==".to_string())
}

pub fn artifact_with_payload(description: &str, payload: String) -> Artifact {
    Artifact::new(payload, description, "test-model", Some("1:1".to_string()))
}

/// A sample artifact with a fixed id, for dedupe and removal tests.
pub fn artifact_with_id(id: &str, description: &str) -> Artifact {
    Artifact {
        id: ArtifactId::from(id),
        ..sample_artifact(description)
    }
}

/// Ids of a collection snapshot, in order.
pub fn ids(artifacts: &[Artifact]) -> Vec<&str> {
    artifacts.iter().map(|a| a.id.as_str()).collect()
}
