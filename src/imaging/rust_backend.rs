//! Pure Rust image backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG, WebP) | `payload::parse_data_uri` + `image::load_from_memory` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Resample | `DynamicImage::resize_exact` (Catmull-Rom by default) |
//! | Filter | one composite [`ColorMatrix`](super::filters::ColorMatrix) pass, parallelised with `rayon` |
//! | Encode → PNG | `DynamicImage::write_to` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (alpha flattened) |

use super::backend::{BackendError, ImageBackend, SourceImage};
use super::params::{Quality, RenderParams};
use crate::payload::{PayloadFormat, parse_data_uri, to_data_uri};
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use rayon::prelude::*;
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, payload: &str) -> Result<SourceImage, BackendError> {
        let uri = parse_data_uri(payload)?;
        let image = image::load_from_memory(&uri.bytes)
            .map_err(|e| BackendError::Decode(format!("{} payload: {}", uri.mime, e)))?;
        if image.width() == 0 || image.height() == 0 {
            return Err(BackendError::Decode("image has no pixels".into()));
        }
        Ok(SourceImage {
            image,
            mime: uri.mime,
        })
    }

    fn render(
        &self,
        source: &SourceImage,
        params: &RenderParams,
    ) -> Result<DynamicImage, BackendError> {
        let dims = source.dimensions();
        let region = params.region;
        if region.width == 0
            || region.height == 0
            || region.x as u64 + region.width as u64 > dims.width as u64
            || region.y as u64 + region.height as u64 > dims.height as u64
        {
            return Err(BackendError::Render(format!(
                "crop {}x{}+{}+{} outside {}x{} source",
                region.width, region.height, region.x, region.y, dims.width, dims.height
            )));
        }
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::Render("empty output canvas".into()));
        }

        let cropped = source
            .image
            .crop_imm(region.x, region.y, region.width, region.height);
        let resized = if (region.width, region.height) == (params.width, params.height) {
            cropped
        } else {
            cropped.resize_exact(params.width, params.height, params.resample.filter_type())
        };

        let Some(matrix) = params.filter else {
            return Ok(resized);
        };
        let mut rgba = resized.into_rgba8();
        let pixels: &mut [u8] = &mut rgba;
        pixels
            .par_chunks_exact_mut(4)
            .for_each(|px| matrix.apply_rgba8(px));
        Ok(DynamicImage::ImageRgba8(rgba))
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: PayloadFormat,
        quality: Quality,
    ) -> Result<String, BackendError> {
        let mut bytes = Vec::new();
        match format {
            PayloadFormat::Png => image
                .write_to(&mut Cursor::new(&mut bytes), format.image_format())
                .map_err(|e| BackendError::Encode(format!("PNG encode failed: {}", e)))?,
            PayloadFormat::Jpeg => {
                // JPEG has no alpha channel
                let flattened = DynamicImage::ImageRgb8(image.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.value() as u8);
                flattened
                    .write_with_encoder(encoder)
                    .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {}", e)))?;
            }
        }
        Ok(to_data_uri(format.mime(), &bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::calculations::{CropRegion, crop_region, output_dimensions};
    use crate::imaging::params::{CropPreset, FilterPreset, Resample, ScalePercent};
    use crate::payload::parse_data_uri;
    use crate::test_helpers::{jpeg_data_uri, png_data_uri};

    fn params(source: (u32, u32), crop: CropPreset, scale: u32, filter: FilterPreset) -> RenderParams {
        let region = crop_region(source, crop);
        let (width, height) = output_dimensions(&region, ScalePercent::new(scale));
        RenderParams {
            region,
            width,
            height,
            filter: filter.matrix(),
            resample: Resample::CatmullRom,
        }
    }

    #[test]
    fn decode_png_payload() {
        let backend = RustBackend::new();
        let source = backend.decode(&png_data_uri(64, 48)).unwrap();
        assert_eq!(source.image.width(), 64);
        assert_eq!(source.image.height(), 48);
        assert_eq!(source.mime, "image/png");
    }

    #[test]
    fn decode_jpeg_payload() {
        let backend = RustBackend::new();
        let source = backend.decode(&jpeg_data_uri(40, 30)).unwrap();
        assert_eq!((source.image.width(), source.image.height()), (40, 30));
        assert_eq!(source.mime, "image/jpeg");
    }

    #[test]
    fn decode_garbage_bytes_errors() {
        let backend = RustBackend::new();
        let result = backend.decode("data:image/png;base64,AAECAwQ=");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn decode_remote_url_errors() {
        let backend = RustBackend::new();
        let result = backend.decode("https://example.com/x.png");
        assert!(matches!(result, Err(BackendError::Payload(_))));
    }

    #[test]
    fn render_square_crop_at_half_scale() {
        let backend = RustBackend::new();
        let source = backend.decode(&png_data_uri(192, 108)).unwrap();

        let out = backend
            .render(
                &source,
                &params((192, 108), CropPreset::Square, 50, FilterPreset::None),
            )
            .unwrap();

        assert_eq!((out.width(), out.height()), (54, 54));
    }

    #[test]
    fn render_identity_keeps_pixels() {
        let backend = RustBackend::new();
        let source = backend.decode(&png_data_uri(16, 12)).unwrap();

        let out = backend
            .render(
                &source,
                &params((16, 12), CropPreset::None, 100, FilterPreset::None),
            )
            .unwrap();

        assert_eq!(out.to_rgba8(), source.image.to_rgba8());
    }

    #[test]
    fn render_grayscale_is_fully_desaturated() {
        let backend = RustBackend::new();
        let source = backend.decode(&png_data_uri(32, 32)).unwrap();

        let out = backend
            .render(
                &source,
                &params((32, 32), CropPreset::None, 100, FilterPreset::Grayscale),
            )
            .unwrap();

        for px in out.to_rgba8().pixels() {
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
        }
    }

    #[test]
    fn render_invert_negates_source() {
        let backend = RustBackend::new();
        let source = backend.decode(&png_data_uri(8, 8)).unwrap();

        let out = backend
            .render(
                &source,
                &params((8, 8), CropPreset::None, 100, FilterPreset::Invert),
            )
            .unwrap()
            .to_rgba8();
        let original = source.image.to_rgba8();

        for (a, b) in out.pixels().zip(original.pixels()) {
            assert_eq!(a[0], 255 - b[0]);
            assert_eq!(a[1], 255 - b[1]);
            assert_eq!(a[2], 255 - b[2]);
            assert_eq!(a[3], b[3]);
        }
    }

    #[test]
    fn render_every_filter_keeps_dimensions() {
        let backend = RustBackend::new();
        let source = backend.decode(&png_data_uri(30, 20)).unwrap();
        for filter in FilterPreset::ALL {
            let out = backend
                .render(&source, &params((30, 20), CropPreset::Portrait2x3, 80, filter))
                .unwrap();
            // 2:3 of 30x20 → 13x20, at 80% → 10x16
            assert_eq!((out.width(), out.height()), (10, 16), "{filter}");
        }
    }

    #[test]
    fn render_region_outside_source_errors() {
        let backend = RustBackend::new();
        let source = backend.decode(&png_data_uri(10, 10)).unwrap();
        let result = backend.render(
            &source,
            &RenderParams {
                region: CropRegion {
                    x: 5,
                    y: 0,
                    width: 10,
                    height: 10,
                },
                width: 10,
                height: 10,
                filter: None,
                resample: Resample::Triangle,
            },
        );
        assert!(matches!(result, Err(BackendError::Render(_))));
    }

    #[test]
    fn encode_png_roundtrips_dimensions() {
        let backend = RustBackend::new();
        let image = DynamicImage::new_rgba8(21, 13);
        let payload = backend
            .encode(&image, PayloadFormat::Png, Quality::default())
            .unwrap();

        assert!(payload.starts_with("data:image/png;base64,"));
        let decoded = backend.decode(&payload).unwrap();
        assert_eq!((decoded.image.width(), decoded.image.height()), (21, 13));
    }

    #[test]
    fn encode_jpeg_flattens_alpha() {
        let backend = RustBackend::new();
        let image = DynamicImage::new_rgba8(12, 9);
        let payload = backend
            .encode(&image, PayloadFormat::Jpeg, Quality::new(80))
            .unwrap();

        let uri = parse_data_uri(&payload).unwrap();
        assert_eq!(uri.mime, "image/jpeg");
        // JPEG SOI marker
        assert_eq!(&uri.bytes[..2], &[0xFF, 0xD8]);
    }
}
