//! Turning generation-backend results into artifacts.
//!
//! The AI service itself is an injected [`ImageGenerator`]; its protocol,
//! authentication and rate limiting are its own business. This module only
//! validates requests, fans out one call per requested image, and wraps what
//! comes back as fresh local-only [`Artifact`]s.
//!
//! The text helpers live here too: prompt enhancement (which never fails, it
//! falls back to the prompt it was given), image-to-prompt description, and
//! text extraction from arbitrary media. Each picks the instruction it sends
//! so backends stay dumb pipes.
//!
//! [`SimulatedGenerator`] stands in for a real service. It paints gradient
//! placeholders of the requested shape and has no text model.

use crate::payload::{parse_data_uri, to_data_uri};
use crate::types::{Artifact, Derivation};
use async_trait::async_trait;
use futures::future::try_join_all;
use image::{DynamicImage, ImageEncoder, Rgba, RgbaImage};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Aspect ratio tags a request may ask for.
pub const ASPECT_RATIOS: &[&str] = &["1:1", "3:4", "4:3", "9:16", "16:9", "3:2", "2:3"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Generation backend failed: {0}")]
    Backend(String),
    #[error("The backend returned no images")]
    NoImages,
    #[error("The backend returned no text")]
    EmptyReply,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub aspect_ratio: String,
    /// Number of backend calls to issue concurrently.
    pub count: usize,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            aspect_ratio: "1:1".to_string(),
            count: 1,
        }
    }

    pub fn validate(&self, max_images: usize) -> Result<(), GenerationError> {
        if self.prompt.trim().is_empty() {
            return Err(GenerationError::InvalidRequest("prompt is empty".into()));
        }
        if self.model.trim().is_empty() {
            return Err(GenerationError::InvalidRequest("model is empty".into()));
        }
        if !ASPECT_RATIOS.contains(&self.aspect_ratio.as_str()) {
            return Err(GenerationError::InvalidRequest(format!(
                "unsupported aspect ratio {:?}",
                self.aspect_ratio
            )));
        }
        if self.count == 0 || self.count > max_images {
            return Err(GenerationError::InvalidRequest(format!(
                "count must be between 1 and {max_images}, got {}",
                self.count
            )));
        }
        Ok(())
    }
}

/// The external generation and editing service.
///
/// Every method returns encoded images as `data:` URI payloads.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Model id recorded as the producer of AI edits.
    fn editing_model(&self) -> &str;

    /// Zero or more images for one request.
    async fn produce_images(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<String>, GenerationError>;

    async fn edit_image(
        &self,
        source_payload: &str,
        instruction: &str,
    ) -> Result<String, GenerationError>;

    async fn upscale_image(
        &self,
        payload: &str,
        aspect_ratio: &str,
    ) -> Result<String, GenerationError>;

    /// Text-only completion of `instruction`.
    async fn rewrite_prompt(&self, instruction: &str) -> Result<String, GenerationError>;

    /// Text answer to `instruction` about the image in `payload`.
    async fn describe_media(
        &self,
        payload: &str,
        instruction: &str,
    ) -> Result<String, GenerationError>;

    /// Text answer to `instruction` about an arbitrary file.
    async fn read_text(
        &self,
        bytes: &[u8],
        mime: &str,
        instruction: &str,
    ) -> Result<String, GenerationError>;
}

/// What a described image should be turned into a prompt for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PromptKind {
    /// A text-to-image prompt recreating the image.
    #[default]
    Image,
    /// A video prompt that starts from the image as its first frame.
    Video,
}

impl PromptKind {
    pub fn instruction(self) -> &'static str {
        match self {
            PromptKind::Image => {
                "Study the attached image closely. Describe its subject, lighting, composition, \
                 style, colours and camera angle in detail, then write a finished text-to-image \
                 prompt that would recreate this exact style."
            }
            PromptKind::Video => {
                "Study the attached image and write a cinematic video prompt that starts from \
                 this frame. Describe the motion, camera movement, atmosphere and how events \
                 unfold."
            }
        }
    }
}

/// Broad class of a file handed to [`extract_text`], judged by media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
    Pdf,
    /// Images, plain text and anything else.
    Other,
}

impl MediaKind {
    pub fn for_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("audio/") {
            MediaKind::Audio
        } else if mime.starts_with("video/") {
            MediaKind::Video
        } else if mime == "application/pdf" {
            MediaKind::Pdf
        } else {
            MediaKind::Other
        }
    }

    pub fn instruction(self) -> &'static str {
        match self {
            MediaKind::Audio => "Transcribe this audio. Return only the transcription.",
            MediaKind::Video => {
                "Transcribe the speech in this video and include any prominent on-screen text. \
                 Return only the text."
            }
            MediaKind::Pdf => "Extract all text from this PDF document. Return only the text.",
            MediaKind::Other => "Extract all visible text from this content. Return only the text.",
        }
    }
}

/// Run `request.count` concurrent generations and wrap every returned image.
///
/// Results keep call order. Fails with [`GenerationError::NoImages`] if the
/// backend answered but produced nothing.
pub async fn generate_artifacts(
    generator: &impl ImageGenerator,
    request: &GenerationRequest,
    max_images: usize,
) -> Result<Vec<Artifact>, GenerationError> {
    request.validate(max_images)?;
    debug!(model = %request.model, count = request.count, "generating");

    let calls = (0..request.count).map(|_| generator.produce_images(request));
    let payloads: Vec<String> = try_join_all(calls).await?.into_iter().flatten().collect();
    if payloads.is_empty() {
        return Err(GenerationError::NoImages);
    }

    info!(images = payloads.len(), "generation finished");
    Ok(payloads
        .into_iter()
        .map(|payload| {
            Artifact::new(
                payload,
                request.prompt.clone(),
                request.model.clone(),
                Some(request.aspect_ratio.clone()),
            )
        })
        .collect())
}

/// Apply a natural-language edit. The result is a new artifact described by
/// the instruction; `source` is left as it was.
pub async fn edit_artifact(
    generator: &impl ImageGenerator,
    source: &Artifact,
    instruction: &str,
) -> Result<Artifact, GenerationError> {
    if instruction.trim().is_empty() {
        return Err(GenerationError::InvalidRequest("instruction is empty".into()));
    }
    let payload = generator.edit_image(&source.payload, instruction).await?;
    Ok(Artifact::new(
        payload,
        instruction,
        generator.editing_model(),
        source.aspect_ratio.clone(),
    ))
}

pub async fn upscale_artifact(
    generator: &impl ImageGenerator,
    source: &Artifact,
) -> Result<Artifact, GenerationError> {
    let aspect = source.aspect_ratio.as_deref().unwrap_or("1:1");
    let payload = generator.upscale_image(&source.payload, aspect).await?;
    Ok(source.derive(payload, Derivation::Upscaled))
}

fn enhancement_instruction(prompt: &str) -> String {
    format!(
        "Rewrite this image prompt to be more descriptive, artistic and detailed so it \
         produces a high-quality image. Return only the rewritten prompt.\n\nPrompt: \"{prompt}\""
    )
}

/// Ask the backend for a richer version of `prompt`.
///
/// Never fails: a backend error or an empty reply returns `prompt` unchanged,
/// and a blank prompt is returned without calling the backend.
pub async fn enhance_prompt(generator: &impl ImageGenerator, prompt: &str) -> String {
    if prompt.trim().is_empty() {
        return prompt.to_string();
    }
    match generator.rewrite_prompt(&enhancement_instruction(prompt)).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            debug!("empty enhancement, keeping prompt");
            prompt.to_string()
        }
        Err(error) => {
            warn!(%error, "prompt enhancement failed, keeping prompt");
            prompt.to_string()
        }
    }
}

/// Turn an image into a prompt of the given kind.
pub async fn describe_image(
    generator: &impl ImageGenerator,
    payload: &str,
    kind: PromptKind,
) -> Result<String, GenerationError> {
    if payload.is_empty() {
        return Err(GenerationError::InvalidRequest("image is empty".into()));
    }
    non_empty(generator.describe_media(payload, kind.instruction()).await?)
}

/// Pull the text out of any media: transcribe audio and video, read PDFs,
/// OCR everything else.
pub async fn extract_text(
    generator: &impl ImageGenerator,
    bytes: &[u8],
    mime: &str,
) -> Result<String, GenerationError> {
    if bytes.is_empty() {
        return Err(GenerationError::InvalidRequest("file is empty".into()));
    }
    let kind = MediaKind::for_mime(mime);
    debug!(%mime, ?kind, "extracting text");
    non_empty(generator.read_text(bytes, mime, kind.instruction()).await?)
}

fn non_empty(text: String) -> Result<String, GenerationError> {
    let text = text.trim();
    if text.is_empty() {
        Err(GenerationError::EmptyReply)
    } else {
        Ok(text.to_string())
    }
}

// =============================================================================
// Simulated backend
// =============================================================================

/// Offline [`ImageGenerator`] that paints placeholder gradients.
///
/// Images are PNGs whose long side is `long_side` pixels, shaped to the
/// requested aspect ratio. Edits return the source unchanged and upscales
/// double it. Text methods always fail, so [`enhance_prompt`] keeps the
/// user's prompt.
pub struct SimulatedGenerator {
    editing_model: String,
    long_side: u32,
}

impl SimulatedGenerator {
    pub fn new(editing_model: impl Into<String>, long_side: u32) -> Self {
        Self {
            editing_model: editing_model.into(),
            long_side: long_side.max(1),
        }
    }
}

/// Pixel size for `aspect_ratio` ("w:h") with the given long side.
/// Unparseable ratios give a square.
pub fn placeholder_dimensions(aspect_ratio: &str, long_side: u32) -> (u32, u32) {
    let parsed = aspect_ratio
        .split_once(':')
        .and_then(|(w, h)| Some((w.trim().parse::<u64>().ok()?, h.trim().parse::<u64>().ok()?)))
        .filter(|&(w, h)| w > 0 && h > 0);
    let Some((w, h)) = parsed else {
        return (long_side, long_side);
    };
    let long = u64::from(long_side);
    let short = |num: u64, den: u64| ((long * num + den / 2) / den).max(1) as u32;
    if w >= h {
        (long_side, short(h, w))
    } else {
        (short(w, h), long_side)
    }
}

fn encode_png(image: &RgbaImage) -> Result<String, GenerationError> {
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| GenerationError::Backend(e.to_string()))?;
    Ok(to_data_uri("image/png", &bytes))
}

fn gradient(width: u32, height: u32) -> RgbaImage {
    let mut rng = rand::thread_rng();
    let from: [u8; 3] = rng.r#gen();
    let to: [u8; 3] = rng.r#gen();
    let span = (width + height).saturating_sub(2).max(1);
    RgbaImage::from_fn(width, height, |x, y| {
        let t = (x + y) as f32 / span as f32;
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgba([mix(from[0], to[0]), mix(from[1], to[1]), mix(from[2], to[2]), 255])
    })
}

const NO_TEXT_MODEL: &str = "the simulated generator has no text model";

#[async_trait]
impl ImageGenerator for SimulatedGenerator {
    fn editing_model(&self) -> &str {
        &self.editing_model
    }

    async fn produce_images(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<String>, GenerationError> {
        let (width, height) = placeholder_dimensions(&request.aspect_ratio, self.long_side);
        Ok(vec![encode_png(&gradient(width, height))?])
    }

    async fn edit_image(
        &self,
        source_payload: &str,
        _instruction: &str,
    ) -> Result<String, GenerationError> {
        Ok(source_payload.to_string())
    }

    async fn upscale_image(
        &self,
        payload: &str,
        _aspect_ratio: &str,
    ) -> Result<String, GenerationError> {
        let data = parse_data_uri(payload).map_err(|e| GenerationError::Backend(e.to_string()))?;
        let source: DynamicImage = image::load_from_memory(&data.bytes)
            .map_err(|e| GenerationError::Backend(e.to_string()))?;
        let upscaled = source.resize_exact(
            source.width() * 2,
            source.height() * 2,
            image::imageops::FilterType::Lanczos3,
        );
        encode_png(&upscaled.to_rgba8())
    }

    async fn rewrite_prompt(&self, _instruction: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Backend(NO_TEXT_MODEL.into()))
    }

    async fn describe_media(
        &self,
        _payload: &str,
        _instruction: &str,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::Backend(NO_TEXT_MODEL.into()))
    }

    async fn read_text(
        &self,
        _bytes: &[u8],
        _mime: &str,
        _instruction: &str,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::Backend(NO_TEXT_MODEL.into()))
    }
}
