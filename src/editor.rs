//! Edit sessions over the transform engine.
//!
//! An [`EditSession`] holds one decoded source artifact and the three pieces
//! of mutable edit state: crop, filter and scale. Every change re-renders the
//! preview (crop, scale, filter) but never encodes; encoding happens only in
//! [`EditSession::save`], which forks a new artifact and leaves the original
//! untouched.
//!
//! A failed render leaves the session exactly as it was before the change,
//! so a bad edit never takes the preview down with it.

use crate::imaging::{
    BackendError, CropPreset, Dimensions, FilterPreset, ImageBackend, RenderOptions, ScalePercent,
    SourceImage, TransformSpec, export_edited, render,
};
use crate::types::Artifact;
use image::DynamicImage;
use tracing::debug;

pub struct EditSession<'a, B: ImageBackend> {
    backend: &'a B,
    original: Artifact,
    source: SourceImage,
    options: RenderOptions,
    spec: TransformSpec,
    preview: DynamicImage,
}

impl<'a, B: ImageBackend> EditSession<'a, B> {
    /// Decode `original` and render its identity preview.
    ///
    /// Fails without producing a session if the payload cannot be decoded
    /// or the first render fails.
    pub fn open(
        backend: &'a B,
        original: Artifact,
        options: RenderOptions,
    ) -> Result<Self, BackendError> {
        let source = backend.decode(&original.payload)?;
        let spec = TransformSpec::default();
        let preview = render(backend, &source, &spec, options.resample)?;
        debug!(
            id = %original.id,
            width = source.image.width(),
            height = source.image.height(),
            "opened edit session"
        );
        Ok(Self {
            backend,
            original,
            source,
            options,
            spec,
            preview,
        })
    }

    pub fn original(&self) -> &Artifact {
        &self.original
    }

    pub fn source_dimensions(&self) -> Dimensions {
        self.source.dimensions()
    }

    pub fn preview_dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.preview.width(),
            height: self.preview.height(),
        }
    }

    pub fn spec(&self) -> TransformSpec {
        self.spec
    }

    /// The most recent successful render.
    pub fn preview(&self) -> &DynamicImage {
        &self.preview
    }

    pub fn set_crop(&mut self, crop: CropPreset) -> Result<(), BackendError> {
        self.apply(TransformSpec { crop, ..self.spec })
    }

    pub fn set_filter(&mut self, filter: FilterPreset) -> Result<(), BackendError> {
        self.apply(TransformSpec { filter, ..self.spec })
    }

    /// Out-of-range values are clamped to 10–100.
    pub fn set_scale(&mut self, percent: u32) -> Result<(), BackendError> {
        self.apply(TransformSpec {
            scale: ScalePercent::new(percent),
            ..self.spec
        })
    }

    /// Revert crop, filter and scale to the identity in one step.
    pub fn reset(&mut self) -> Result<(), BackendError> {
        self.apply(TransformSpec::default())
    }

    /// Replace the whole edit state and re-render.
    ///
    /// A no-op when `next` equals the current state.
    pub fn apply(&mut self, next: TransformSpec) -> Result<(), BackendError> {
        if next == self.spec {
            return Ok(());
        }
        let preview = render(self.backend, &self.source, &next, self.options.resample)?;
        self.spec = next;
        self.preview = preview;
        Ok(())
    }

    /// Encode the current preview as a new artifact forked from the original.
    pub fn save(&self) -> Result<Artifact, BackendError> {
        let edited = export_edited(
            self.backend,
            &self.original,
            &self.preview,
            self.options.quality,
        )?;
        debug!(from = %self.original.id, to = %edited.id, "saved edit");
        Ok(edited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::{artifact_with_payload, png_data_uri, sample_artifact};

    fn open(backend: &MockBackend) -> EditSession<'_, MockBackend> {
        EditSession::open(backend, sample_artifact("fox"), RenderOptions::default()).unwrap()
    }

    #[test]
    fn open_renders_identity_preview() {
        let backend = MockBackend::with_dimensions(1920, 1080);
        let session = open(&backend);

        assert!(session.spec().is_identity());
        assert_eq!(
            (session.preview().width(), session.preview().height()),
            (1920, 1080)
        );
        assert_eq!(backend.renders(), 1);
    }

    #[test]
    fn open_decode_failure_has_no_session() {
        let backend = MockBackend::failing_decode();
        let result = EditSession::open(&backend, sample_artifact("x"), RenderOptions::default());
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn every_change_rerenders_without_encoding() {
        let backend = MockBackend::with_dimensions(1920, 1080);
        let mut session = open(&backend);

        session.set_crop(CropPreset::Square).unwrap();
        session.set_scale(50).unwrap();
        session.set_filter(FilterPreset::Grayscale).unwrap();

        assert_eq!(backend.renders(), 4);
        assert_eq!(
            session.source_dimensions(),
            Dimensions {
                width: 1920,
                height: 1080
            }
        );
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::Encode { .. }))
        );
        assert_eq!(
            (session.preview().width(), session.preview().height()),
            (540, 540)
        );
    }

    #[test]
    fn unchanged_setting_skips_render() {
        let backend = MockBackend::with_dimensions(100, 100);
        let mut session = open(&backend);

        session.set_crop(CropPreset::None).unwrap();
        session.set_scale(100).unwrap();

        assert_eq!(backend.renders(), 1);
    }

    #[test]
    fn scale_is_clamped() {
        let backend = MockBackend::with_dimensions(100, 100);
        let mut session = open(&backend);

        session.set_scale(5).unwrap();
        assert_eq!(session.spec().scale.value(), 10);
        assert_eq!(
            (session.preview().width(), session.preview().height()),
            (10, 10)
        );
    }

    #[test]
    fn reset_restores_default_state() {
        let backend = MockBackend::with_dimensions(800, 600);
        let mut session = open(&backend);

        session.set_crop(CropPreset::Portrait9x16).unwrap();
        session.set_filter(FilterPreset::Vintage).unwrap();
        session.set_scale(33).unwrap();
        session.set_crop(CropPreset::Landscape3x2).unwrap();
        session.reset().unwrap();

        assert_eq!(session.spec(), TransformSpec::default());
        assert_eq!(
            (session.preview().width(), session.preview().height()),
            (800, 600)
        );

        // Resetting again changes nothing and renders nothing
        let renders = backend.renders();
        session.reset().unwrap();
        assert_eq!(session.spec(), TransformSpec::default());
        assert_eq!(backend.renders(), renders);
    }

    #[test]
    fn failed_render_keeps_previous_state() {
        let backend = MockBackend::with_dimensions(400, 200);
        let mut session = open(&backend);
        session.set_crop(CropPreset::Square).unwrap();

        backend.set_fail_render(true);
        let result = session.set_filter(FilterPreset::Invert);

        assert!(matches!(result, Err(BackendError::Render(_))));
        assert_eq!(session.spec().filter, FilterPreset::None);
        assert_eq!(session.spec().crop, CropPreset::Square);
        assert_eq!(
            (session.preview().width(), session.preview().height()),
            (200, 200)
        );

        backend.set_fail_render(false);
        session.set_filter(FilterPreset::Invert).unwrap();
        assert_eq!(session.spec().filter, FilterPreset::Invert);
    }

    #[test]
    fn save_encodes_once_and_forks() {
        let backend = MockBackend::with_dimensions(1920, 1080);
        let mut session = open(&backend);
        session.set_crop(CropPreset::Square).unwrap();
        session.set_scale(50).unwrap();

        let edited = session.save().unwrap();

        assert_ne!(edited.id, session.original().id);
        assert_eq!(edited.source_description, "fox (Edited)");
        let encodes: Vec<_> = backend
            .get_operations()
            .into_iter()
            .filter(|op| matches!(op, RecordedOp::Encode { .. }))
            .collect();
        assert_eq!(encodes.len(), 1);
        assert!(matches!(
            encodes[0],
            RecordedOp::Encode {
                width: 540,
                height: 540,
                ..
            }
        ));
    }

    #[test]
    fn real_backend_session_end_to_end() {
        let backend = RustBackend::new();
        let original = artifact_with_payload("harbor", png_data_uri(192, 108));
        let mut session =
            EditSession::open(&backend, original.clone(), RenderOptions::default()).unwrap();

        session.set_crop(CropPreset::Square).unwrap();
        session.set_scale(50).unwrap();
        session.set_filter(FilterPreset::Grayscale).unwrap();
        let edited = session.save().unwrap();

        assert!(edited.payload.starts_with("data:image/png;base64,"));
        let decoded = backend.decode(&edited.payload).unwrap();
        assert_eq!((decoded.image.width(), decoded.image.height()), (54, 54));
        for px in decoded.image.to_rgba8().pixels() {
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
        }
    }
}
