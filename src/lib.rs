//! # Artifact Studio
//!
//! Client-side core of an AI image studio: a deterministic transform engine
//! for generated images, and a synchronizer that keeps the saved collection
//! consistent between durable local storage and a remote upload service.
//!
//! # Architecture: Two Components
//!
//! ```text
//! generation ──> Artifact ──> editor (crop → scale → filter → encode) ──> Artifact
//!                                                                           │
//!                              store <── sync (save / remove / load) <──────┘
//!                                           │
//!                                           └──> cloud (upload, may fail)
//! ```
//!
//! - The **transform engine** ([`imaging`], driven by [`editor`]) is pure and
//!   synchronous. Editing never mutates its input: a save forks a new
//!   [`Artifact`](types::Artifact) annotated "(Edited)".
//! - The **synchronizer** ([`sync`]) owns the persisted collection. Saves are
//!   optimistic: a failed upload still saves locally, and a failed write
//!   still keeps the artifact for the session.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | `Artifact`, `ArtifactId`, `SyncState`, derivation labels |
//! | [`payload`] | `data:` URI parsing and output format selection |
//! | [`imaging`] | Crop/scale/filter math, colour matrices, the `ImageBackend` trait and its `image`-crate implementation |
//! | [`editor`] | Edit session over one artifact: preview re-render on every change, encode on save |
//! | [`store`] | Key-value persistence: in-memory and file-backed, with quotas |
//! | [`cloud`] | Upload collaborator trait and a simulated cloud |
//! | [`sync`] | Collection synchronizer: load, save, remove, events |
//! | [`generation`] | Generation backend contract, artifact construction, prompt and text helpers, offline generator |
//! | [`config`] | `studio.toml` loading, validation, merging |
//! | [`output`] | CLI output formatting and notification text |
//!
//! # Design Decisions
//!
//! ## One Composite Colour Matrix Per Filter
//!
//! Every filter preset is a chain of CSS-style colour operations (sepia,
//! saturate, hue-rotate, contrast, brightness). Chains are folded into a
//! single affine matrix up front and applied in one parallel pass over the
//! pixels with rayon, so intermediate stages are never clamped and the cost
//! of a filter does not depend on its length.
//!
//! ## Fork, Never Mutate
//!
//! Saving an edit, upscaling, and AI edits all produce a new artifact with a
//! new id. The original stays in the collection exactly as it was. Only the
//! synchronizer ever replaces an entry, and only with the synced copy of the
//! same id.
//!
//! ## Snapshot Swap Under a Short Lock
//!
//! The collection is an immutable `Arc<Vec<Artifact>>`. Mutations build a new
//! vector, write it, and swap it in while holding a synchronous lock that is
//! never held across the upload. Readers always see a complete snapshot and
//! concurrent saves of different ids never overwrite each other.
//!
//! ## Tombstones for Delete-During-Upload
//!
//! Removing an artifact while its upload is in flight would otherwise let
//! the upload's completion put it back. Saves are numbered per id; the
//! synchronizer records a tombstone at the latest number and only saves at
//! or below it discard their result. A save issued after the removal lands
//! normally.

pub mod cloud;
pub mod config;
pub mod editor;
pub mod generation;
pub mod imaging;
pub mod output;
pub mod payload;
pub mod store;
pub mod sync;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
