//! Shared types used by the transform engine, the synchronizer and the CLI.
//!
//! [`Artifact`] is the unit everything else moves around: generation produces
//! it, the editor forks it, the synchronizer persists it. It is serialized
//! with camelCase keys so the persisted collection reads like the rest of the
//! JSON the studio exchanges.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, unique artifact identifier.
///
/// Generated as `<unix millis>-<random hex>`. Only uniqueness matters; the
/// timestamp prefix is there for humans reading the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn generate() -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", now_millis(), &suffix[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ArtifactId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ArtifactId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Local-vs-remote persistence status of an artifact.
///
/// `SyncFailed` only lives in memory: it is what a caller sees after an
/// upload was rejected. On disk it collapses to `LocalOnly`, since nothing
/// retries failed uploads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncState {
    #[default]
    LocalOnly,
    Synced,
    SyncFailed,
}

impl SyncState {
    /// The state as it should be written to durable storage.
    pub fn persisted(self) -> Self {
        match self {
            SyncState::SyncFailed => SyncState::LocalOnly,
            other => other,
        }
    }
}

/// How a derived artifact came out of its parent.
///
/// The label is appended to the parent's description, e.g.
/// `"a red fox (Edited)"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    Edited,
    Upscaled,
}

impl Derivation {
    pub fn label(self) -> &'static str {
        match self {
            Derivation::Edited => "(Edited)",
            Derivation::Upscaled => "(Upscaled)",
        }
    }
}

/// A produced visual asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: ArtifactId,
    /// Self-contained encoded image, normally a `data:` URI.
    pub payload: String,
    /// Prompt, or prompt plus derivation labels.
    pub source_description: String,
    /// Model or backend that produced the image.
    pub producer_id: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    /// Declared aspect ratio tag such as `"16:9"`. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub sync_state: SyncState,
}

impl Artifact {
    /// Create a brand-new, local-only artifact with a fresh id.
    pub fn new(
        payload: impl Into<String>,
        source_description: impl Into<String>,
        producer_id: impl Into<String>,
        aspect_ratio: Option<String>,
    ) -> Self {
        Self {
            id: ArtifactId::generate(),
            payload: payload.into(),
            source_description: source_description.into(),
            producer_id: producer_id.into(),
            created_at: now_millis(),
            aspect_ratio,
            sync_state: SyncState::LocalOnly,
        }
    }

    /// Fork a new artifact from this one with a replaced payload.
    ///
    /// The child gets a fresh id and timestamp and starts local-only. The
    /// aspect ratio tag is copied as declared, not recomputed from the new
    /// payload.
    pub fn derive(&self, payload: impl Into<String>, derivation: Derivation) -> Self {
        Self {
            id: ArtifactId::generate(),
            payload: payload.into(),
            source_description: format!("{} {}", self.source_description, derivation.label()),
            producer_id: self.producer_id.clone(),
            created_at: now_millis(),
            aspect_ratio: self.aspect_ratio.clone(),
            sync_state: SyncState::LocalOnly,
        }
    }

    /// Copy of this artifact suitable for durable storage.
    pub fn for_storage(&self) -> Self {
        Self {
            sync_state: self.sync_state.persisted(),
            ..self.clone()
        }
    }
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
