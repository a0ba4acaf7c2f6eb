//! Remote upload collaborator.
//!
//! The synchronizer hands each saved artifact to an [`Uploader`] and treats
//! the call as opaque: it either comes back with the artifact marked
//! [`SyncState::Synced`] (possibly with a replaced payload pointing at remote
//! storage) or fails. Nothing here retries.
//!
//! [`SimulatedCloud`] stands in for a real storage provider: it sleeps for a
//! random latency and rejects a configurable fraction of uploads.

use crate::types::{Artifact, SyncState};
use async_trait::async_trait;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Upload rejected: {0}")]
    Rejected(String),
    #[error("Upload timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload `artifact` and return the remote copy with `sync_state = Synced`.
    async fn upload(&self, artifact: Artifact) -> Result<Artifact, UploadError>;
}

/// An uploader that pretends to talk to a storage bucket.
#[derive(Debug, Clone)]
pub struct SimulatedCloud {
    latency_ms: RangeInclusive<u64>,
    failure_rate: f64,
}

impl SimulatedCloud {
    /// A reversed latency range is flipped so it is never empty.
    pub fn new(latency_ms: RangeInclusive<u64>, failure_rate: f64) -> Self {
        let (a, b) = latency_ms.into_inner();
        Self {
            latency_ms: a.min(b)..=a.max(b),
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    /// No latency, never fails.
    pub fn instant() -> Self {
        Self::new(0..=0, 0.0)
    }

    fn roll(&self) -> (Duration, bool) {
        let mut rng = rand::thread_rng();
        let delay = rng.gen_range(self.latency_ms.clone());
        let rejected = self.failure_rate > 0.0 && rng.gen_bool(self.failure_rate);
        (Duration::from_millis(delay), rejected)
    }
}

impl Default for SimulatedCloud {
    fn default() -> Self {
        Self::new(500..=1500, 0.0)
    }
}

#[async_trait]
impl Uploader for SimulatedCloud {
    async fn upload(&self, artifact: Artifact) -> Result<Artifact, UploadError> {
        let (delay, rejected) = self.roll();
        debug!(id = %artifact.id, delay_ms = delay.as_millis() as u64, "uploading");
        tokio::time::sleep(delay).await;

        if rejected {
            return Err(UploadError::Rejected("simulated network failure".into()));
        }
        Ok(Artifact {
            sync_state: SyncState::Synced,
            ..artifact
        })
    }
}
