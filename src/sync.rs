//! Collection synchronizer.
//!
//! Owns the single persisted list of saved artifacts and mediates every
//! addition and removal. A save is optimistic: it reports "saving", hands the
//! artifact to the [`Uploader`], and reconciles whatever comes back into the
//! list. A rejected or timed-out upload still leaves the artifact saved
//! locally.
//!
//! # Invariants
//!
//! - At most one entry per [`ArtifactId`].
//! - New entries are prepended (most recent first); replacing an existing
//!   entry keeps its position.
//! - `SyncFailed` is never written to the store.
//! - [`load`](Synchronizer::load), [`save`](Synchronizer::save) and
//!   [`remove`](Synchronizer::remove) never fail. Problems are reported as
//!   [`SyncEvent`]s and in the returned outcome.
//!
//! # Concurrency
//!
//! The collection is an `Arc<Vec<Artifact>>` snapshot behind a short
//! synchronous lock. Each mutation builds a new vector, persists it, and
//! swaps it in while holding the lock; the lock is never held across the
//! upload. Concurrent saves of different ids therefore never lose each
//! other's entries. Concurrent saves of the same id resolve as last
//! completion wins.
//!
//! Removing an id while saves for it are still uploading tombstones those
//! saves. When they complete they discard their result instead of putting
//! the entry back. Saves started after the removal are unaffected, and the
//! tombstone is cleared once no save for the id is in flight.

use crate::cloud::{UploadError, Uploader};
use crate::store::{KeyValueStore, StoreError};
use crate::types::{Artifact, ArtifactId, SyncState};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 64;

/// Status notifications for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// An upload has started.
    Saving { id: ArtifactId },
    /// The upload succeeded and the synced copy is in the collection.
    Synced { id: ArtifactId },
    /// The upload failed; the artifact is kept locally.
    LocalFallback { id: ArtifactId, reason: String },
    /// The store rejected a write. The in-memory collection is still current
    /// but may not survive a restart.
    PersistFailed { reason: String, quota: bool },
    /// An entry was deleted.
    Removed { id: ArtifactId },
    /// A save completed after its artifact was removed; the result was dropped.
    Discarded { id: ArtifactId },
    /// The persisted collection could not be read and was replaced by an
    /// empty one.
    LoadRecovered { reason: String },
}

/// What happened to the durable copy during an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    Written,
    /// The collection did not change, so nothing was written.
    Unchanged,
    Failed { reason: String, quota: bool },
}

impl Persistence {
    pub fn is_failed(&self) -> bool {
        matches!(self, Persistence::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    Synced,
    LocalFallback(UploadError),
    /// The artifact was removed while uploading.
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    /// The artifact as the caller should now see it: the synced copy on
    /// success, the original marked `SyncFailed` on upload failure.
    pub artifact: Artifact,
    pub status: SaveStatus,
    pub persistence: Persistence,
}

impl SaveOutcome {
    pub fn is_synced(&self) -> bool {
        self.status == SaveStatus::Synced
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    /// An entry with the id was present and is now gone.
    pub removed: bool,
    /// A save for the id was in flight and will be discarded.
    pub tombstoned: bool,
    pub persistence: Persistence,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadOutcome {
    pub count: usize,
    pub duplicates_dropped: usize,
    /// Why the persisted collection was discarded, if it was.
    pub recovered: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    artifacts: Arc<Vec<Artifact>>,
    in_flight: HashMap<ArtifactId, InFlight>,
}

/// Saves of one id that have started uploading but not yet finished.
#[derive(Debug, Default)]
struct InFlight {
    count: usize,
    last_seq: u64,
    /// Saves numbered at or below this were running when the id was removed.
    tombstone: Option<u64>,
}

impl State {
    fn position(&self, id: &ArtifactId) -> Option<usize> {
        self.artifacts.iter().position(|a| &a.id == id)
    }

    /// Register a save of `id` and return its sequence number.
    fn begin(&mut self, id: &ArtifactId) -> u64 {
        let entry = self.in_flight.entry(id.clone()).or_default();
        entry.count += 1;
        entry.last_seq += 1;
        entry.last_seq
    }

    /// Tombstone every save of `id` currently in flight. Returns false if
    /// there were none.
    fn tombstone(&mut self, id: &ArtifactId) -> bool {
        match self.in_flight.get_mut(id) {
            Some(entry) => {
                entry.tombstone = Some(entry.last_seq);
                true
            }
            None => false,
        }
    }

    /// Mark save `seq` of `id` finished. Returns true if it was tombstoned.
    fn finish(&mut self, id: &ArtifactId, seq: u64) -> bool {
        let Some(entry) = self.in_flight.get_mut(id) else {
            return false;
        };
        let discarded = entry.tombstone.is_some_and(|cutoff| seq <= cutoff);
        entry.count = entry.count.saturating_sub(1);
        if entry.count == 0 {
            self.in_flight.remove(id);
        }
        discarded
    }
}

pub struct Synchronizer<S, U> {
    store: S,
    uploader: U,
    key: String,
    upload_timeout: Duration,
    state: Mutex<State>,
    events: broadcast::Sender<SyncEvent>,
}

impl<S: KeyValueStore, U: Uploader> Synchronizer<S, U> {
    /// Create a synchronizer with an empty collection. Call
    /// [`load`](Self::load) to read the persisted one.
    pub fn new(store: S, uploader: U, key: impl Into<String>, upload_timeout: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            uploader,
            key: key.into(),
            upload_timeout,
            state: Mutex::new(State::default()),
            events,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Current collection snapshot, most recent first.
    pub fn artifacts(&self) -> Arc<Vec<Artifact>> {
        Arc::clone(&self.lock().artifacts)
    }

    pub fn get(&self, id: &ArtifactId) -> Option<Artifact> {
        self.lock().artifacts.iter().find(|a| &a.id == id).cloned()
    }

    /// Replace the in-memory collection with the persisted one.
    ///
    /// Unreadable or corrupt data yields an empty collection and a
    /// [`SyncEvent::LoadRecovered`]. Duplicate ids keep their first entry and
    /// `SyncFailed` collapses to `LocalOnly`.
    pub fn load(&self) -> LoadOutcome {
        let (artifacts, recovered) = match self.read_persisted() {
            Ok(artifacts) => (artifacts, None),
            Err(reason) => {
                warn!(key = %self.key, %reason, "persisted collection unreadable, starting empty");
                (Vec::new(), Some(reason))
            }
        };

        let total = artifacts.len();
        let mut seen = HashSet::new();
        let artifacts: Vec<Artifact> = artifacts
            .into_iter()
            .filter(|a| seen.insert(a.id.clone()))
            .map(|a| a.for_storage())
            .collect();
        let duplicates_dropped = total - artifacts.len();
        if duplicates_dropped > 0 {
            warn!(duplicates_dropped, "dropped duplicate ids from persisted collection");
        }

        let outcome = LoadOutcome {
            count: artifacts.len(),
            duplicates_dropped,
            recovered,
        };
        self.lock().artifacts = Arc::new(artifacts);
        info!(count = outcome.count, "loaded collection");

        if let Some(reason) = &outcome.recovered {
            self.emit(SyncEvent::LoadRecovered {
                reason: reason.clone(),
            });
        }
        outcome
    }

    fn read_persisted(&self) -> Result<Vec<Artifact>, String> {
        match self.store.get(&self.key) {
            Ok(None) => Ok(Vec::new()),
            Ok(Some(blob)) => serde_json::from_str(&blob).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    /// Upload `artifact` and reconcile the result into the collection.
    pub async fn save(&self, artifact: Artifact) -> SaveOutcome {
        let id = artifact.id.clone();
        let seq = self.lock().begin(&id);
        self.emit(SyncEvent::Saving { id: id.clone() });
        debug!(%id, "saving");

        let upload = self.uploader.upload(artifact.clone());
        let result = match tokio::time::timeout(self.upload_timeout, upload).await {
            Ok(result) => result,
            Err(_) => Err(UploadError::Timeout(self.upload_timeout)),
        };

        let (outcome, events) = {
            let mut state = self.lock();
            if state.finish(&id, seq) {
                info!(%id, "artifact removed during upload, discarding result");
                let outcome = SaveOutcome {
                    artifact,
                    status: SaveStatus::Discarded,
                    persistence: Persistence::Unchanged,
                };
                (outcome, vec![SyncEvent::Discarded { id }])
            } else {
                match result {
                    Ok(synced) => self.apply_synced(&mut state, id, synced),
                    Err(e) => self.apply_fallback(&mut state, artifact, e),
                }
            }
        };

        for event in events {
            self.emit(event);
        }
        outcome
    }

    fn apply_synced(
        &self,
        state: &mut State,
        id: ArtifactId,
        synced: Artifact,
    ) -> (SaveOutcome, Vec<SyncEvent>) {
        let synced = Artifact {
            id: id.clone(),
            sync_state: SyncState::Synced,
            ..synced
        };
        let mut next = state.artifacts.as_ref().clone();
        match state.position(&id) {
            Some(pos) => next[pos] = synced.clone(),
            None => next.insert(0, synced.clone()),
        }
        let persistence = self.commit(state, next);
        info!(%id, "saved and synced");

        let mut events = vec![SyncEvent::Synced { id }];
        events.extend(persist_event(&persistence));
        let outcome = SaveOutcome {
            artifact: synced,
            status: SaveStatus::Synced,
            persistence,
        };
        (outcome, events)
    }

    fn apply_fallback(
        &self,
        state: &mut State,
        artifact: Artifact,
        error: UploadError,
    ) -> (SaveOutcome, Vec<SyncEvent>) {
        let id = artifact.id.clone();
        warn!(%id, %error, "upload failed, keeping local copy");

        let persistence = if state.position(&id).is_some() {
            Persistence::Unchanged
        } else {
            let local = Artifact {
                sync_state: SyncState::LocalOnly,
                ..artifact.clone()
            };
            let mut next = state.artifacts.as_ref().clone();
            next.insert(0, local);
            self.commit(state, next)
        };

        let mut events = vec![SyncEvent::LocalFallback {
            id,
            reason: error.to_string(),
        }];
        events.extend(persist_event(&persistence));
        let outcome = SaveOutcome {
            artifact: Artifact {
                sync_state: SyncState::SyncFailed,
                ..artifact
            },
            status: SaveStatus::LocalFallback(error),
            persistence,
        };
        (outcome, events)
    }

    /// Delete the entry with `id`. Removing an unknown id is a no-op.
    pub fn remove(&self, id: &ArtifactId) -> RemoveOutcome {
        let outcome = {
            let mut state = self.lock();
            let tombstoned = state.tombstone(id);
            match state.position(id) {
                Some(pos) => {
                    let mut next = state.artifacts.as_ref().clone();
                    next.remove(pos);
                    RemoveOutcome {
                        removed: true,
                        tombstoned,
                        persistence: self.commit(&mut state, next),
                    }
                }
                None => RemoveOutcome {
                    removed: false,
                    tombstoned,
                    persistence: Persistence::Unchanged,
                },
            }
        };

        if outcome.removed || outcome.tombstoned {
            info!(%id, tombstoned = outcome.tombstoned, "removed artifact");
            self.emit(SyncEvent::Removed { id: id.clone() });
        } else {
            debug!(%id, "remove of unknown id ignored");
        }
        if let Some(event) = persist_event(&outcome.persistence) {
            self.emit(event);
        }
        outcome
    }

    /// Persist `next` and swap it in as the current snapshot.
    ///
    /// The swap happens even if the write fails: memory stays authoritative
    /// for the session.
    fn commit(&self, state: &mut State, next: Vec<Artifact>) -> Persistence {
        let persistence = match self.write(&next) {
            Ok(()) => Persistence::Written,
            Err(e) => {
                warn!(key = %self.key, error = %e, "could not persist collection");
                Persistence::Failed {
                    reason: e.to_string(),
                    quota: e.is_quota(),
                }
            }
        };
        state.artifacts = Arc::new(next);
        persistence
    }

    fn write(&self, artifacts: &[Artifact]) -> Result<(), StoreError> {
        let stored: Vec<Artifact> = artifacts.iter().map(Artifact::for_storage).collect();
        let blob = serde_json::to_string(&stored)
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?;
        self.store.set(&self.key, &blob)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine
        self.events.send(event).ok();
    }
}

fn persist_event(persistence: &Persistence) -> Option<SyncEvent> {
    match persistence {
        Persistence::Failed { reason, quota } => Some(SyncEvent::PersistFailed {
            reason: reason.clone(),
            quota: *quota,
        }),
        _ => None,
    }
}
