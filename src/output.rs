//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every artifact is shown by what it depicts first (its description, with a
//! positional index) and by its machine identity second, as indented context
//! lines. Sync events render as the short notification text a user would see
//! in a toast.
//!
//! ## List
//!
//! ```text
//! Collection (2 artifacts)
//! 001 a red fox (Edited)
//!     Id: 1760000000000-3f2a9c1b7d4e
//!     Producer: gemini-2.5-flash-image, 1:1, synced
//!     Created: 2026-10-18 09:12 UTC
//! 002 a lighthouse at dusk
//!     ...
//! ```
//!
//! ## Edit
//!
//! ```text
//! 1920x1080 -> 540x540
//!     Crop: square
//!     Filter: grayscale
//!     Scale: 50%
//!     Output: fox-square.png
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `String` or `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::{CropPreset, Dimensions, FilterPreset, TransformSpec};
use crate::sync::{LoadOutcome, Persistence, RemoveOutcome, SaveOutcome, SaveStatus, SyncEvent};
use crate::types::{Artifact, SyncState};
use chrono::DateTime;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}

fn sync_label(state: SyncState) -> &'static str {
    match state {
        SyncState::LocalOnly => "local only",
        SyncState::Synced => "synced",
        SyncState::SyncFailed => "sync failed",
    }
}

fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

// ============================================================================
// Notifications
// ============================================================================

/// The user-facing notification text for a synchronizer event.
pub fn format_sync_event(event: &SyncEvent) -> String {
    match event {
        SyncEvent::Saving { .. } => "Saving to cloud...".to_string(),
        SyncEvent::Synced { .. } => "Saved to collection & cloud".to_string(),
        SyncEvent::LocalFallback { .. } => "Cloud upload failed. Saved locally.".to_string(),
        SyncEvent::PersistFailed { quota: true, .. } => {
            "Storage full! Saved for this session only.".to_string()
        }
        SyncEvent::PersistFailed { reason, .. } => {
            format!("Could not write to storage ({reason}). Saved for this session only.")
        }
        SyncEvent::Removed { .. } => "Image permanently deleted.".to_string(),
        SyncEvent::Discarded { .. } => "Upload finished after delete; result discarded.".to_string(),
        SyncEvent::LoadRecovered { .. } => {
            "Saved collection was unreadable and has been reset.".to_string()
        }
    }
}

pub fn print_sync_event(event: &SyncEvent) {
    println!("{}", format_sync_event(event));
}

// ============================================================================
// Collection
// ============================================================================

/// Format the collection, most recent first.
pub fn format_collection(artifacts: &[Artifact]) -> Vec<String> {
    let mut lines = Vec::new();
    if artifacts.is_empty() {
        lines.push("Collection is empty".to_string());
        return lines;
    }

    let noun = if artifacts.len() == 1 {
        "artifact"
    } else {
        "artifacts"
    };
    lines.push(format!("Collection ({} {})", artifacts.len(), noun));
    for (i, art) in artifacts.iter().enumerate() {
        lines.push(format!(
            "{} {}",
            format_index(i + 1),
            truncate_desc(&art.source_description, 60)
        ));
        lines.extend(artifact_context(art, 1));
    }
    lines
}

fn artifact_context(art: &Artifact, depth: usize) -> Vec<String> {
    let pad = indent(depth);
    let mut producer = art.producer_id.clone();
    if let Some(ratio) = &art.aspect_ratio {
        producer.push_str(", ");
        producer.push_str(ratio);
    }
    vec![
        format!("{}Id: {}", pad, art.id),
        format!("{}Producer: {}, {}", pad, producer, sync_label(art.sync_state)),
        format!("{}Created: {}", pad, format_timestamp(art.created_at)),
    ]
}

pub fn print_collection(artifacts: &[Artifact]) {
    for line in format_collection(artifacts) {
        println!("{}", line);
    }
}

// ============================================================================
// Synchronizer outcomes
// ============================================================================

fn persistence_line(persistence: &Persistence) -> Option<String> {
    match persistence {
        Persistence::Failed { reason, .. } => Some(format!(
            "{}Warning: not written to storage ({reason}); will not survive a restart",
            indent(1)
        )),
        _ => None,
    }
}

pub fn format_save_outcome(outcome: &SaveOutcome) -> Vec<String> {
    let art = &outcome.artifact;
    let status = match &outcome.status {
        SaveStatus::Synced => "Saved to collection & cloud".to_string(),
        SaveStatus::LocalFallback(e) => format!("Cloud upload failed ({e}). Saved locally."),
        SaveStatus::Discarded => "Deleted during upload; not saved".to_string(),
    };
    let mut lines = vec![
        status,
        format!("{}{}", indent(1), truncate_desc(&art.source_description, 60)),
        format!("{}Id: {}", indent(1), art.id),
    ];
    lines.extend(persistence_line(&outcome.persistence));
    lines
}

pub fn print_save_outcome(outcome: &SaveOutcome) {
    for line in format_save_outcome(outcome) {
        println!("{}", line);
    }
}

pub fn format_remove_outcome(id: &str, outcome: &RemoveOutcome) -> Vec<String> {
    let mut lines = if outcome.removed || outcome.tombstoned {
        vec![format!("Image permanently deleted: {id}")]
    } else {
        vec![format!("No artifact with id {id}; nothing to delete")]
    };
    lines.extend(persistence_line(&outcome.persistence));
    lines
}

pub fn print_remove_outcome(id: &str, outcome: &RemoveOutcome) {
    for line in format_remove_outcome(id, outcome) {
        println!("{}", line);
    }
}

/// Only anything worth telling the user; a clean load prints nothing.
pub fn format_load_outcome(outcome: &LoadOutcome) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(reason) = &outcome.recovered {
        lines.push(format!(
            "Saved collection was unreadable and has been reset ({reason})"
        ));
    }
    if outcome.duplicates_dropped > 0 {
        lines.push(format!(
            "Dropped {} duplicate entries from the saved collection",
            outcome.duplicates_dropped
        ));
    }
    lines
}

pub fn print_load_outcome(outcome: &LoadOutcome) {
    for line in format_load_outcome(outcome) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// Editing
// ============================================================================

/// Summarize one transform: source size, output size, and the edit state.
pub fn format_edit_summary(
    source: Dimensions,
    output: Dimensions,
    spec: &TransformSpec,
    target: Option<&Path>,
) -> Vec<String> {
    let pad = indent(1);
    let mut lines = vec![
        format!(
            "{}x{} -> {}x{}",
            source.width, source.height, output.width, output.height
        ),
        format!("{}Crop: {}", pad, spec.crop),
        format!("{}Filter: {}", pad, spec.filter),
        format!("{}Scale: {}%", pad, spec.scale.value()),
    ];
    if let Some(path) = target {
        lines.push(format!("{}Output: {}", pad, path.display()));
    }
    lines
}

pub fn print_edit_summary(
    source: Dimensions,
    output: Dimensions,
    spec: &TransformSpec,
    target: Option<&Path>,
) {
    for line in format_edit_summary(source, output, spec, target) {
        println!("{}", line);
    }
}

/// Every crop and filter preset with a one-line description.
pub fn format_presets() -> Vec<String> {
    let mut lines = vec!["Crop".to_string()];
    for crop in CropPreset::ALL {
        lines.push(format!("{}{:<8} {}", indent(1), crop.name(), crop.description()));
    }
    lines.push(String::new());
    lines.push("Filters".to_string());
    for filter in FilterPreset::ALL {
        lines.push(format!(
            "{}{:<10} {}",
            indent(1),
            filter.name(),
            filter.description()
        ));
    }
    lines
}

pub fn print_presets() {
    for line in format_presets() {
        println!("{}", line);
    }
}
