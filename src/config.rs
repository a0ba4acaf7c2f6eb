//! Studio configuration module.
//!
//! Handles loading, validating, and merging `studio.toml`. Stock defaults are
//! serialized to a TOML table and the user file is merged over it key by key,
//! so a config file only needs the values it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! dir = ".studio"                  # Durable store directory
//! collection_key = "studio_collection"
//! # quota_bytes = 5242880          # Cap on total stored bytes
//!
//! [sync]
//! upload_timeout_secs = 10         # 1-120
//!
//! [cloud]
//! latency_ms = [500, 1500]         # Simulated upload latency range
//! failure_rate = 0.0               # Probability a simulated upload is rejected
//!
//! [editor]
//! jpeg_quality = 92                # 1-100
//! resample = "catmull-rom"         # "triangle" | "catmull-rom" | "lanczos3"
//!
//! [generation]
//! default_model = "gemini-2.5-flash-image"
//! max_images = 4                   # Upper bound on images per request
//! placeholder_size = 512           # Long side of simulated images, pixels
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::generation::{GenerationRequest, SimulatedGenerator};
use crate::imaging::{Quality, RenderOptions, Resample};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Studio configuration loaded from `studio.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudioConfig {
    /// Where and how the collection is persisted.
    pub storage: StorageConfig,
    /// Synchronizer settings.
    pub sync: SyncConfig,
    /// Simulated upload collaborator.
    pub cloud: CloudConfig,
    /// Transform engine encoder and resampler.
    pub editor: EditorConfig,
    pub generation: GenerationConfig,
}

impl StudioConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.collection_key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.collection_key must not be empty".into(),
            ));
        }
        if !(1..=120).contains(&self.sync.upload_timeout_secs) {
            return Err(ConfigError::Validation(
                "sync.upload_timeout_secs must be 1-120".into(),
            ));
        }
        let [min, max] = self.cloud.latency_ms;
        if min > max {
            return Err(ConfigError::Validation(
                "cloud.latency_ms must be [min, max] with min <= max".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.cloud.failure_rate) {
            return Err(ConfigError::Validation(
                "cloud.failure_rate must be 0.0-1.0".into(),
            ));
        }
        if !(1..=100).contains(&self.editor.jpeg_quality) {
            return Err(ConfigError::Validation(
                "editor.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.generation.max_images == 0 {
            return Err(ConfigError::Validation(
                "generation.max_images must be at least 1".into(),
            ));
        }
        if !(16..=4096).contains(&self.generation.placeholder_size) {
            return Err(ConfigError::Validation(
                "generation.placeholder_size must be 16-4096".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding one JSON file per store key.
    pub dir: String,
    /// Key the collection is stored under.
    pub collection_key: String,
    /// Optional cap on total stored bytes. Writes past it fail with a quota
    /// error and the collection stays in memory only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: ".studio".to_string(),
            collection_key: "studio_collection".to_string(),
            quota_bytes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Upper bound on a single upload before it counts as failed.
    pub upload_timeout_secs: u64,
}

impl SyncConfig {
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            upload_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CloudConfig {
    /// Simulated latency range as `[min, max]` milliseconds.
    pub latency_ms: [u64; 2],
    /// Probability (0.0-1.0) that a simulated upload is rejected.
    pub failure_rate: f64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            latency_ms: [500, 1500],
            failure_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub jpeg_quality: u32,
    /// Resampling kernel used when scaling.
    pub resample: Resample,
}

impl EditorConfig {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            quality: Quality::new(self.jpeg_quality),
            resample: self.resample,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 92,
            resample: Resample::CatmullRom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Model recorded as the producer when a request names none.
    pub default_model: String,
    /// Upper bound on images per generation request.
    pub max_images: usize,
    /// Long side, in pixels, of images painted by the simulated generator.
    pub placeholder_size: u32,
}

impl GenerationConfig {
    /// A single-image request for `prompt`, falling back to `default_model`.
    pub fn request(&self, prompt: impl Into<String>, model: Option<&str>) -> GenerationRequest {
        GenerationRequest::new(prompt, model.unwrap_or(&self.default_model))
    }

    /// Offline generator painting `placeholder_size` images.
    pub fn simulated_generator(&self) -> SimulatedGenerator {
        SimulatedGenerator::new(self.default_model.clone(), self.placeholder_size)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_model: "gemini-2.5-flash-image".to_string(),
            max_images: 4,
            placeholder_size: 512,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(StudioConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge `overlay` onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<StudioConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: StudioConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a `studio.toml` file.
///
/// A missing file yields the stock defaults. A file that exists must parse,
/// contain only known keys, and validate.
pub fn load_config(path: &Path) -> Result<StudioConfig, ConfigError> {
    if !path.exists() {
        return resolve_config(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(value))
}

/// Returns a fully-commented stock `studio.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Artifact Studio Configuration
# =============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Directory holding the persisted collection (one JSON file per key).
dir = ".studio"

# Key the saved collection is stored under.
collection_key = "studio_collection"

# Cap on total stored bytes. When a save would exceed it, the artifact is kept
# for this session only.
# quota_bytes = 5242880

# ---------------------------------------------------------------------------
# Synchronizer
# ---------------------------------------------------------------------------
[sync]
# Seconds before an upload is abandoned and the artifact saved locally (1-120).
upload_timeout_secs = 10

# ---------------------------------------------------------------------------
# Simulated cloud storage
# ---------------------------------------------------------------------------
[cloud]
# Upload latency range in milliseconds, as [min, max].
latency_ms = [500, 1500]

# Probability (0.0-1.0) that an upload is rejected.
failure_rate = 0.0

# ---------------------------------------------------------------------------
# Editor
# ---------------------------------------------------------------------------
[editor]
# JPEG quality used when re-encoding non-PNG sources (1-100).
jpeg_quality = 92

# Resampling kernel for scaling: "triangle" (bilinear), "catmull-rom"
# (bicubic) or "lanczos3".
resample = "catmull-rom"

# ---------------------------------------------------------------------------
# Generation
# ---------------------------------------------------------------------------
[generation]
# Model recorded as the producer of generated images unless --model is given.
default_model = "gemini-2.5-flash-image"

# Upper bound on images per generation request.
max_images = 4

# Long side, in pixels, of the placeholder images the offline generator
# paints (16-4096).
placeholder_size = 512
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(toml_str: &str) -> Result<StudioConfig, ConfigError> {
        resolve_config(Some(toml::from_str(toml_str)?))
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = StudioConfig::default();
        assert_eq!(config.storage.dir, ".studio");
        assert_eq!(config.storage.collection_key, "studio_collection");
        assert_eq!(config.storage.quota_bytes, None);
        assert_eq!(config.sync.upload_timeout(), Duration::from_secs(10));
        assert_eq!(config.cloud.latency_ms, [500, 1500]);
        assert_eq!(config.editor.jpeg_quality, 92);
        assert_eq!(config.editor.resample, Resample::CatmullRom);
        assert_eq!(config.generation.max_images, 4);
        assert_eq!(config.generation.placeholder_size, 512);
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(StudioConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config = parse(
            r#"
            [editor]
            resample = "lanczos3"
            "#,
        )
        .unwrap();
        assert_eq!(config.editor.resample, Resample::Lanczos3);
        assert_eq!(config.editor.jpeg_quality, 92);
        assert_eq!(config.sync.upload_timeout_secs, 10);
    }

    #[test]
    fn quota_parses() {
        let config = parse("[storage]\nquota_bytes = 1024").unwrap();
        assert_eq!(config.storage.quota_bytes, Some(1024));
        assert_eq!(config.storage.dir, ".studio");
    }

    #[test]
    fn render_options_follow_editor_section() {
        let config = parse("[editor]\njpeg_quality = 70\nresample = \"triangle\"").unwrap();
        let options = config.editor.render_options();
        assert_eq!(options.quality.value(), 70);
        assert_eq!(options.resample, Resample::Triangle);
    }

    #[tokio::test]
    async fn generation_section_drives_requests() {
        use crate::generation::{GenerationError, generate_artifacts};

        let config = parse(
            "[generation]\ndefault_model = \"sim-1\"\nmax_images = 2\nplaceholder_size = 32",
        )
        .unwrap();
        let generation = &config.generation;
        let generator = generation.simulated_generator();

        let request = generation.request("a harbor", None);
        assert_eq!(request.model, "sim-1");
        assert_eq!(generation.request("a harbor", Some("other")).model, "other");

        let artifacts = generate_artifacts(&generator, &request, generation.max_images)
            .await
            .unwrap();
        assert_eq!(artifacts[0].producer_id, "sim-1");

        let too_many = GenerationRequest { count: 3, ..request };
        assert!(matches!(
            generate_artifacts(&generator, &too_many, generation.max_images).await,
            Err(GenerationError::InvalidRequest(_))
        ));
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str("[cloud]\nlatency_ms = [1, 2]\nfailure_rate = 0.5")
            .unwrap();
        let overlay: toml::Value = toml::from_str("[cloud]\nfailure_rate = 0.1").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["cloud"]["failure_rate"].as_float(), Some(0.1));
        assert_eq!(
            merged["cloud"]["latency_ms"].as_array().map(|a| a.len()),
            Some(2)
        );
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str("x = [1, 2, 3]").unwrap();
        let overlay: toml::Value = toml::from_str("x = [9]").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["x"].as_array().map(|a| a.len()), Some(1));
    }

    // =========================================================================
    // Unknown keys and validation
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        assert!(matches!(
            parse("[sync]\nupload_timeout = 5"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn unknown_section_rejected() {
        assert!(parse("[network]\nretries = 3").is_err());
    }

    #[test]
    fn unknown_resample_rejected() {
        assert!(parse("[editor]\nresample = \"nearest\"").is_err());
    }

    #[test]
    fn validate_timeout_range() {
        assert!(parse("[sync]\nupload_timeout_secs = 1").is_ok());
        assert!(parse("[sync]\nupload_timeout_secs = 120").is_ok());
        assert!(matches!(
            parse("[sync]\nupload_timeout_secs = 0"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            parse("[sync]\nupload_timeout_secs = 121"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validate_latency_order() {
        assert!(parse("[cloud]\nlatency_ms = [0, 0]").is_ok());
        assert!(matches!(
            parse("[cloud]\nlatency_ms = [900, 100]"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validate_failure_rate() {
        assert!(parse("[cloud]\nfailure_rate = 1.0").is_ok());
        assert!(parse("[cloud]\nfailure_rate = 1.5").is_err());
        assert!(parse("[cloud]\nfailure_rate = -0.1").is_err());
    }

    #[test]
    fn validate_quality_and_images() {
        assert!(parse("[editor]\njpeg_quality = 0").is_err());
        assert!(parse("[editor]\njpeg_quality = 101").is_err());
        assert!(parse("[generation]\nmax_images = 0").is_err());
        assert!(parse("[generation]\nplaceholder_size = 8").is_err());
        assert!(parse("[generation]\nplaceholder_size = 64").is_ok());
        assert!(parse("[storage]\ncollection_key = \"  \"").is_err());
    }

    // =========================================================================
    // Loading from disk
    // =========================================================================

    #[test]
    fn load_config_missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("studio.toml")).unwrap();
        assert_eq!(config, StudioConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("studio.toml");
        fs::write(&path, "[storage]\ndir = \"/var/studio\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.storage.dir, "/var/studio");
    }

    #[test]
    fn load_config_invalid_toml_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("studio.toml");
        fs::write(&path, "[storage\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let value: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config = resolve_config(Some(value)).unwrap();
        assert_eq!(config, StudioConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in ["[storage]", "[sync]", "[cloud]", "[editor]", "[generation]"] {
            assert!(content.contains(section), "missing {section}");
        }
    }

    #[test]
    fn stock_defaults_value_omits_unset_quota() {
        let value = stock_defaults_value().unwrap();
        assert!(value["storage"].get("quota_bytes").is_none());
        assert!(value.get("editor").is_some());
    }
}
