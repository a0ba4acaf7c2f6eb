use artifact_studio::cloud::SimulatedCloud;
use artifact_studio::config::{self, StudioConfig};
use artifact_studio::editor::EditSession;
use artifact_studio::generation::{
    GenerationRequest, enhance_prompt, generate_artifacts, upscale_artifact,
};
use artifact_studio::imaging::{CropPreset, FilterPreset, RustBackend, ScalePercent, TransformSpec};
use artifact_studio::output;
use artifact_studio::payload::{extension_for_mime, mime_for_path, parse_data_uri, to_data_uri};
use artifact_studio::store::FileStore;
use artifact_studio::sync::{SyncEvent, Synchronizer};
use artifact_studio::types::{Artifact, ArtifactId};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "studio")]
#[command(about = "Edit generated images and keep a synced collection")]
#[command(long_about = "\
Edit generated images and keep a synced collection

Images are edited with a fixed pipeline: center-crop to a preset ratio,
scale down, then apply a colour filter. Edits never change the original;
saving produces a new image labelled \"(Edited)\".

Imported images are saved to the local collection and uploaded to the
(simulated) cloud. If the upload fails the image is still kept locally.

Crop presets:   none, square, 16:9, 9:16, 3:2, 2:3
Filter presets: none, grayscale, sepia, warm, cool, vintage, invert
Scale:          10-100 (percent of the cropped size)

Images can also be generated offline: 'studio generate' paints placeholder
gradients in the requested aspect ratio and saves them like any import.

Run 'studio gen-config' to generate a documented studio.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = "studio.toml", global = true)]
    config: PathBuf,

    /// Collection store directory (overrides storage.dir)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Edit state shared by commands that transform an image.
#[derive(clap::Args, Clone)]
struct TransformArgs {
    /// Center-crop preset
    #[arg(long, default_value = "none")]
    crop: CropPreset,

    /// Colour filter preset
    #[arg(long, default_value = "none")]
    filter: FilterPreset,

    /// Output scale in percent (clamped to 10-100)
    #[arg(long, default_value = "100")]
    scale: ScalePercent,
}

impl TransformArgs {
    fn spec(&self) -> TransformSpec {
        TransformSpec {
            crop: self.crop,
            filter: self.filter,
            scale: self.scale,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Transform an image file and write the result
    Edit {
        input: PathBuf,
        /// Output file (default: <input>-edited.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        transform: TransformArgs,
    },
    /// Add an image file to the collection, optionally transformed
    Import {
        input: PathBuf,
        /// Description stored with the image (default: file name)
        #[arg(short, long)]
        description: Option<String>,
        /// Skip the cloud upload and save locally only
        #[arg(long)]
        offline: bool,
        #[command(flatten)]
        transform: TransformArgs,
    },
    /// Generate placeholder images and add them to the collection
    Generate {
        prompt: String,
        /// Model recorded as the producer (default: generation.default_model)
        #[arg(long)]
        model: Option<String>,
        /// Aspect ratio tag, e.g. 16:9
        #[arg(long, default_value = "1:1")]
        aspect_ratio: String,
        /// Number of generation calls (at most generation.max_images)
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
        /// Rewrite the prompt before generating; keeps it as-is on failure
        #[arg(long)]
        enhance: bool,
        /// Skip the cloud upload and save locally only
        #[arg(long)]
        offline: bool,
    },
    /// Add a 2x upscaled copy of a saved image to the collection
    Upscale {
        id: String,
        /// Skip the cloud upload and save locally only
        #[arg(long)]
        offline: bool,
    },
    /// Show the saved collection, most recent first
    List,
    /// Permanently delete an image from the collection
    Remove { id: String },
    /// Write a saved image to a file
    Export {
        id: String,
        /// Output file (default: <id>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List crop and filter presets
    Presets,
    /// Print a stock studio.toml with all options documented
    GenConfig,
}

type Studio = Synchronizer<FileStore, SimulatedCloud>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Presets => output::print_presets(),
        Command::Edit {
            input,
            output: target,
            transform,
        } => {
            let config = config::load_config(&cli.config)?;
            let source = read_artifact(&input, None)?;
            let target = target.unwrap_or_else(|| default_edit_target(&input, &source.payload));
            let edited = edit(&config, &source, &transform.spec(), Some(target.as_path()))?;
            write_payload(&edited.payload, &target)?;
        }
        Command::Import {
            input,
            description,
            offline,
            transform,
        } => {
            let config = config::load_config(&cli.config)?;
            let mut artifact = read_artifact(&input, description)?;
            let spec = transform.spec();
            if !spec.is_identity() {
                artifact = edit(&config, &artifact, &spec, None)?;
            }
            let studio = open_studio(&config, cli.store_dir.as_deref(), offline)?;
            save_and_report(&studio, artifact).await;
        }
        Command::Generate {
            prompt,
            model,
            aspect_ratio,
            count,
            enhance,
            offline,
        } => {
            let config = config::load_config(&cli.config)?;
            let generation = &config.generation;
            let generator = generation.simulated_generator();
            let prompt = if enhance {
                enhance_prompt(&generator, &prompt).await
            } else {
                prompt
            };
            let request = GenerationRequest {
                aspect_ratio,
                count,
                ..generation.request(prompt, model.as_deref())
            };
            let artifacts =
                generate_artifacts(&generator, &request, generation.max_images).await?;
            let studio = open_studio(&config, cli.store_dir.as_deref(), offline)?;
            for artifact in artifacts {
                save_and_report(&studio, artifact).await;
            }
        }
        Command::Upscale { id, offline } => {
            let config = config::load_config(&cli.config)?;
            let studio = open_studio(&config, cli.store_dir.as_deref(), offline)?;
            let source = studio
                .get(&ArtifactId::from(id.as_str()))
                .ok_or_else(|| format!("No artifact with id {id}"))?;
            let generator = config.generation.simulated_generator();
            let upscaled = upscale_artifact(&generator, &source).await?;
            save_and_report(&studio, upscaled).await;
        }
        Command::List => {
            let config = config::load_config(&cli.config)?;
            let studio = open_studio(&config, cli.store_dir.as_deref(), true)?;
            output::print_collection(&studio.artifacts());
        }
        Command::Remove { id } => {
            let config = config::load_config(&cli.config)?;
            let studio = open_studio(&config, cli.store_dir.as_deref(), true)?;
            let outcome = studio.remove(&ArtifactId::from(id.as_str()));
            output::print_remove_outcome(&id, &outcome);
        }
        Command::Export { id, output: target } => {
            let config = config::load_config(&cli.config)?;
            let studio = open_studio(&config, cli.store_dir.as_deref(), true)?;
            let artifact = studio
                .get(&ArtifactId::from(id.as_str()))
                .ok_or_else(|| format!("No artifact with id {id}"))?;
            let target = match target {
                Some(path) => path,
                None => {
                    let mime = parse_data_uri(&artifact.payload)?.mime;
                    PathBuf::from(format!("{}.{}", id, extension_for_mime(&mime)))
                }
            };
            write_payload(&artifact.payload, &target)?;
            println!("Exported {} -> {}", id, target.display());
        }
    }

    Ok(())
}

/// `--verbose` wins; otherwise `RUST_LOG`, falling back to warnings only.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Open the store, wire up the uploader and load the persisted collection.
fn open_studio(
    config: &StudioConfig,
    store_dir: Option<&Path>,
    offline: bool,
) -> Result<Studio, Box<dyn std::error::Error>> {
    let dir = store_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.storage.dir));
    let store = FileStore::open(dir, config.storage.quota_bytes)?;
    let cloud = if offline {
        SimulatedCloud::new(0..=0, 1.0)
    } else {
        let [min, max] = config.cloud.latency_ms;
        SimulatedCloud::new(min..=max, config.cloud.failure_rate)
    };
    let studio = Synchronizer::new(
        store,
        cloud,
        config.storage.collection_key.clone(),
        config.sync.upload_timeout(),
    );
    let loaded = studio.load();
    output::print_load_outcome(&loaded);
    Ok(studio)
}

async fn save_and_report(studio: &Studio, artifact: Artifact) {
    let mut events = studio.subscribe();
    let outcome = studio.save(artifact).await;
    print_events(&mut events);
    output::print_save_outcome(&outcome);
}

fn print_events(events: &mut broadcast::Receiver<SyncEvent>) {
    while let Ok(event) = events.try_recv() {
        output::print_sync_event(&event);
    }
}

/// Run one edit session end to end and print what it did.
fn edit(
    config: &StudioConfig,
    source: &Artifact,
    spec: &TransformSpec,
    target: Option<&Path>,
) -> Result<Artifact, Box<dyn std::error::Error>> {
    let backend = RustBackend::new();
    let mut session = EditSession::open(&backend, source.clone(), config.editor.render_options())?;
    session.apply(*spec)?;
    output::print_edit_summary(
        session.source_dimensions(),
        session.preview_dimensions(),
        &session.spec(),
        target,
    );
    Ok(session.save()?)
}

fn read_artifact(
    path: &Path,
    description: Option<String>,
) -> Result<Artifact, Box<dyn std::error::Error>> {
    let mime = mime_for_path(path)
        .ok_or_else(|| format!("Unsupported image type: {}", path.display()))?;
    let bytes = std::fs::read(path)?;
    let description = description.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    Ok(Artifact::new(
        to_data_uri(mime, &bytes),
        description,
        "local-import",
        None,
    ))
}

fn write_payload(payload: &str, target: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = parse_data_uri(payload)?;
    std::fs::write(target, data.bytes)?;
    Ok(())
}

/// `photo.webp` becomes `photo-edited.jpg`; PNG stays PNG.
fn default_edit_target(input: &Path, payload: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let mime = artifact_studio::payload::PayloadFormat::for_rederive(payload).mime();
    input.with_file_name(format!("{}-edited.{}", stem, extension_for_mime(mime)))
}
