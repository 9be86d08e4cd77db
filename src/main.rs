// SYNOID YTP Main Entry Point
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use synoid_ytp::config::ResolvedPaths;
use synoid_ytp::project::ProjectSnapshot;
use synoid_ytp::render_queue::{RenderJob, RenderQueue};
use synoid_ytp::{
    health, processor, sources, ChainOrchestrator, Config, EffectFamily, EffectOverrides,
    FfmpegProcessor, RenderRequest, RenderResult, RetentionPolicy, YtpError,
};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "synoid-ytp")]
#[command(about = "Randomized YTP effect chains on top of ffmpeg", long_about = None)]
struct Cli {
    /// Configuration file (created with defaults if missing)
    #[arg(long, env = "YTP_CONFIG", default_value = "config.json", global = true)]
    config: PathBuf,

    /// ffmpeg binary
    #[arg(long, env = "YTP_FFMPEG", default_value = "ffmpeg", global = true)]
    ffmpeg: String,

    /// ffprobe binary
    #[arg(long, env = "YTP_FFPROBE", default_value = "ffprobe", global = true)]
    ffprobe: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct EffectToggles {
    /// Enable only these effects (comma-separated)
    #[arg(long, value_delimiter = ',')]
    only: Vec<EffectFamily>,

    /// Force-enable effects
    #[arg(long, value_delimiter = ',')]
    enable: Vec<EffectFamily>,

    /// Disable effects
    #[arg(long, value_delimiter = ',')]
    disable: Vec<EffectFamily>,

    /// Override a firing probability, e.g. `invert=1.0`
    #[arg(long, value_parser = parse_probability)]
    probability: Vec<(EffectFamily, f64)>,
}

impl EffectToggles {
    fn overrides(&self) -> EffectOverrides {
        let mut overrides = EffectOverrides::default();
        if !self.only.is_empty() {
            overrides = overrides.only(&self.only);
        }
        for family in &self.enable {
            overrides = overrides.enable(*family);
        }
        for family in &self.disable {
            overrides = overrides.disable(*family);
        }
        for (family, p) in &self.probability {
            overrides = overrides.probability(*family, *p);
        }
        overrides
    }
}

fn parse_probability(s: &str) -> Result<(EffectFamily, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <effect>=<probability>, got '{}'", s))?;
    let family: EffectFamily = name.parse()?;
    let p: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if !(0.0..=1.0).contains(&p) {
        return Err(format!("probability {} is outside [0, 1]", p));
    }
    Ok((family, p))
}

#[derive(Subcommand)]
enum Commands {
    /// List source files
    List,

    /// Add files to sources (copies)
    Add {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Remove files from sources by name
    Remove {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Render the first source (or --source) through a random effect chain
    Preview {
        /// Output path (defaults to <temp>/preview.mp4)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Source file name inside the sources directory
        #[arg(short, long)]
        source: Option<String>,

        /// Copy the final stage verbatim instead of a 640px preview encode
        #[arg(long)]
        full: bool,

        /// Seed for reproducible effect selection
        #[arg(long)]
        seed: Option<u64>,

        /// Delete the run's staging directory after a successful render
        #[arg(long)]
        purge_stages: bool,

        #[command(flatten)]
        toggles: EffectToggles,
    },

    /// Queue a preview for every source and wait for all of them
    Batch {
        /// Output directory (defaults to <temp>)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Base seed; job N uses seed + N
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        purge_stages: bool,

        #[command(flatten)]
        toggles: EffectToggles,
    },

    /// Stream-copy concatenate clips that share codecs
    Concat {
        #[arg(short, long)]
        out: PathBuf,

        #[arg(required = true, num_args = 2..)]
        clips: Vec<PathBuf>,
    },

    /// Save the source list and effect table to last_project.json
    SaveProject,

    /// Check that ffmpeg and ffprobe are reachable
    Doctor,
}

fn project_root(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn retention(purge: bool) -> RetentionPolicy {
    if purge {
        RetentionPolicy::PurgeOnSuccess
    } else {
        RetentionPolicy::Retain
    }
}

async fn report(result: &RenderResult, ffprobe: &str) {
    let size_mb = std::fs::metadata(&result.output)
        .map(|m| m.len() as f64 / 1_048_576.0)
        .unwrap_or(0.0);
    let applied: Vec<String> = result.applied.iter().map(|s| s.to_string()).collect();

    println!(
        "{} ready: {:?} ({:.2} MB)",
        if result.preview { "Preview" } else { "Render" },
        result.output,
        size_mb
    );
    println!(
        "   Effects: {}",
        if applied.is_empty() { "none".to_string() } else { applied.join(" -> ") }
    );
    println!("   Stages kept in {:?} (run {})", result.staging_dir, result.run_id);

    match processor::probe_duration(ffprobe, &result.output).await {
        Ok(d) => println!("   Duration: {:.2}s", d),
        Err(e) => warn!("Could not probe duration: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let args = Cli::parse();

    let root = project_root(&args.config);
    let config = Config::load_or_materialize(&args.config);
    let paths: ResolvedPaths = config.resolve_paths(&root);
    for dir in [&paths.sources, &paths.temp] {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
    }

    match args.command {
        Commands::List => {
            println!("Sources in {:?}:", paths.sources);
            for source in sources::list_sources(&paths.sources)? {
                if let Some(name) = source.file_name() {
                    println!(" - {}", name.to_string_lossy());
                }
            }
        }
        Commands::Add { files } => {
            let added = sources::add_sources(&paths.sources, &files)?;
            println!("Added {} of {} file(s) to {:?}", added.len(), files.len(), paths.sources);
        }
        Commands::Remove { names } => {
            let removed = sources::remove_sources(&paths.sources, &names);
            println!("Removed {} file(s)", removed.len());
        }
        Commands::Preview {
            out,
            source,
            full,
            seed,
            purge_stages,
            toggles,
        } => {
            let overrides = toggles.overrides();
            if !overrides.is_empty() {
                info!("[CLI] Effect overrides: {:?}", overrides);
            }
            let local = config.with_overrides(&overrides);
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy(),
            };

            let orchestrator = ChainOrchestrator::new(FfmpegProcessor::new(&args.ffmpeg), &root);
            let rendered = orchestrator
                .render_source(
                    &local,
                    source.as_deref(),
                    out,
                    !full,
                    retention(purge_stages),
                    &mut rng,
                )
                .await;
            let result = match rendered {
                Ok(result) => result,
                Err(e @ YtpError::NoSources { .. }) => {
                    println!("{}", e);
                    return Ok(());
                }
                Err(e) => return Err(anyhow::Error::new(e).context("effect chain failed")),
            };
            report(&result, &args.ffprobe).await;
        }
        Commands::Batch {
            out_dir,
            seed,
            purge_stages,
            toggles,
        } => {
            let inputs = sources::list_sources(&paths.sources)?;
            if inputs.is_empty() {
                println!("{}", YtpError::NoSources { dir: paths.sources.clone() });
                return Ok(());
            }
            let out_dir = out_dir.unwrap_or_else(|| paths.temp.clone());
            std::fs::create_dir_all(&out_dir)?;

            let local = config.with_overrides(&toggles.overrides());
            let orchestrator = Arc::new(ChainOrchestrator::new(
                FfmpegProcessor::new(&args.ffmpeg),
                &root,
            ));
            let queue = RenderQueue::new(orchestrator);

            let mut handles = Vec::new();
            for (i, input) in inputs.iter().enumerate() {
                let stem = input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| format!("source_{}", i));
                let target = out_dir.join(format!("{}_preview.mp4", stem));
                let request =
                    RenderRequest::preview(input, target).with_retention(retention(purge_stages));
                let mut job = RenderJob::new(request, local.clone());
                if let Some(base) = seed {
                    job = job.seeded(base.wrapping_add(i as u64));
                }
                handles.push(queue.submit(job).await);
            }

            let mut failures = 0;
            for handle in handles {
                let id = handle.id;
                match handle.wait().await {
                    Ok(result) => report(&result, &args.ffprobe).await,
                    Err(e) => {
                        failures += 1;
                        error!("Job {} failed: {}", id, e);
                    }
                }
            }
            println!("Batch finished: {} ok, {} failed", inputs.len() - failures, failures);
            if failures > 0 {
                anyhow::bail!("{} render(s) failed", failures);
            }
        }
        Commands::Concat { out, clips } => {
            let orchestrator = ChainOrchestrator::new(FfmpegProcessor::new(&args.ffmpeg), &root);
            let path = orchestrator
                .library()
                .concat_clips(&clips, &out)
                .await
                .context("concat failed")?;
            println!("Concatenated {} clips into {:?}", clips.len(), path);
        }
        Commands::SaveProject => {
            let snapshot = ProjectSnapshot::capture(&config, &paths.sources)?;
            let path = snapshot.save(&root)?;
            println!("Project saved to {:?}", path);
        }
        Commands::Doctor => {
            let missing = health::check_dependencies(&args.ffmpeg, &args.ffprobe).await;
            if missing.is_empty() {
                println!("ffmpeg and ffprobe are available.");
            } else {
                println!("Missing: {}", missing.join(", "));
                anyhow::bail!("required tools are not installed or not on PATH");
            }
        }
    }

    Ok(())
}
