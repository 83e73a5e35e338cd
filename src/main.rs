use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::error;
use tracing_subscriber::EnvFilter;

use rollcount::pipeline::load_image;
use rollcount::{
    DetectionMode, DetectionResult, ExternalDetector, Pipeline, PipelineConfig, PipelineContext,
    PrimaryDetector,
};

#[derive(Parser)]
#[command(name = "rollcount")]
#[command(about = "Count thread rolls in holder images and classify their colors")]
struct Cli {
    /// Input image files
    #[arg(value_name = "IMAGE", required_unless_present = "print_config")]
    images: Vec<PathBuf>,

    /// Pipeline configuration (JSON); missing fields keep their defaults
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// External detector program (path or name on PATH)
    #[arg(long, value_name = "PROGRAM")]
    detector: Option<PathBuf>,

    /// Model weights passed to the detector program
    #[arg(long, value_name = "FILE", requires = "detector")]
    weights: Option<PathBuf>,

    /// Extra argument for the detector program (repeatable)
    #[arg(long = "detector-arg", value_name = "ARG", requires = "detector")]
    detector_args: Vec<String>,

    /// Detection mode, overrides the configuration file
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Primary candidates needed (strictly more than) to skip the fallback
    #[arg(long, value_name = "N")]
    coverage_threshold: Option<usize>,

    /// Primary detector confidence threshold
    #[arg(long, value_name = "SCORE")]
    confidence: Option<f32>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Images processed concurrently
    #[arg(short, long, default_value_t = 4)]
    jobs: usize,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Hybrid,
    PrimaryOnly,
    FallbackOnly,
}

impl From<ModeArg> for DetectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Hybrid => DetectionMode::Hybrid,
            ModeArg::PrimaryOnly => DetectionMode::PrimaryOnly,
            ModeArg::FallbackOnly => DetectionMode::FallbackOnly,
        }
    }
}

#[derive(Serialize)]
struct ImageReport<'a> {
    image: &'a Path,
    #[serde(flatten)]
    result: &'a DetectionResult,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let config = build_config(&args)?;
    if args.print_config {
        config.validate()?;
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    let primary: Option<Box<dyn PrimaryDetector>> = match &args.detector {
        Some(program) => {
            let detector =
                ExternalDetector::new(program, args.weights.clone(), args.detector_args.clone())
                    .context("Failed to set up the primary detector")?;
            Some(Box::new(detector))
        }
        None => None,
    };

    let pipeline = Arc::new(Pipeline::new(config, primary).context("Failed to build pipeline")?);
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));

    // every debug directory is checked before the first image starts
    let contexts = image_contexts(&args)?;

    let mut handles = Vec::with_capacity(args.images.len());
    for (path, context) in args.images.iter().zip(contexts) {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let pipeline = Arc::clone(&pipeline);
        let path = path.clone();

        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let outcome = load_image(&path)
                .and_then(|image| pipeline.process_with_context(&image, &context));
            (path, outcome)
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    let mut failures = 0usize;
    for handle in handles {
        let (path, outcome) = handle.await?;
        match outcome {
            Ok(result) => results.push((path, result)),
            Err(e) => {
                error!(image = %path.display(), error = %e, "failed to process image");
                failures += 1;
            }
        }
    }

    if args.json {
        print_json(&results)?;
    } else {
        for (path, result) in &results {
            print_summary(path, result);
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} images failed", failures, args.images.len());
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Configuration file (or defaults) with command-line overrides applied
fn build_config(args: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(mode) = args.mode {
        config.hybrid.mode = mode.into();
    }
    if let Some(threshold) = args.coverage_threshold {
        config.hybrid.coverage_threshold = threshold;
    }
    if let Some(confidence) = args.confidence {
        config.hybrid.primary_confidence = confidence;
    }

    Ok(config)
}

/// One context per input image, failing before any image is processed
fn image_contexts(args: &Cli) -> anyhow::Result<Vec<PipelineContext>> {
    args.images
        .iter()
        .enumerate()
        .map(|(idx, path)| image_context(args, idx, path))
        .collect()
}

/// Context for one image; with several images each gets its own debug subdirectory
fn image_context(args: &Cli, idx: usize, path: &Path) -> anyhow::Result<PipelineContext> {
    let context = PipelineContext::new().with_verbose(args.verbose);
    let Some(debug_root) = &args.debug_out else {
        return Ok(context);
    };

    let dir = if args.images.len() == 1 {
        debug_root.clone()
    } else {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        debug_root.join(format!("{:02}_{}", idx + 1, stem))
    };

    context
        .with_debug(dir)
        .with_context(|| format!("Cannot use debug directory for {}", path.display()))
}

fn print_json(results: &[(PathBuf, DetectionResult)]) -> anyhow::Result<()> {
    let json = match results {
        [(_, result)] => serde_json::to_string_pretty(result)?,
        _ => {
            let reports: Vec<ImageReport<'_>> = results
                .iter()
                .map(|(path, result)| ImageReport { image: path, result })
                .collect();
            serde_json::to_string_pretty(&reports)?
        }
    };
    println!("{}", json);
    Ok(())
}

fn print_summary(path: &Path, result: &DetectionResult) {
    println!("\n=== {} ===", path.display());
    if let Some(source) = result.source() {
        println!("Detector: {}", source);
    }
    match result.holder() {
        Some(holder) => println!(
            "Holder: ({:.0}, {:.0}) - ({:.0}, {:.0})",
            holder.x1, holder.y1, holder.x2, holder.y2
        ),
        None => println!("Holder: not found"),
    }
    println!("Total rolls: {}", result.total_count());

    if result.total_count() == 0 {
        println!("No rolls detected.");
        return;
    }
    for (label, count) in result.color_counts() {
        println!("  {}: {}", label, count);
    }
}
