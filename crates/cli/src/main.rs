//! CoverMap CLI - land-cover classification of Landsat 5 TM composites

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use covermap_algorithms::classification::{CartClassifier, CartParams, MinimumDistanceClassifier};
use covermap_algorithms::imagery::{tasseled_cap, COMPONENT_NAMES};
use covermap_algorithms::pipeline::{run_analysis, AnalysisOutput, StudyConfig};
use covermap_core::io::{write_geotiff, BandSource, GeoTiffBandSource};
use covermap_core::raster::BandStack;
use covermap_core::CRS;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "covermap")]
#[command(author, version, about = "Land-cover classification and area accounting", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a composite, assess accuracy and report per-class area
    Run {
        #[command(flatten)]
        input: CompositeArgs,
        /// Supervised classifier
        #[arg(long, value_enum, default_value_t = ClassifierKind::Cart)]
        classifier: ClassifierKind,
        /// Maximum CART depth (unlimited if omitted)
        #[arg(long)]
        max_depth: Option<usize>,
        /// Minimum samples per CART leaf
        #[arg(long, default_value = "1")]
        min_leaf: usize,
        /// Override the study's training fraction
        #[arg(long)]
        train_fraction: Option<f64>,
        /// Override the study's split seed
        #[arg(long)]
        seed: Option<u64>,
        /// Write the report as JSON
        #[arg(long)]
        json: Option<PathBuf>,
        /// Write the classified raster as GeoTIFF
        #[arg(long)]
        classified: Option<PathBuf>,
        /// Write the brightness component as GeoTIFF
        #[arg(long)]
        brightness: Option<PathBuf>,
    },
    /// Write the six tasseled cap components of a composite
    TasseledCap {
        #[command(flatten)]
        input: CompositeArgs,
        /// Output directory, one GeoTIFF per component
        #[arg(short, long)]
        output_dir: PathBuf,
    },
    /// Print the built-in Mekong delta study as JSON
    Study,
}

#[derive(clap::Args)]
struct CompositeArgs {
    /// Band files in B1, B2, B3, B4, B5, B7 order
    #[arg(long, num_args = 6, required = true)]
    bands: Vec<PathBuf>,
    /// Study description (JSON); defaults to the Mekong delta study
    #[arg(long)]
    study: Option<PathBuf>,
    /// EPSG code to assume when the band files carry none
    #[arg(long, default_value = "4326")]
    epsg: u32,
}

#[derive(Clone, Copy, ValueEnum)]
enum ClassifierKind {
    /// Gini decision tree
    Cart,
    /// Nearest class mean
    MinDistance,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_study(path: Option<&Path>) -> Result<StudyConfig> {
    let study = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read study {}", path.display()))?;
            serde_json::from_str(&text).context("Invalid study description")?
        }
        None => StudyConfig::mekong_delta(),
    };
    info!("Study: {}", study.name);
    Ok(study)
}

fn load_composite(args: &CompositeArgs, study: &StudyConfig) -> Result<BandStack> {
    let pb = spinner("Reading composite...");
    let source = GeoTiffBandSource::new(args.bands.clone())
        .context("Expected six band files")?
        .with_crs(CRS::from_epsg(args.epsg));
    let stack = source
        .fetch(study.bounds(), &study.dates)
        .context("Failed to read composite")?;
    pb.finish_and_clear();
    info!("Input: {} x {}", stack.cols(), stack.rows());
    Ok(stack)
}

fn analyse(
    stack: &BandStack,
    study: &StudyConfig,
    kind: ClassifierKind,
    cart: CartParams,
) -> Result<AnalysisOutput> {
    let pb = spinner("Classifying...");
    let output = match kind {
        ClassifierKind::Cart => run_analysis(stack, study, &CartClassifier::new(cart)),
        ClassifierKind::MinDistance => run_analysis(stack, study, &MinimumDistanceClassifier),
    }
    .context("Analysis failed")?;
    pb.finish_and_clear();
    Ok(output)
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            input,
            classifier,
            max_depth,
            min_leaf,
            train_fraction,
            seed,
            json,
            classified,
            brightness,
        } => {
            let mut study = load_study(input.study.as_deref())?;
            if let Some(f) = train_fraction {
                study.split.train_fraction = f;
            }
            if seed.is_some() {
                study.split.seed = seed;
            }
            let stack = load_composite(&input, &study)?;

            let start = Instant::now();
            let cart = CartParams {
                max_depth,
                min_leaf_population: min_leaf,
            };
            let output = analyse(&stack, &study, classifier, cart)?;
            let elapsed = start.elapsed();

            println!("{}", output.report);
            println!("Processing time: {:.2?}", elapsed);

            if let Some(path) = json {
                let text = serde_json::to_string_pretty(&output.report)?;
                std::fs::write(&path, text)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Report saved to: {}", path.display());
            }
            if let Some(path) = classified {
                write_geotiff(&output.classified, &path).context("Failed to write output")?;
                println!("Classified raster saved to: {}", path.display());
            }
            if let Some(path) = brightness {
                let band = output.features.band_raster(0)?;
                write_geotiff(&band, &path).context("Failed to write output")?;
                println!("Brightness saved to: {}", path.display());
            }
        }

        Commands::TasseledCap { input, output_dir } => {
            let study = load_study(input.study.as_deref())?;
            let stack = load_composite(&input, &study)?;

            let start = Instant::now();
            let pb = spinner("Computing tasseled cap...");
            let features = tasseled_cap(&stack, &study.region_polygon())
                .context("Tasseled cap failed")?;
            pb.finish_and_clear();

            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("Failed to create {}", output_dir.display()))?;
            for (i, name) in COMPONENT_NAMES.iter().enumerate() {
                let path = output_dir.join(format!("{}.tif", name));
                write_geotiff(&features.band_raster(i)?, &path)
                    .context("Failed to write output")?;
            }
            done("Tasseled cap", &output_dir, start.elapsed());
        }

        Commands::Study => {
            let json = serde_json::to_string_pretty(&StudyConfig::mekong_delta())?;
            println!("{}", json);
        }
    }

    Ok(())
}
