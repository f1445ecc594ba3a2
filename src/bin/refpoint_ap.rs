//! refpoint-ap
//!
//! Cluster a survey file with Affinity Propagation and write one file per
//! cluster.
//!
//! ```text
//! refpoint-ap survey.csv --slider 0.05 --output-dir clusters --format xy -v
//! ```
//!
//! Settings are layered: defaults, `refpoint-ap.toml` (or `--config`),
//! `REFPOINT_AP_*` environment variables, then the flags below.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use refpoint_ap::io::{load_dataset, write_clusters, ClusterFileNamer, OutputFormat};
use refpoint_ap::report::ClusterReport;
use refpoint_ap::settings::Settings;
use refpoint_ap::AffinityPropagation;

/// Affinity Propagation clustering of radio-fingerprint reference points
#[derive(Parser)]
#[command(name = "refpoint-ap")]
#[command(version)]
#[command(about = "Cluster surveyed reference points by RSS fingerprint")]
struct Cli {
    /// Survey file to cluster
    input: PathBuf,

    /// TOML settings file (default: ./refpoint-ap.toml when present)
    #[arg(short, long, env = "REFPOINT_AP_CONFIG")]
    config: Option<PathBuf>,

    /// Quantile of pairwise similarities used for the preference, in [0, 1]
    #[arg(long)]
    slider: Option<f64>,

    /// Scale applied to the quantile similarity
    #[arg(long)]
    gamma: Option<f64>,

    /// Message damping factor, strictly between 0 and 1
    #[arg(long)]
    damping: Option<f64>,

    /// Give up after this many iterations [default: 10000, or `ap.max_iterations`]
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Directory receiving the cluster files
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Cluster file layout
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Cluster file name prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Print a JSON report on stdout instead of the summary line
    #[arg(long)]
    json: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(q) = self.slider {
            settings.ap.quantile = q;
        }
        if let Some(g) = self.gamma {
            settings.ap.gamma = g;
        }
        if let Some(d) = self.damping {
            settings.ap.damping = d;
        }
        if self.max_iterations.is_some() {
            settings.ap.max_iterations = self.max_iterations;
        }
        if let Some(dir) = &self.output_dir {
            settings.output.output_dir = dir.clone();
        }
        if let Some(format) = self.format {
            settings.output.format = format;
        }
        if let Some(prefix) = &self.prefix {
            settings.output.file_prefix = Some(prefix.clone());
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let mut settings = Settings::load(cli.config.as_deref())
        .map_err(|e| anyhow!("failed to load settings: {e}"))?;
    cli.apply(&mut settings);

    let dataset = load_dataset(&cli.input)
        .with_context(|| format!("loading survey {}", cli.input.display()))?;
    info!(
        points = dataset.points.len(),
        building = %dataset.metadata.building,
        floor = dataset.metadata.floor,
        "survey loaded"
    );

    let mut ap = AffinityPropagation::new(dataset.points, settings.ap.clone())
        .context("setting up affinity propagation")?;
    let outcome = ap.run().context("clustering survey")?;

    let output = &settings.output;
    let mut namer = ClusterFileNamer::for_format(output.format);
    if let Some(prefix) = &output.file_prefix {
        namer = namer.with_prefix(prefix.as_str());
    }
    std::fs::create_dir_all(&output.output_dir)
        .with_context(|| format!("creating {}", output.output_dir.display()))?;
    let written = write_clusters(
        &output.output_dir,
        &dataset.metadata,
        ap.points(),
        &outcome.clusters,
        output.format,
        &mut namer,
    )?;

    if cli.json {
        let report = ClusterReport::from_outcome(ap.points(), &outcome, Some(&dataset.metadata));
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} clusters from {} points in {} iterations, written to {}",
            outcome.cluster_count(),
            ap.points().len(),
            outcome.iterations,
            output.output_dir.display()
        );
    }
    info!(files = written.len(), "cluster files written");
    Ok(())
}
