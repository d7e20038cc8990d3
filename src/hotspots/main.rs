//! Street hot spot pipeline.
//!
//! Builds the block-level street network from the street network and
//! centerline layers, matches incident rows to their nearest block, and
//! writes the enriched table (or the block streets layer itself).

mod config;
mod load;
mod write;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use streetblock::{BlockStreetNetwork, HotSpotMerger};

use crate::config::Config;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "hotspots")]
#[command(about = "Match incident points to block-level streets")]
struct Args {
    /// TOML config file (layer paths, field names, matching parameters)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Street network layer (GeoJSON), overrides the config
    #[arg(long)]
    network: Option<PathBuf>,

    /// Street centerline layer (GeoJSON), overrides the config
    #[arg(long)]
    centerlines: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Attach street block attributes to an incident CSV
    Match {
        /// Incident CSV with id and projected x/y columns
        #[arg(short, long)]
        incidents: PathBuf,

        /// Output CSV
        #[arg(short, long)]
        output: PathBuf,

        /// Search radius in projected units
        #[arg(long)]
        buffer: Option<f64>,

        /// Match on all cores
        #[arg(long)]
        parallel: bool,
    },
    /// Write the block streets layer as GeoJSON
    Streets {
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(path) = &args.network {
        config.network.path = Some(path.clone());
    }
    if let Some(path) = &args.centerlines {
        config.centerlines.path = Some(path.clone());
    }

    let network = build_network(&config)?;

    match args.command {
        Command::Match {
            incidents,
            output,
            buffer,
            parallel,
        } => {
            if let Some(buffer) = buffer {
                config.matching.buffer_distance = buffer;
            }
            config.matching.parallel |= parallel;
            run_match(&config, &network, &incidents, &output)
        }
        Command::Streets { output } => write::write_streets_geojson(&output, network.streets()),
    }
}

fn build_network(config: &Config) -> Result<BlockStreetNetwork> {
    let network_path = config
        .network
        .path
        .as_ref()
        .context("No street network layer given (--network or [network].path)")?;
    let centerline_path = config
        .centerlines
        .path
        .as_ref()
        .context("No centerline layer given (--centerlines or [centerlines].path)")?;

    let segments = load::load_network(network_path, &config.network)?;
    let centerlines = load::load_centerlines(centerline_path, &config.centerlines)?;

    let network = BlockStreetNetwork::from_layers(segments, &centerlines)
        .context("Failed to build block street network")?;
    info!("Street network ready with {} block streets", network.len());

    Ok(network)
}

fn run_match(
    config: &Config,
    network: &BlockStreetNetwork,
    incidents: &Path,
    output: &Path,
) -> Result<()> {
    let table = load::load_incidents(incidents, &config.incidents)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!(
        "Matching {} incidents (buffer {})",
        table.rows.len(),
        config.matching.buffer_distance
    ));

    let merged = HotSpotMerger::new(network)
        .with_buffer_distance(config.matching.buffer_distance)
        .with_max_segment_length(config.matching.max_segment_length)
        .parallel(config.matching.parallel)
        .merge(table.rows)
        .context("Street matching failed")?;

    pb.finish_with_message("Matching complete");

    write::write_enriched_csv(output, &table.headers, &merged)
}
