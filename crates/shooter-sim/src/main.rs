//! # Shooter Sim
//!
//! Runs a scenario file against the weapons in a directory and prints a
//! JSON report.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shooter_gameplay::FirearmEvent;
use shooter_sim::config::CONFIG_FILE;
use shooter_sim::weapon_loader::DEFAULT_WEAPON_PATH;
use shooter_sim::{Scenario, SimConfig, Simulation, WeaponLoader};

/// Replay a firearm scenario and report the results.
#[derive(Parser, Debug)]
#[command(name = "shooter-sim", version)]
struct Args {
    /// Scenario file to run
    scenario: PathBuf,

    /// Directory with weapon definition files
    #[arg(long, default_value = DEFAULT_WEAPON_PATH)]
    weapons: PathBuf,

    /// Simulation config file
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Random seed, overriding the config
    #[arg(long)]
    seed: Option<u64>,

    /// Write events as JSON lines to this file, overriding the config
    #[arg(long)]
    events: Option<PathBuf>,

    /// Log as JSON
    #[arg(long)]
    json_logs: bool,
}

/// Main entry point.
fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::from_default_env().add_directive("shooter=info".parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }

    info!("Shooter sim {}", env!("CARGO_PKG_VERSION"));

    let mut config = SimConfig::load_from(&args.config);
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.events.is_some() {
        config.event_log.clone_from(&args.events);
    }

    let mut loader = WeaponLoader::new(&args.weapons);
    loader
        .load_all()
        .with_context(|| format!("loading weapons from {}", args.weapons.display()))?;
    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("loading scenario {}", args.scenario.display()))?;

    let mut sim = Simulation::new(config.clone(), loader.registry(), &scenario)?;
    let report = sim.run(&scenario.steps)?;

    if let Some(path) = &config.event_log {
        write_event_log(path, sim.events())
            .with_context(|| format!("writing events to {}", path.display()))?;
        info!(events = sim.events().len(), "Event log written to {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    info!(
        ticks = report.ticks,
        shots = report.stats.shots,
        hits = report.stats.hits,
        "Scenario finished"
    );
    Ok(())
}

/// Write one JSON object per line.
fn write_event_log(path: &Path, events: &[FirearmEvent]) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    for event in events {
        serde_json::to_writer(&mut file, event)?;
        writeln!(file)?;
    }
    file.flush()?;
    Ok(())
}
