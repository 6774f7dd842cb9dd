#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs dust storm scenarios headlessly.

mod scenario;
mod simulation;
mod triggers;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    scenario::{Scenario, DEFAULT_SCENARIO},
    simulation::Simulation,
};

/// Command-line options.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario file; the bundled scenario runs when omitted.
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Last tick to simulate, overriding the scenario.
    #[arg(short, long)]
    until: Option<u64>,

    /// Random seed, overriding the scenario.
    #[arg(long)]
    seed: Option<u64>,

    /// Log filter directive such as `info` or `dust_storm_system_storm=debug`.
    #[arg(long)]
    log: Option<String>,
}

/// Entry point for the dust storm command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log.as_deref())?;

    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::from_toml(DEFAULT_SCENARIO).context("bundled scenario is invalid")?,
    };
    if let Some(seed) = args.seed {
        scenario.storm = scenario.storm.with_seed(seed);
    }
    let until = args.until.unwrap_or(scenario.until);

    info!(
        surfaces = scenario.surfaces.len(),
        triggers = scenario.triggers.len(),
        until,
        seed = scenario.storm.rng_seed,
        "starting simulation"
    );
    let mut simulation = Simulation::from_scenario(&scenario)?;
    simulation.run_until(until);

    println!("{}", simulation.report());
    Ok(())
}

fn init_tracing(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter {directive}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("failed to install the tracing subscriber")
}
