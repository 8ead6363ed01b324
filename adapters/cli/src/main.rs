#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Bridge Keeper level headlessly.

mod session;
mod settings;

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;

use crate::{
    session::{Session, DEFAULT_EFFECT_DURATION},
    settings::{load_layout, Settings},
};

/// Runs one level on a virtual clock with a scripted player and logs the outcome.
#[derive(Debug, Parser)]
#[command(name = "bridge-keeper", version)]
struct Args {
    /// TOML map file; the reference layout is used when omitted.
    #[arg(long, value_name = "FILE")]
    map: Option<PathBuf>,

    /// TOML settings file overriding the reference tuning.
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Seed for every randomised system; overrides the settings file.
    #[arg(long)]
    seed: Option<u64>,

    /// Length of the simulated session in seconds.
    #[arg(long, default_value_t = 300)]
    duration_secs: u64,

    /// Length of one simulated frame in milliseconds.
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    log: String,
}

/// Entry point for the Bridge Keeper command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log)).init();

    let mut settings = Settings::load(args.settings.as_deref())?;
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    let layout = load_layout(args.map.as_deref())?;

    let effect_duration = settings
        .effect_duration_ms
        .map_or(DEFAULT_EFFECT_DURATION, Duration::from_millis);
    let mut session = Session::new(settings.config(), effect_duration);
    session.load(layout);

    let summary = session.run(
        Duration::from_secs(args.duration_secs),
        Duration::from_millis(args.tick_ms),
    );

    log::info!(
        "ran {:?}: intensity {}, {} platforms left, {}",
        summary.elapsed,
        summary.intensity,
        summary.active_platforms,
        if summary.game_over { "game over" } else { "still standing" }
    );
    log::info!(
        "{} collapses, {} falls, {} spawns, {} planks reinforced, {} cracks repaired",
        summary.collapses,
        summary.falls,
        summary.spawns,
        summary.reinforced,
        summary.repaired
    );
    Ok(())
}
