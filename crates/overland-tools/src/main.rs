//! # Worldwalk
//!
//! Soak-test binary that walks a simulated player through an Overland
//! world: wandering tile by tile, teleporting occasionally, harvesting
//! resources, and placing the odd structure, while logging chunk
//! system health. Useful for eyeballing streaming and persistence
//! behavior over a long session.
//!
//! ```text
//! worldwalk [--seed N] [--steps N] [--config PATH]
//! ```
//!
//! Deltas land under the configured save directory; running the same
//! seed twice continues the previous session's world.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use overland_common::{StructureId, TileCoord, WorldConfig, WorldSeed};
use overland_world::{ChunkSystem, FileDeltaStore};
use overland_worldgen::ResourceKind;

/// Steps between census log lines.
const CENSUS_INTERVAL: u64 = 600;

/// Steps between structure placement attempts.
const STRUCTURE_INTERVAL: u64 = 997;

/// Command-line options for the walk.
#[derive(Debug, Clone)]
struct WalkOptions {
    seed: u64,
    steps: u64,
    config_path: PathBuf,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            seed: 12_345,
            steps: 10_000,
            config_path: PathBuf::from("overland.toml"),
        }
    }
}

fn parse_args(args: &[String]) -> Result<WalkOptions> {
    let mut options = WalkOptions::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" => {
                i += 1;
                options.seed = args
                    .get(i)
                    .context("--seed needs a value")?
                    .parse()
                    .context("--seed must be an unsigned integer")?;
            }
            "--steps" => {
                i += 1;
                options.steps = args
                    .get(i)
                    .context("--steps needs a value")?
                    .parse()
                    .context("--steps must be an unsigned integer")?;
            }
            "--config" => {
                i += 1;
                options.config_path = args.get(i).context("--config needs a value")?.into();
            }
            other => bail!("unknown argument {other}; expected --seed, --steps, or --config"),
        }
        i += 1;
    }

    Ok(options)
}

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_args(&args)?;

    info!("Overland worldwalk starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    run_walk(&options)?;

    info!("Worldwalk complete");
    Ok(())
}

fn run_walk(options: &WalkOptions) -> Result<()> {
    let config = WorldConfig::load_from(&options.config_path);
    let store = FileDeltaStore::new(&config.save_dir);
    let mut system = ChunkSystem::new(WorldSeed::new(options.seed), config, Box::new(store))?;

    let mut rng = fastrand::Rng::with_seed(options.seed);
    let mut position = TileCoord::new(0, 0);
    let mut harvests: u64 = 0;
    let mut structures: u64 = 0;

    info!(seed = options.seed, steps = options.steps, "starting walk");

    for step in 0..options.steps {
        position = next_position(&mut rng, position, step);
        system.update(position);

        harvests += u64::from(try_harvest(&mut system, &mut rng, position));

        if step > 0 && step % STRUCTURE_INTERVAL == 0 {
            let id = StructureId::new(rng.u16(..8));
            // Fails harmlessly while the chunk is still streaming in.
            if system.place_structure(position, id).is_ok() {
                structures += 1;
            }
        }

        if step % CENSUS_INTERVAL == 0 {
            log_census(&system, position, step);
        }
    }

    let flushed = system.flush_all();
    let stats = system.stats();
    info!(
        flushed,
        harvests,
        structures,
        generated = stats.generated_total,
        evicted = stats.evicted_total,
        delta_writes = stats.delta_writes,
        write_failures = stats.delta_write_failures,
        corrupt_discarded = stats.corrupt_deltas_discarded,
        "walk finished"
    );

    Ok(())
}

/// One movement step: a neighboring tile, or rarely a long teleport
/// that forces a full evict-and-reload cycle.
fn next_position(rng: &mut fastrand::Rng, position: TileCoord, step: u64) -> TileCoord {
    if step > 0 && rng.u16(..) < 16 {
        let target = TileCoord::new(rng.i64(-100_000..=100_000), rng.i64(-100_000..=100_000));
        info!(x = target.x, y = target.y, "teleporting");
        return target;
    }
    TileCoord::new(position.x + rng.i64(-1..=1), position.y + rng.i64(-1..=1))
}

/// Harvests the tile under the player when its biome spawns the rolled
/// resource and nobody took it yet. Returns whether a harvest landed.
fn try_harvest(system: &mut ChunkSystem, rng: &mut fastrand::Rng, position: TileCoord) -> bool {
    let kind = ResourceKind::ALL[rng.usize(..ResourceKind::ALL.len())];
    if !system.spawns_resource_at(kind, position) {
        return false;
    }
    // Right after a teleport the chunk may not be resident yet; skip
    // until it streams in.
    matches!(system.mark_harvested(position), Ok(true))
}

fn log_census(system: &ChunkSystem, position: TileCoord, step: u64) {
    let stats = system.stats();
    let biome = system
        .biome_at(position)
        .map_or("streaming", |b| system.biome_table().profile(b).name);

    info!(
        step,
        x = position.x,
        y = position.y,
        biome,
        loaded = stats.loaded,
        active = stats.active,
        dormant = stats.dormant,
        pending = stats.queued + stats.in_flight,
        generated = stats.generated_total,
        "walk census"
    );
}
