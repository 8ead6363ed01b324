#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Flood-fill connectivity analysis that finds platforms cut off from the master.

use std::collections::{HashSet, VecDeque};

use bridge_keeper_core::{
    CollapseReport, CollapsedGroup, Command, DroppedTile, Event, GridProvider, TileCoord,
};

/// Step budget shared by the platform worklist and every fill of a pass.
pub const DEFAULT_ITERATION_CAP: usize = 100_000;

/// Fewer active platforms than this leaves nothing to partition.
const MIN_ACTIVE_PLATFORMS: u32 = 2;

/// Configuration parameters required to construct the connectivity system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    iteration_cap: usize,
}

impl Config {
    /// Creates a new configuration with the provided step budget per pass.
    #[must_use]
    pub const fn new(iteration_cap: usize) -> Self {
        Self { iteration_cap }
    }

    /// Step budget per pass.
    #[must_use]
    pub const fn iteration_cap(&self) -> usize {
        self.iteration_cap
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATION_CAP)
    }
}

/// Pure system that runs a connectivity pass whenever a bridge tile breaks.
#[derive(Debug, Default)]
pub struct Connectivity {
    config: Config,
}

impl Connectivity {
    /// Creates a new connectivity system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Consumes world events and the current grid to emit collapse commands.
    ///
    /// Several breaks reported in one batch are covered by a single pass.
    pub fn handle<G>(
        &mut self,
        events: &[Event],
        grid: &G,
        platforms: &[TileCoord],
        master: TileCoord,
        active_platforms: u32,
        out: &mut Vec<Command>,
    ) where
        G: GridProvider + ?Sized,
    {
        let broke = events
            .iter()
            .any(|event| matches!(event, Event::TileBroken { .. }));
        if !broke {
            return;
        }

        if active_platforms < MIN_ACTIVE_PLATFORMS {
            log::debug!("skipping connectivity pass with {active_platforms} active platforms");
            return;
        }

        let report = analyze(grid, platforms, master, self.config.iteration_cap);
        out.push(Command::ResolveCollapse { report });
    }
}

/// Partitions the platforms into groups that can no longer reach `master`.
///
/// Every platform other than `master` is seeded in order unless an earlier
/// fill already absorbed it. Each fill spreads breadth-first over passable
/// tiles and stops as soon as it touches `master`. A fill that never touches
/// `master` and covers more than one tile is reported as a group, together
/// with the number of platforms it absorbed.
///
/// When `iteration_cap` steps are exceeded the pass stops and the report is
/// flagged as aborted; groups found before that point are kept.
#[must_use]
pub fn analyze<G>(
    grid: &G,
    platforms: &[TileCoord],
    master: TileCoord,
    iteration_cap: usize,
) -> CollapseReport
where
    G: GridProvider + ?Sized,
{
    let (columns, rows) = grid.dimensions();
    let mut worklist: VecDeque<TileCoord> = platforms
        .iter()
        .copied()
        .filter(|platform| *platform != master)
        .collect();
    let mut report = CollapseReport::default();
    let mut steps = 0usize;

    while let Some(seed) = worklist.pop_front() {
        steps += 1;
        if steps > iteration_cap {
            log::warn!("connectivity pass exceeded {iteration_cap} steps, aborting");
            report.aborted = true;
            return report;
        }

        let mut visited: HashSet<TileCoord> = HashSet::new();
        let mut fill: Vec<TileCoord> = Vec::new();
        let mut frontier: VecDeque<TileCoord> = VecDeque::new();
        let _ = visited.insert(seed);
        fill.push(seed);
        frontier.push_back(seed);

        let mut absorbed = 1u32;
        let mut connected = false;

        while let Some(current) = frontier.pop_front() {
            steps += 1;
            if steps > iteration_cap {
                log::warn!("connectivity pass exceeded {iteration_cap} steps, aborting");
                report.aborted = true;
                return report;
            }

            if current == master {
                connected = true;
                break;
            }

            if let Some(position) = worklist.iter().position(|platform| *platform == current) {
                let _ = worklist.remove(position);
                absorbed += 1;
            }

            for neighbor in current.neighbors(columns, rows) {
                if visited.contains(&neighbor) || !grid.tile(neighbor).is_passable() {
                    continue;
                }
                let _ = visited.insert(neighbor);
                fill.push(neighbor);
                frontier.push_back(neighbor);
            }
        }

        if connected || fill.len() <= 1 {
            continue;
        }

        log::debug!(
            "platform {seed:?} cut off with {} tiles and {absorbed} platforms",
            fill.len()
        );
        report.groups.push(CollapsedGroup {
            platforms: absorbed,
            tiles: fill
                .into_iter()
                .map(|tile| DroppedTile {
                    tile,
                    prior: grid.tile(tile),
                })
                .collect(),
        });
    }

    report
}
