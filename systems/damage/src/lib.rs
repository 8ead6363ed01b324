#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Recurring damage system that picks a random bridge tile on every firing.

use std::time::Duration;

use bridge_keeper_core::{
    schedule::{Scheduler, TimerHandle},
    Command, Event, GridProvider,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Delay before the first firing after a level loads.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(4_000);

/// Configuration parameters required to construct the damage system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    initial_delay: Duration,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided first delay and seed.
    ///
    /// Until the first intensity increase, firings repeat at `initial_delay`.
    #[must_use]
    pub const fn new(initial_delay: Duration, rng_seed: u64) -> Self {
        Self {
            initial_delay,
            rng_seed,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_DELAY, 0)
    }
}

/// Timer state of the damage system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// No level is loaded.
    Idle,
    /// The recurring timer counts down.
    Armed,
    /// The timer keeps its remaining delay until resumed.
    Suspended,
}

/// Pure system that periodically damages one randomly chosen bridge tile.
#[derive(Debug)]
pub struct Damage {
    config: Config,
    rng: ChaCha8Rng,
    timers: Scheduler<()>,
    timer: Option<TimerHandle>,
    interval: Duration,
    paused: bool,
    game_over: bool,
}

impl Damage {
    /// Creates a new damage system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            timers: Scheduler::new(),
            timer: None,
            interval: config.initial_delay,
            paused: false,
            game_over: false,
        }
    }

    /// Current timer state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        match self.timer {
            None => SchedulerState::Idle,
            Some(handle) if self.timers.is_paused(handle) => SchedulerState::Suspended,
            Some(_) => SchedulerState::Armed,
        }
    }

    /// Delay used when the timer is re-armed after the next firing.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Consumes world events and the current grid to emit damage commands.
    pub fn handle<G>(&mut self, events: &[Event], grid: &G, out: &mut Vec<Command>)
    where
        G: GridProvider + ?Sized,
    {
        for event in events {
            match event {
                Event::LevelLoaded { .. } => self.arm(),
                Event::LevelUnloaded => {
                    self.timers.clear();
                    self.timer = None;
                }
                Event::IntensityRaised { cadence, .. } => {
                    self.interval = cadence.damage_interval;
                }
                Event::PauseChanged { paused } => {
                    self.paused = *paused;
                    self.sync_suspension();
                }
                Event::GameOver => {
                    self.game_over = true;
                    self.sync_suspension();
                }
                Event::TimeAdvanced { dt } => self.advance(*dt, grid, out),
                _ => {}
            }
        }
    }

    /// Runs one firing: damages a uniformly chosen bridge tile, if any exist.
    pub fn strike<G>(&mut self, grid: &G, out: &mut Vec<Command>)
    where
        G: GridProvider + ?Sized,
    {
        let candidates = grid.bridge_tiles();
        if candidates.is_empty() {
            log::debug!("no bridge tiles left to damage");
            return;
        }

        let tile = candidates[self.rng.gen_range(0..candidates.len())];
        out.push(Command::DamageTile { tile });
    }

    fn arm(&mut self) {
        self.timers.clear();
        self.interval = self.config.initial_delay;
        self.paused = false;
        self.game_over = false;
        self.timer = Some(self.timers.schedule(self.config.initial_delay, ()));
    }

    fn advance<G>(&mut self, dt: Duration, grid: &G, out: &mut Vec<Command>)
    where
        G: GridProvider + ?Sized,
    {
        let mut fired = Vec::new();
        self.timers.advance(dt, &mut fired);
        if fired.is_empty() {
            return;
        }

        self.strike(grid, out);
        self.timer = Some(self.timers.schedule(self.interval, ()));
        self.sync_suspension();
    }

    fn sync_suspension(&mut self) {
        let Some(handle) = self.timer else {
            return;
        };

        let _ = if self.paused || self.game_over {
            self.timers.pause(handle)
        } else {
            self.timers.resume(handle)
        };
    }
}

impl Default for Damage {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_keeper_core::{Cadence, Intensity, TileCoord, TileKind};

    struct FixedGrid {
        tiles: Vec<TileKind>,
    }

    impl GridProvider for FixedGrid {
        fn dimensions(&self) -> (u32, u32) {
            (self.tiles.len() as u32, 1)
        }

        fn tile(&self, coord: TileCoord) -> TileKind {
            if coord.row() != 0 {
                return TileKind::OutOfBounds;
            }
            self.tiles
                .get(coord.column() as usize)
                .copied()
                .unwrap_or(TileKind::OutOfBounds)
        }

        fn set_tile(&mut self, _coord: TileCoord, _kind: TileKind) {}
    }

    fn loaded() -> Event {
        Event::LevelLoaded {
            intensity: Intensity::INITIAL,
            platforms: 9,
        }
    }

    fn tick(ms: u64) -> Event {
        Event::TimeAdvanced {
            dt: Duration::from_millis(ms),
        }
    }

    #[test]
    fn zero_bridge_grid_produces_no_damage() {
        let grid = FixedGrid {
            tiles: vec![TileKind::Broken, TileKind::Traversable(1)],
        };
        let mut damage = Damage::default();
        let mut out = Vec::new();

        damage.strike(&grid, &mut out);
        damage.handle(&[loaded(), tick(4_000)], &grid, &mut out);

        assert!(out.is_empty());
        assert_eq!(damage.state(), SchedulerState::Armed);
    }

    #[test]
    fn first_firing_waits_for_initial_delay() {
        let grid = FixedGrid {
            tiles: vec![TileKind::Broken, TileKind::BRIDGE],
        };
        let mut damage = Damage::default();
        let mut out = Vec::new();

        damage.handle(&[loaded(), tick(3_999)], &grid, &mut out);
        assert!(out.is_empty());

        damage.handle(&[tick(1)], &grid, &mut out);
        assert_eq!(
            out,
            vec![Command::DamageTile {
                tile: TileCoord::new(1, 0),
            }]
        );
    }

    #[test]
    fn new_interval_applies_from_next_cycle() {
        let grid = FixedGrid {
            tiles: vec![TileKind::BRIDGE],
        };
        let mut damage = Damage::default();
        let mut out = Vec::new();
        let cadence = Cadence {
            damage_interval: Duration::from_millis(1_000),
            spawn_interval: Duration::from_millis(1_000),
        };

        damage.handle(
            &[
                loaded(),
                tick(2_000),
                Event::IntensityRaised {
                    intensity: Intensity::new(2),
                    cadence,
                },
                tick(1_999),
            ],
            &grid,
            &mut out,
        );
        assert!(out.is_empty(), "running timer keeps its initial delay");

        damage.handle(&[tick(1)], &grid, &mut out);
        assert_eq!(out.len(), 1);

        damage.handle(&[tick(1_000)], &grid, &mut out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn pause_and_game_over_suspend_the_timer() {
        let grid = FixedGrid {
            tiles: vec![TileKind::BRIDGE],
        };
        let mut damage = Damage::default();
        let mut out = Vec::new();

        damage.handle(
            &[loaded(), Event::PauseChanged { paused: true }, tick(10_000)],
            &grid,
            &mut out,
        );
        assert!(out.is_empty());
        assert_eq!(damage.state(), SchedulerState::Suspended);

        damage.handle(
            &[
                Event::GameOver,
                Event::PauseChanged { paused: false },
                tick(10_000),
            ],
            &grid,
            &mut out,
        );
        assert!(out.is_empty());
        assert_eq!(damage.state(), SchedulerState::Suspended);

        damage.handle(&[loaded(), tick(4_000)], &grid, &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn unload_cancels_pending_firing() {
        let grid = FixedGrid {
            tiles: vec![TileKind::BRIDGE],
        };
        let mut damage = Damage::default();
        let mut out = Vec::new();

        damage.handle(&[loaded(), Event::LevelUnloaded, tick(10_000)], &grid, &mut out);

        assert!(out.is_empty());
        assert_eq!(damage.state(), SchedulerState::Idle);
    }
}
