#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for emitting collectible spawn commands.

use std::time::Duration;

use bridge_keeper_core::{
    schedule::{Scheduler, TimerHandle},
    CollectibleColor, Command, Direction, Event, Intensity, SpawnEvent,
};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Delay before the first spawn after a level loads.
pub const DEFAULT_FIRST_DELAY: Duration = Duration::from_millis(1_000);
/// Base spawn interval before the first intensity increase.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(3_000);
/// Half-width of the uniform jitter added to every reschedule.
pub const DEFAULT_JITTER: Duration = Duration::from_millis(500);
/// Distance kept from the map corners when choosing an edge point, in pixels.
pub const DEFAULT_EDGE_INSET_PX: f32 = 10.0;

const RED_BASE_WEIGHT: u32 = 6;

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    first_delay: Duration,
    interval: Duration,
    jitter: Duration,
    edge_inset_px: f32,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided spawn cadence and seed.
    #[must_use]
    pub const fn new(first_delay: Duration, interval: Duration, rng_seed: u64) -> Self {
        Self {
            first_delay,
            interval,
            jitter: DEFAULT_JITTER,
            edge_inset_px: DEFAULT_EDGE_INSET_PX,
            rng_seed,
        }
    }

    /// Replaces the reschedule jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Replaces the corner inset used when picking edge points.
    #[must_use]
    pub fn with_edge_inset(mut self, edge_inset_px: f32) -> Self {
        self.edge_inset_px = edge_inset_px;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_FIRST_DELAY, DEFAULT_INTERVAL, 0)
    }
}

/// Weights of the normal spawn pool at one intensity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorPool {
    /// Entries of yellow collectibles.
    pub yellow: u32,
    /// Entries of blue collectibles.
    pub blue: u32,
    /// Entries of red collectibles.
    pub red: u32,
}

impl ColorPool {
    /// Total number of entries in the pool.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.yellow + self.blue + self.red
    }

    /// Color stored at the pool entry, with yellows first, then blues, then reds.
    #[must_use]
    pub const fn pick(&self, entry: u32) -> CollectibleColor {
        if entry < self.yellow {
            CollectibleColor::Yellow
        } else if entry < self.yellow + self.blue {
            CollectibleColor::Blue
        } else {
            CollectibleColor::Red
        }
    }
}

/// Composition of the normal spawn pool at the provided intensity.
#[must_use]
pub const fn color_pool(intensity: Intensity) -> ColorPool {
    let level = intensity.get();
    let yellow = level / 3 * 2;
    let blue = level.saturating_sub(2) / 3;
    ColorPool {
        yellow,
        blue,
        red: RED_BASE_WEIGHT + 2 * blue,
    }
}

/// Pure system that emits collectible spawns on a jittered recurring timer.
#[derive(Debug)]
pub struct Spawning {
    config: Config,
    rng: ChaCha8Rng,
    timers: Scheduler<()>,
    timer: Option<TimerHandle>,
    interval: Duration,
    intensity: Intensity,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            timers: Scheduler::new(),
            timer: None,
            interval: config.interval,
            intensity: Intensity::INITIAL,
        }
    }

    /// Delay left before the next normal spawn, if one is scheduled.
    #[must_use]
    pub fn next_spawn_in(&self) -> Option<Duration> {
        self.timer.and_then(|handle| self.timers.remaining(handle))
    }

    /// Consumes events and the map size in pixels to emit spawn commands.
    pub fn handle(&mut self, events: &[Event], map_size: Vec2, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::LevelLoaded { intensity, .. } => {
                    self.timers.clear();
                    self.intensity = *intensity;
                    self.interval = self.config.interval;
                    self.timer = Some(self.timers.schedule(self.config.first_delay, ()));
                }
                Event::LevelUnloaded => {
                    self.timers.clear();
                    self.timer = None;
                }
                Event::IntensityRaised { intensity, cadence } => {
                    self.intensity = *intensity;
                    self.interval = cadence.spawn_interval;
                    if intensity.triggers_special_spawn() {
                        log::info!("intensity {} grants a gold spawn", intensity.get());
                        let spawn = self.spawn_event(map_size, CollectibleColor::Gold);
                        out.push(Command::SpawnCollectible {
                            spawn,
                            special: true,
                        });
                    }
                }
                Event::PauseChanged { paused } => {
                    if let Some(handle) = self.timer {
                        let _ = if *paused {
                            self.timers.pause(handle)
                        } else {
                            self.timers.resume(handle)
                        };
                    }
                }
                Event::TimeAdvanced { dt } => self.advance(*dt, map_size, out),
                _ => {}
            }
        }
    }

    fn advance(&mut self, dt: Duration, map_size: Vec2, out: &mut Vec<Command>) {
        let mut fired = Vec::new();
        self.timers.advance(dt, &mut fired);
        if fired.is_empty() {
            return;
        }

        let color = self.next_color();
        let spawn = self.spawn_event(map_size, color);
        out.push(Command::SpawnCollectible {
            spawn,
            special: false,
        });

        let delay = self.next_delay();
        self.timer = Some(self.timers.schedule(delay, ()));
    }

    fn next_color(&mut self) -> CollectibleColor {
        let pool = color_pool(self.intensity);
        let entry = self.rng.gen_range(0..pool.total());
        pool.pick(entry)
    }

    fn next_delay(&mut self) -> Duration {
        let jitter = self.config.jitter.as_secs_f64();
        let offset = self.rng.gen::<f64>() * 2.0 * jitter - jitter;
        let seconds = (self.interval.as_secs_f64() + offset).max(0.0);
        Duration::from_secs_f64(seconds)
    }

    fn spawn_event(&mut self, map_size: Vec2, color: CollectibleColor) -> SpawnEvent {
        let along_x = self.rng.gen::<f64>() > 0.5;
        let far_side = self.rng.gen::<f64>() > 0.5;
        let inset = self.config.edge_inset_px;
        let span = if along_x { map_size.x } else { map_size.y };
        let usable = (span - 2.0 * inset).max(0.0);
        let offset = self.rng.gen::<f32>() * usable + inset.min(span / 2.0);

        let (position, facing) = if along_x {
            if far_side {
                (Vec2::new(offset, map_size.y), Direction::North)
            } else {
                (Vec2::new(offset, 0.0), Direction::South)
            }
        } else if far_side {
            (Vec2::new(map_size.x, offset), Direction::West)
        } else {
            (Vec2::new(0.0, offset), Direction::East)
        };

        SpawnEvent {
            position,
            facing,
            color,
        }
    }
}

impl Default for Spawning {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_matches_reference_weights() {
        assert_eq!(
            color_pool(Intensity::new(9)),
            ColorPool {
                yellow: 4,
                blue: 2,
                red: 10,
            }
        );
        assert_eq!(color_pool(Intensity::new(9)).total(), 16);
        assert_eq!(
            color_pool(Intensity::INITIAL),
            ColorPool {
                yellow: 0,
                blue: 0,
                red: 6,
            }
        );
    }

    #[test]
    fn pool_entries_are_ordered_by_color() {
        let pool = color_pool(Intensity::new(9));
        assert_eq!(pool.pick(0), CollectibleColor::Yellow);
        assert_eq!(pool.pick(3), CollectibleColor::Yellow);
        assert_eq!(pool.pick(4), CollectibleColor::Blue);
        assert_eq!(pool.pick(5), CollectibleColor::Blue);
        assert_eq!(pool.pick(6), CollectibleColor::Red);
        assert_eq!(pool.pick(15), CollectibleColor::Red);
    }

    #[test]
    fn delay_never_goes_negative() {
        let mut spawning = Spawning::new(
            Config::new(Duration::ZERO, Duration::from_millis(100), 42)
                .with_jitter(Duration::from_millis(500)),
        );
        let delays: Vec<Duration> = (0..64).map(|_| spawning.next_delay()).collect();
        assert!(delays.iter().all(|delay| *delay <= Duration::from_millis(600)));
        assert!(delays.contains(&Duration::ZERO));
    }
}
