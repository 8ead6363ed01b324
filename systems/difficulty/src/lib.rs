#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Difficulty progression driven by unpaused play time.

use std::time::Duration;

use bridge_keeper_core::{Cadence, Command, Event, Intensity};

/// Unpaused play time that must accrue per intensity level.
pub const DEFAULT_INTENSITY_DELAY: Duration = Duration::from_millis(30_000);

const DAMAGE_FLOOR_MS: f64 = 500.0;
const DAMAGE_SPAN_MS: f64 = 3_500.0;
const SPAWN_FLOOR_MS: f64 = 100.0;
const SPAWN_SPAN_MS: f64 = 2_900.0;
const DECAY_HALF_LIFE_LEVELS: f64 = 13.0;

/// Configuration parameters required to construct the difficulty system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    intensity_delay: Duration,
}

impl Config {
    /// Creates a new configuration using the provided time per intensity level.
    #[must_use]
    pub const fn new(intensity_delay: Duration) -> Self {
        Self { intensity_delay }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_INTENSITY_DELAY)
    }
}

/// Damage and spawn intervals for the provided intensity.
///
/// Both decay exponentially, halving their span above the floor every 13 levels.
#[must_use]
pub fn cadence_for(intensity: Intensity) -> Cadence {
    let decay = 1.0 / 2f64.powf(f64::from(intensity.get()) / DECAY_HALF_LIFE_LEVELS);
    Cadence {
        damage_interval: millis(DAMAGE_FLOOR_MS + decay * DAMAGE_SPAN_MS),
        spawn_interval: millis(SPAWN_FLOOR_MS + decay * SPAWN_SPAN_MS),
    }
}

fn millis(value: f64) -> Duration {
    Duration::from_secs_f64(value / 1_000.0)
}

/// Pure system that raises the intensity as unpaused time accrues.
#[derive(Debug)]
pub struct Difficulty {
    config: Config,
    loaded: bool,
    paused: bool,
    game_over: bool,
    elapsed: Duration,
    intensity: Intensity,
}

impl Difficulty {
    /// Creates a new difficulty system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            loaded: false,
            paused: false,
            game_over: false,
            elapsed: Duration::ZERO,
            intensity: Intensity::INITIAL,
        }
    }

    /// Unpaused play time accrued since the level loaded.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Consumes world events to emit intensity increases.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::LevelLoaded { intensity, .. } => {
                    self.loaded = true;
                    self.paused = false;
                    self.game_over = false;
                    self.elapsed = Duration::ZERO;
                    self.intensity = *intensity;
                }
                Event::LevelUnloaded => self.loaded = false,
                Event::PauseChanged { paused } => self.paused = *paused,
                Event::GameOver => self.game_over = true,
                Event::IntensityRaised { intensity, .. } => {
                    self.intensity = self.intensity.max(*intensity);
                }
                Event::TimeAdvanced { dt } => self.advance(*dt, out),
                _ => {}
            }
        }
    }

    fn advance(&mut self, dt: Duration, out: &mut Vec<Command>) {
        if !self.loaded || self.paused {
            return;
        }

        self.elapsed = self.elapsed.saturating_add(dt);
        if self.game_over || self.config.intensity_delay.is_zero() {
            return;
        }

        while self.elapsed > self.threshold() {
            self.intensity = self.intensity.next();
            log::debug!(
                "intensity threshold crossed at {:?}, raising to {}",
                self.elapsed,
                self.intensity.get()
            );
            out.push(Command::RaiseIntensity {
                cadence: cadence_for(self.intensity),
            });
        }
    }

    fn threshold(&self) -> Duration {
        self.config
            .intensity_delay
            .saturating_mul(self.intensity.get())
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn cadence_starts_near_reference_values() {
        let first = cadence_for(Intensity::new(2));
        let decay = 1.0 / 2f64.powf(2.0 / 13.0);
        let expected_ms = 500.0 + decay * 3_500.0;
        assert!((first.damage_interval.as_secs_f64() * 1_000.0 - expected_ms).abs() < 1e-3);
        assert!(first.spawn_interval < Duration::from_millis(3_000));
    }

    #[test]
    fn cadence_decays_toward_floor() {
        let late = cadence_for(Intensity::new(200));
        assert!(late.damage_interval >= Duration::from_millis(500));
        assert!(late.damage_interval < Duration::from_millis(501));
        assert!(late.spawn_interval >= Duration::from_millis(100));
        assert!(late.spawn_interval < Duration::from_millis(101));
        assert!(cadence_for(Intensity::new(3)).damage_interval
            < cadence_for(Intensity::new(2)).damage_interval);
    }

    #[test]
    fn intensity_rises_after_each_delay() {
        let mut difficulty = Difficulty::default();
        let mut out = Vec::new();

        difficulty.handle(&[loaded(), tick(30_000)], &mut out);
        assert!(out.is_empty(), "threshold is exclusive");

        difficulty.handle(&[tick(1)], &mut out);
        assert_eq!(
            out,
            vec![Command::RaiseIntensity {
                cadence: cadence_for(Intensity::new(2)),
            }]
        );
    }

    #[test]
    fn large_jump_skips_several_levels() {
        let mut difficulty = Difficulty::default();
        let mut out = Vec::new();

        difficulty.handle(&[loaded(), tick(95_000)], &mut out);

        assert_eq!(out.len(), 3);
        assert_eq!(
            out.last(),
            Some(&Command::RaiseIntensity {
                cadence: cadence_for(Intensity::new(4)),
            })
        );
    }

    #[test]
    fn paused_time_is_not_counted() {
        let mut difficulty = Difficulty::default();
        let mut out = Vec::new();

        difficulty.handle(
            &[loaded(), Event::PauseChanged { paused: true }, tick(60_000)],
            &mut out,
        );
        assert!(out.is_empty());
        assert_eq!(difficulty.elapsed(), Duration::ZERO);

        difficulty.handle(
            &[Event::PauseChanged { paused: false }, tick(20_000)],
            &mut out,
        );
        assert_eq!(difficulty.elapsed(), Duration::from_millis(20_000));
    }

    #[test]
    fn game_over_freezes_intensity_but_time_accrues() {
        let mut difficulty = Difficulty::default();
        let mut out = Vec::new();

        difficulty.handle(&[loaded(), Event::GameOver, tick(120_000)], &mut out);

        assert!(out.is_empty());
        assert_eq!(difficulty.elapsed(), Duration::from_millis(120_000));
    }

    #[test]
    fn reload_resets_clock() {
        let mut difficulty = Difficulty::default();
        let mut out = Vec::new();

        difficulty.handle(&[loaded(), tick(45_000)], &mut out);
        assert_eq!(out.len(), 1);

        out.clear();
        difficulty.handle(&[loaded(), tick(29_000)], &mut out);
        assert!(out.is_empty());
        assert_eq!(difficulty.elapsed(), Duration::from_millis(29_000));
    }
}
