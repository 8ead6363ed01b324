use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use bridge_keeper_core::LevelLayout;
use bridge_keeper_orchestrator::Config;
use bridge_keeper_system_connectivity as connectivity;
use bridge_keeper_system_damage as damage;
use bridge_keeper_system_difficulty as difficulty;
use bridge_keeper_system_spawning as spawning;
use serde::Deserialize;

/// Tuning overrides read from a TOML settings file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    /// Seed shared by every randomised system.
    pub(crate) seed: u64,
    /// Duration of the fall and debris animations, in milliseconds.
    pub(crate) effect_duration_ms: Option<u64>,
    pub(crate) damage: DamageSettings,
    pub(crate) difficulty: DifficultySettings,
    pub(crate) spawning: SpawningSettings,
    pub(crate) connectivity: ConnectivitySettings,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DamageSettings {
    pub(crate) initial_delay_ms: u64,
}

impl Default for DamageSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: millis(damage::DEFAULT_INITIAL_DELAY),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DifficultySettings {
    pub(crate) intensity_delay_ms: u64,
}

impl Default for DifficultySettings {
    fn default() -> Self {
        Self {
            intensity_delay_ms: millis(difficulty::DEFAULT_INTENSITY_DELAY),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SpawningSettings {
    pub(crate) first_delay_ms: u64,
    pub(crate) interval_ms: u64,
    pub(crate) jitter_ms: u64,
    pub(crate) edge_inset_px: f32,
}

impl Default for SpawningSettings {
    fn default() -> Self {
        Self {
            first_delay_ms: millis(spawning::DEFAULT_FIRST_DELAY),
            interval_ms: millis(spawning::DEFAULT_INTERVAL),
            jitter_ms: millis(spawning::DEFAULT_JITTER),
            edge_inset_px: spawning::DEFAULT_EDGE_INSET_PX,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ConnectivitySettings {
    pub(crate) iteration_cap: usize,
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        Self {
            iteration_cap: connectivity::DEFAULT_ITERATION_CAP,
        }
    }
}

impl Settings {
    /// Reads settings from the file, or returns the defaults when no path is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse settings at {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid settings toml")
    }

    /// Builds the system configuration described by the settings.
    pub(crate) fn config(&self) -> Config {
        Config {
            connectivity: connectivity::Config::new(self.connectivity.iteration_cap),
            damage: damage::Config::new(
                Duration::from_millis(self.damage.initial_delay_ms),
                self.seed,
            ),
            difficulty: difficulty::Config::new(Duration::from_millis(
                self.difficulty.intensity_delay_ms,
            )),
            // Spawning uses the seed after the damage seed.
            spawning: spawning::Config::new(
                Duration::from_millis(self.spawning.first_delay_ms),
                Duration::from_millis(self.spawning.interval_ms),
                self.seed.wrapping_add(1),
            )
            .with_jitter(Duration::from_millis(self.spawning.jitter_ms))
            .with_edge_inset(self.spawning.edge_inset_px),
        }
    }
}

/// Reads a TOML map file, or builds the reference layout when no path is given.
pub(crate) fn load_layout(path: Option<&Path>) -> Result<LevelLayout> {
    let layout = match path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read map at {}", path.display()))?;
            toml::from_str::<LevelLayout>(&contents)
                .with_context(|| format!("failed to parse map at {}", path.display()))?
        }
        None => LevelLayout::reference(),
    };
    layout.validate().context("map failed validation")?;
    Ok(layout)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
