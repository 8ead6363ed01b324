#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Level orchestration that routes world events through every system.
//!
//! Each submitted command is applied to the [`World`], and the resulting
//! events are handed to the systems. Commands they emit are applied in turn
//! until a round produces no further events. Every event broadcast along the
//! way is queued for the external collaborators, which drain it with
//! [`LevelOrchestrator::drain_events`].

use std::time::Duration;

use bridge_keeper_core::{Command, Event, LevelLayout};
use bridge_keeper_system_connectivity::{self as connectivity, Connectivity};
use bridge_keeper_system_damage::{self as damage, Damage};
use bridge_keeper_system_difficulty::{self as difficulty, Difficulty};
use bridge_keeper_system_spawning::{self as spawning, Spawning};
use bridge_keeper_world::{self as world, query, World};
use glam::Vec2;

/// Rounds allowed before a single submission is considered runaway.
const MAX_ROUNDS: usize = 64;

/// Configuration for every system composed by the orchestrator.
#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    /// Connectivity analysis settings.
    pub connectivity: connectivity::Config,
    /// Damage scheduling settings.
    pub damage: damage::Config,
    /// Difficulty progression settings.
    pub difficulty: difficulty::Config,
    /// Spawn scheduling settings.
    pub spawning: spawning::Config,
}

/// Owns the world and systems of one running level.
#[derive(Debug)]
pub struct LevelOrchestrator {
    world: World,
    connectivity: Connectivity,
    damage: Damage,
    difficulty: Difficulty,
    spawning: Spawning,
    outbox: Vec<Event>,
}

impl LevelOrchestrator {
    /// Creates an orchestrator with no level loaded.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            world: World::new(),
            connectivity: Connectivity::new(config.connectivity),
            damage: Damage::new(config.damage),
            difficulty: Difficulty::new(config.difficulty),
            spawning: Spawning::new(config.spawning),
            outbox: Vec::new(),
        }
    }

    /// Read-only access to the authoritative world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Loads the layout, discarding any level that is currently running.
    pub fn load_level(&mut self, layout: LevelLayout) {
        self.submit(Command::LoadLevel {
            layout: Box::new(layout),
        });
    }

    /// Advances the shared clock by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.submit(Command::Tick { dt });
    }

    /// Applies the command and settles every follow-up it causes.
    pub fn submit(&mut self, command: Command) {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        self.settle(events);
    }

    /// Removes and returns the events broadcast since the previous drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }

    fn settle(&mut self, mut events: Vec<Event>) {
        let mut rounds = 0;
        while !events.is_empty() {
            rounds += 1;
            if rounds > MAX_ROUNDS {
                log::warn!("dropping {} events after {MAX_ROUNDS} rounds", events.len());
                break;
            }

            let mut commands = Vec::new();
            self.dispatch(&events, &mut commands);
            self.outbox.append(&mut events);

            for command in commands {
                world::apply(&mut self.world, command, &mut events);
            }
        }
    }

    fn dispatch(&mut self, events: &[Event], commands: &mut Vec<Command>) {
        let grid = query::grid(&self.world);
        self.connectivity.handle(
            events,
            grid,
            query::platforms(&self.world),
            query::master_platform(&self.world),
            query::active_platforms(&self.world),
            commands,
        );
        self.damage.handle(events, grid, commands);
        self.difficulty.handle(events, commands);

        let (width, height) = query::map_size_px(&self.world);
        self.spawning
            .handle(events, Vec2::new(width, height), commands);
    }
}

impl Default for LevelOrchestrator {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
