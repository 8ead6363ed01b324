use std::time::Duration;

use bridge_keeper_core::{
    schedule::Scheduler, CollectibleColor, Command, Event, GridProvider, LevelLayout,
    LevelPhase, Tier, TileCoord, TileKind,
};
use bridge_keeper_orchestrator::{Config, LevelOrchestrator};
use bridge_keeper_world::query;

/// Reference duration of the fall and debris tweens.
pub(crate) const DEFAULT_EFFECT_DURATION: Duration = Duration::from_millis(2_000);

/// Outcome of a headless run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Summary {
    pub(crate) elapsed: Duration,
    pub(crate) intensity: u32,
    pub(crate) active_platforms: u32,
    pub(crate) game_over: bool,
    pub(crate) collapses: u32,
    pub(crate) falls: u32,
    pub(crate) spawns: u32,
    pub(crate) reinforced: u32,
    pub(crate) repaired: usize,
}

/// Runs one level on a virtual clock with a scripted player.
#[derive(Debug)]
pub(crate) struct Session {
    orchestrator: LevelOrchestrator,
    effects: Scheduler<Command>,
    effect_duration: Duration,
    summary: Summary,
}

impl Session {
    pub(crate) fn new(config: Config, effect_duration: Duration) -> Self {
        Self {
            orchestrator: LevelOrchestrator::new(config),
            effects: Scheduler::new(),
            effect_duration,
            summary: Summary::default(),
        }
    }

    pub(crate) fn load(&mut self, layout: LevelLayout) {
        self.orchestrator.load_level(layout);
        self.react();
    }

    /// Advances the level in steps of `tick` until `duration` has elapsed.
    pub(crate) fn run(&mut self, duration: Duration, tick: Duration) -> Summary {
        let tick = tick.max(Duration::from_millis(1));
        while self.summary.elapsed < duration {
            let step = tick.min(duration - self.summary.elapsed);
            self.summary.elapsed += step;
            self.orchestrator.advance(step);

            let mut completions = Vec::new();
            self.effects.advance(step, &mut completions);
            for command in completions {
                self.orchestrator.submit(command);
            }
            self.react();
        }
        self.finish()
    }

    fn finish(&mut self) -> Summary {
        let world = self.orchestrator.world();
        self.summary.intensity = query::intensity(world).get();
        self.summary.active_platforms = query::active_platforms(world);
        self.summary.game_over = query::phase(world) == LevelPhase::GameOver;
        self.summary.clone()
    }

    fn react(&mut self) {
        let events = self.orchestrator.drain_events();
        if events.is_empty() {
            return;
        }

        let mut follow_up = Vec::new();
        for event in &events {
            match event {
                Event::LevelLoaded { .. } => {
                    self.summary = Summary {
                        elapsed: self.summary.elapsed,
                        ..Summary::default()
                    };
                }
                Event::LevelUnloaded => self.effects.clear(),
                Event::SectionCollapsed { effect, .. } => {
                    self.summary.collapses += 1;
                    let _ = self
                        .effects
                        .schedule(self.effect_duration, Command::FinishDrop { effect: *effect });
                }
                Event::PlayerFalling { effect, .. } => {
                    self.summary.falls += 1;
                    let _ = self
                        .effects
                        .schedule(self.effect_duration, Command::FinishFall { effect: *effect });
                }
                Event::CollectibleSpawned { spawn, special } => {
                    self.summary.spawns += 1;
                    if *special || spawn.color == CollectibleColor::Gold {
                        follow_up.push(Command::CatchCollectible { color: spawn.color });
                    } else if let Some(tile) = self.closest_base_tile() {
                        follow_up.push(Command::ReinforceTile { tile });
                    }
                }
                Event::TileReinforced { .. } => self.summary.reinforced += 1,
                Event::CrackedRepaired { count } => self.summary.repaired += count,
                Event::GameOver => {
                    log::info!("level lost after {:?}", self.summary.elapsed);
                }
                _ => {}
            }
        }

        if follow_up.is_empty() {
            return;
        }
        for command in follow_up {
            self.orchestrator.submit(command);
        }
        self.react();
    }

    fn closest_base_tile(&self) -> Option<TileCoord> {
        let world = self.orchestrator.world();
        let grid = query::grid(world);
        let player = query::player_tile(world);
        grid.bridge_tiles()
            .into_iter()
            .filter(|tile| {
                matches!(grid.tile(*tile), TileKind::Bridge(bridge) if bridge.tier() == Tier::Base)
            })
            .min_by_key(|tile| manhattan(*tile, player))
    }
}

fn manhattan(a: TileCoord, b: TileCoord) -> u32 {
    a.column().abs_diff(b.column()) + a.row().abs_diff(b.row())
}
