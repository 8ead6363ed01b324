#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative level state management for Bridge Keeper.

use std::collections::BTreeSet;

use bridge_keeper_core::{
    durability, Cadence, CollapseReport, CollectibleColor, Command, DroppedTile, EffectId, Event,
    GridProvider, Intensity, LevelLayout, LevelPhase, PlayerState, TileCoord, TileKind,
};

mod grid;

pub use grid::BridgeGrid;

/// Fewer active platforms than this ends the level.
pub const GAME_OVER_THRESHOLD: u32 = 3;

/// Represents the authoritative state of the loaded level.
#[derive(Debug, Default)]
pub struct World {
    loaded: bool,
    grid: BridgeGrid,
    tile_size_px: u32,
    platforms: Vec<TileCoord>,
    master: TileCoord,
    respawn: TileCoord,
    active_platforms: u32,
    intensity: Intensity,
    cadence: Option<Cadence>,
    paused: bool,
    phase: LevelPhase,
    player: Player,
    effects: EffectLedger,
}

impl World {
    /// Creates a world with no level loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn load(&mut self, layout: &LevelLayout, out_events: &mut Vec<Event>) {
        if self.loaded {
            self.unload(out_events);
        }

        if let Err(error) = layout.validate() {
            log::error!("rejecting level layout: {error}");
            return;
        }

        self.grid = BridgeGrid::from_layout(layout);
        self.tile_size_px = layout.tile_size_px;
        self.platforms = layout.platforms.clone();
        self.master = layout.master;
        self.respawn = layout.respawn;
        self.active_platforms = u32::try_from(self.platforms.len()).unwrap_or(u32::MAX);
        self.intensity = Intensity::INITIAL;
        self.cadence = None;
        self.paused = false;
        self.phase = LevelPhase::Active;
        self.player = Player::at(layout.player_start);
        self.loaded = true;

        log::info!(
            "loaded {}x{} level with {} platforms, master at {:?}",
            layout.columns,
            layout.rows,
            self.active_platforms,
            self.master
        );
        out_events.push(Event::LevelLoaded {
            intensity: self.intensity,
            platforms: self.active_platforms,
        });
    }

    fn unload(&mut self, out_events: &mut Vec<Event>) {
        let detached = self.effects.detach_all();
        if detached > 0 {
            log::debug!("detached {detached} pending effect completions");
        }
        self.player.fall_effect = None;
        self.grid = BridgeGrid::default();
        self.platforms.clear();
        self.active_platforms = 0;
        self.loaded = false;
        out_events.push(Event::LevelUnloaded);
    }

    fn set_paused(&mut self, paused: bool, out_events: &mut Vec<Event>) {
        if self.paused == paused {
            return;
        }
        self.paused = paused;
        log::debug!("{}", if paused { "pausing" } else { "resuming" });
        out_events.push(Event::PauseChanged { paused });
    }

    fn repair_cracked(&mut self, out_events: &mut Vec<Event>) {
        let changed = durability::repair_all_cracked(&mut self.grid);
        for transition in &changed {
            out_events.push(Event::TileChanged {
                tile: transition.tile,
                from: transition.from,
                to: transition.to,
            });
        }
        out_events.push(Event::CrackedRepaired {
            count: changed.len(),
        });
    }

    fn resolve_collapse(&mut self, report: CollapseReport, out_events: &mut Vec<Event>) {
        for group in report.groups {
            let mut dropped: Vec<DroppedTile> = Vec::with_capacity(group.tiles.len());
            for tile in group.tiles {
                let prior = self.grid.tile(tile.tile);
                if prior == TileKind::OutOfBounds {
                    continue;
                }
                self.grid.set_tile(tile.tile, TileKind::Broken);
                dropped.push(DroppedTile {
                    tile: tile.tile,
                    prior,
                });
            }

            self.active_platforms = self.active_platforms.saturating_sub(group.platforms);
            let effect = self.effects.issue();
            log::info!(
                "dropped section of {} tiles holding {} platforms, {} remain",
                dropped.len(),
                group.platforms,
                self.active_platforms
            );
            out_events.push(Event::SectionCollapsed {
                effect,
                tiles: dropped,
                platforms: group.platforms,
                remaining: self.active_platforms,
            });
        }

        if report.aborted {
            return;
        }

        self.check_player_footing(out_events);

        if self.active_platforms < GAME_OVER_THRESHOLD {
            self.game_over(out_events);
        }
    }

    fn check_player_footing(&mut self, out_events: &mut Vec<Event>) {
        if self.player.state != PlayerState::Stationary {
            return;
        }
        if self.grid.tile(self.player.tile) != TileKind::Broken {
            return;
        }

        let effect = self.effects.issue();
        self.player.state = PlayerState::Falling;
        self.player.fall_effect = Some(effect);
        log::info!("player fell at {:?}", self.player.tile);
        out_events.push(Event::PlayerFalling {
            effect,
            respawn: self.respawn,
        });
    }

    fn finish_fall(&mut self, effect: EffectId, out_events: &mut Vec<Event>) {
        if self.player.fall_effect != Some(effect) {
            log::debug!("ignoring stale fall completion {effect:?}");
            return;
        }

        let _ = self.effects.complete(effect);
        self.player.fall_effect = None;
        self.player.tile = self.respawn;
        self.player.state = match self.phase {
            LevelPhase::Active => PlayerState::Stationary,
            LevelPhase::GameOver => PlayerState::GameOver,
        };
        out_events.push(Event::PlayerRespawned { tile: self.respawn });
    }

    fn game_over(&mut self, out_events: &mut Vec<Event>) {
        if self.phase == LevelPhase::GameOver {
            return;
        }
        self.phase = LevelPhase::GameOver;
        self.player.state = PlayerState::GameOver;
        log::info!(
            "game over at intensity {} with {} platforms left",
            self.intensity.get(),
            self.active_platforms
        );
        out_events.push(Event::GameOver);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::LoadLevel { layout } => {
            world.load(&layout, out_events);
            return;
        }
        Command::UnloadLevel => {
            if world.loaded {
                world.unload(out_events);
            }
            return;
        }
        _ => {}
    }

    if !world.loaded {
        log::debug!("ignoring {command:?} while no level is loaded");
        return;
    }

    match command {
        Command::LoadLevel { .. } | Command::UnloadLevel => {}
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::SetPaused { paused } => world.set_paused(paused, out_events),
        Command::TogglePause => {
            let paused = !world.paused;
            world.set_paused(paused, out_events);
        }
        Command::MovePlayer { tile } => {
            if world.player.state == PlayerState::Stationary {
                world.player.tile = tile;
            }
        }
        Command::DamageTile { tile } => {
            if let Some(transition) = durability::damage_at(&mut world.grid, tile) {
                out_events.push(Event::TileChanged {
                    tile,
                    from: transition.from,
                    to: transition.to,
                });
                if transition.is_break() {
                    out_events.push(Event::TileBroken { tile });
                }
            }
        }
        Command::ReinforceTile { tile } => {
            if world.phase == LevelPhase::GameOver {
                return;
            }
            if let Some(transition) = durability::reinforce_at(&mut world.grid, tile) {
                out_events.push(Event::TileChanged {
                    tile,
                    from: transition.from,
                    to: transition.to,
                });
                out_events.push(Event::TileReinforced { tile });
            }
        }
        Command::RepairCracked => world.repair_cracked(out_events),
        Command::CatchCollectible { color } => {
            if color == CollectibleColor::Gold {
                world.repair_cracked(out_events);
            }
        }
        Command::RaiseIntensity { cadence } => {
            if world.phase == LevelPhase::GameOver {
                return;
            }
            world.intensity = world.intensity.next();
            world.cadence = Some(cadence);
            log::info!("intensity raised to {}", world.intensity.get());
            out_events.push(Event::IntensityRaised {
                intensity: world.intensity,
                cadence,
            });
        }
        Command::ResolveCollapse { report } => world.resolve_collapse(report, out_events),
        Command::SpawnCollectible { spawn, special } => {
            out_events.push(Event::CollectibleSpawned { spawn, special });
        }
        Command::FinishFall { effect } => world.finish_fall(effect, out_events),
        Command::FinishDrop { effect } => {
            if !world.effects.complete(effect) {
                log::debug!("ignoring stale drop completion {effect:?}");
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{BridgeGrid, World};
    use bridge_keeper_core::{Cadence, Intensity, LevelPhase, PlayerState, TileCoord};

    /// Reports whether a level is loaded; scheduled work checks this before acting.
    #[must_use]
    pub fn is_loaded(world: &World) -> bool {
        world.loaded
    }

    /// Provides read-only access to the collision layer.
    #[must_use]
    pub fn grid(world: &World) -> &BridgeGrid {
        &world.grid
    }

    /// Platform anchors tracked for connectivity, in worklist order.
    #[must_use]
    pub fn platforms(world: &World) -> &[TileCoord] {
        &world.platforms
    }

    /// Platform every other platform must stay connected to.
    #[must_use]
    pub fn master_platform(world: &World) -> TileCoord {
        world.master
    }

    /// Tile the player returns to after a fall.
    #[must_use]
    pub fn respawn_tile(world: &World) -> TileCoord {
        world.respawn
    }

    /// Number of platforms not yet dropped.
    #[must_use]
    pub fn active_platforms(world: &World) -> u32 {
        world.active_platforms
    }

    /// Current intensity level.
    #[must_use]
    pub fn intensity(world: &World) -> Intensity {
        world.intensity
    }

    /// Cadence installed by the most recent intensity increase, if any.
    #[must_use]
    pub fn cadence(world: &World) -> Option<Cadence> {
        world.cadence
    }

    /// Reports whether the level is soft paused.
    #[must_use]
    pub fn is_paused(world: &World) -> bool {
        world.paused
    }

    /// Lifecycle phase of the level.
    #[must_use]
    pub fn phase(world: &World) -> LevelPhase {
        world.phase
    }

    /// Tile the player currently stands on.
    #[must_use]
    pub fn player_tile(world: &World) -> TileCoord {
        world.player.tile
    }

    /// Control state of the player.
    #[must_use]
    pub fn player_state(world: &World) -> PlayerState {
        world.player.state
    }

    /// Map size in pixels.
    #[must_use]
    pub fn map_size_px(world: &World) -> (f32, f32) {
        let (columns, rows) = bridge_keeper_core::GridProvider::dimensions(&world.grid);
        let tile = world.tile_size_px as f32;
        (columns as f32 * tile, rows as f32 * tile)
    }

    /// Number of visual effects whose completion is still awaited.
    #[must_use]
    pub fn pending_effects(world: &World) -> usize {
        world.effects.pending.len()
    }
}

#[derive(Clone, Debug, Default)]
struct Player {
    tile: TileCoord,
    state: PlayerState,
    fall_effect: Option<EffectId>,
}

impl Player {
    fn at(tile: TileCoord) -> Self {
        Self {
            tile,
            state: PlayerState::Stationary,
            fall_effect: None,
        }
    }
}

#[derive(Debug, Default)]
struct EffectLedger {
    next: u32,
    pending: BTreeSet<EffectId>,
}

impl EffectLedger {
    fn issue(&mut self) -> EffectId {
        let effect = EffectId::new(self.next);
        self.next = self.next.wrapping_add(1);
        let _ = self.pending.insert(effect);
        effect
    }

    fn complete(&mut self, effect: EffectId) -> bool {
        self.pending.remove(&effect)
    }

    fn detach_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_keeper_core::{CollapsedGroup, StructuralState, Tier, BridgeTile};
    use std::time::Duration;

    fn loaded_world() -> (World, Vec<Event>) {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::LoadLevel {
                layout: Box::new(LevelLayout::reference()),
            },
            &mut events,
        );
        (world, events)
    }

    fn group_at(platform: TileCoord, platforms: u32) -> CollapsedGroup {
        CollapsedGroup {
            platforms,
            tiles: vec![DroppedTile {
                tile: platform,
                prior: TileKind::Traversable(1),
            }],
        }
    }

    #[test]
    fn load_resets_counters_and_announces_level() {
        let (world, events) = loaded_world();

        assert!(query::is_loaded(&world));
        assert_eq!(query::active_platforms(&world), 9);
        assert_eq!(query::intensity(&world), Intensity::INITIAL);
        assert_eq!(query::phase(&world), LevelPhase::Active);
        assert_eq!(
            events,
            vec![Event::LevelLoaded {
                intensity: Intensity::INITIAL,
                platforms: 9,
            }]
        );
    }

    #[test]
    fn invalid_layout_leaves_world_unloaded() {
        let mut world = World::new();
        let mut events = Vec::new();
        let mut layout = LevelLayout::reference();
        layout.platforms.clear();

        apply(
            &mut world,
            Command::LoadLevel {
                layout: Box::new(layout),
            },
            &mut events,
        );

        assert!(!query::is_loaded(&world));
        assert!(events.is_empty());
    }

    #[test]
    fn commands_before_load_are_ignored() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(16),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::DamageTile {
                tile: TileCoord::new(7, 3),
            },
            &mut events,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn damage_reports_change_and_break() {
        let (mut world, _) = loaded_world();
        let tile = TileCoord::new(7, 3);
        let mut events = Vec::new();

        apply(&mut world, Command::DamageTile { tile }, &mut events);
        apply(&mut world, Command::DamageTile { tile }, &mut events);

        let cracked = TileKind::Bridge(BridgeTile::new(Tier::Base, StructuralState::Cracked));
        assert_eq!(
            events,
            vec![
                Event::TileChanged {
                    tile,
                    from: TileKind::BRIDGE,
                    to: cracked,
                },
                Event::TileChanged {
                    tile,
                    from: cracked,
                    to: TileKind::Broken,
                },
                Event::TileBroken { tile },
            ]
        );
    }

    #[test]
    fn reinforce_only_succeeds_on_base_tier() {
        let (mut world, _) = loaded_world();
        let tile = TileCoord::new(7, 3);
        let mut events = Vec::new();

        apply(&mut world, Command::ReinforceTile { tile }, &mut events);
        assert!(events.contains(&Event::TileReinforced { tile }));

        events.clear();
        apply(&mut world, Command::ReinforceTile { tile }, &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn gold_catch_repairs_cracked_tiles() {
        let (mut world, _) = loaded_world();
        let tile = TileCoord::new(7, 3);
        let mut events = Vec::new();
        apply(&mut world, Command::DamageTile { tile }, &mut events);

        events.clear();
        apply(
            &mut world,
            Command::CatchCollectible {
                color: CollectibleColor::Red,
            },
            &mut events,
        );
        assert!(events.is_empty());

        apply(
            &mut world,
            Command::CatchCollectible {
                color: CollectibleColor::Gold,
            },
            &mut events,
        );
        assert_eq!(events.last(), Some(&Event::CrackedRepaired { count: 1 }));
        assert_eq!(query::grid(&world).tile(tile), TileKind::BRIDGE);
    }

    #[test]
    fn collapse_drops_tiles_and_decrements_platforms() {
        let (mut world, _) = loaded_world();
        let platform = TileCoord::new(3, 3);
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::ResolveCollapse {
                report: CollapseReport {
                    groups: vec![group_at(platform, 1)],
                    aborted: false,
                },
            },
            &mut events,
        );

        assert_eq!(query::active_platforms(&world), 8);
        assert_eq!(query::grid(&world).tile(platform), TileKind::Broken);
        assert_eq!(query::pending_effects(&world), 1);
        match &events[0] {
            Event::SectionCollapsed {
                tiles,
                platforms,
                remaining,
                ..
            } => {
                assert_eq!(tiles[0].prior_index(), 1);
                assert_eq!(*platforms, 1);
                assert_eq!(*remaining, 8);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn game_over_fires_once_below_three_platforms() {
        let (mut world, _) = loaded_world();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::ResolveCollapse {
                report: CollapseReport {
                    groups: vec![group_at(TileCoord::new(3, 3), 6)],
                    aborted: false,
                },
            },
            &mut events,
        );
        assert!(!events.contains(&Event::GameOver));
        assert_eq!(query::active_platforms(&world), 3);

        events.clear();
        apply(
            &mut world,
            Command::ResolveCollapse {
                report: CollapseReport {
                    groups: vec![group_at(TileCoord::new(11, 3), 1)],
                    aborted: false,
                },
            },
            &mut events,
        );
        assert_eq!(
            events.iter().filter(|event| **event == Event::GameOver).count(),
            1
        );
        assert_eq!(query::player_state(&world), PlayerState::GameOver);

        events.clear();
        apply(
            &mut world,
            Command::ResolveCollapse {
                report: CollapseReport::default(),
            },
            &mut events,
        );
        assert!(!events.contains(&Event::GameOver));
    }

    #[test]
    fn aborted_pass_skips_game_over_check() {
        let (mut world, _) = loaded_world();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::ResolveCollapse {
                report: CollapseReport {
                    groups: vec![group_at(TileCoord::new(3, 3), 8)],
                    aborted: true,
                },
            },
            &mut events,
        );

        assert_eq!(query::active_platforms(&world), 1);
        assert_eq!(query::phase(&world), LevelPhase::Active);
    }

    #[test]
    fn player_on_broken_tile_falls_and_respawns() {
        let (mut world, _) = loaded_world();
        let platform = TileCoord::new(3, 3);
        let mut events = Vec::new();
        apply(&mut world, Command::MovePlayer { tile: platform }, &mut events);

        apply(
            &mut world,
            Command::ResolveCollapse {
                report: CollapseReport {
                    groups: vec![group_at(platform, 1)],
                    aborted: false,
                },
            },
            &mut events,
        );

        let effect = events
            .iter()
            .find_map(|event| match event {
                Event::PlayerFalling { effect, respawn } => {
                    assert_eq!(*respawn, TileCoord::new(11, 19));
                    Some(*effect)
                }
                _ => None,
            })
            .expect("player should fall");
        assert_eq!(query::player_state(&world), PlayerState::Falling);

        events.clear();
        apply(&mut world, Command::FinishFall { effect }, &mut events);
        assert_eq!(
            events,
            vec![Event::PlayerRespawned {
                tile: TileCoord::new(11, 19),
            }]
        );
        assert_eq!(query::player_state(&world), PlayerState::Stationary);
        assert_eq!(query::player_tile(&world), TileCoord::new(11, 19));
    }

    #[test]
    fn reload_detaches_pending_completions() {
        let (mut world, _) = loaded_world();
        let platform = TileCoord::new(3, 3);
        let mut events = Vec::new();
        apply(&mut world, Command::MovePlayer { tile: platform }, &mut events);
        apply(
            &mut world,
            Command::ResolveCollapse {
                report: CollapseReport {
                    groups: vec![group_at(platform, 1)],
                    aborted: false,
                },
            },
            &mut events,
        );
        assert_eq!(query::pending_effects(&world), 2);

        events.clear();
        apply(
            &mut world,
            Command::LoadLevel {
                layout: Box::new(LevelLayout::reference()),
            },
            &mut events,
        );
        assert_eq!(events[0], Event::LevelUnloaded);
        assert_eq!(query::pending_effects(&world), 0);

        events.clear();
        apply(
            &mut world,
            Command::FinishFall {
                effect: EffectId::new(1),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::FinishDrop {
                effect: EffectId::new(0),
            },
            &mut events,
        );
        assert!(events.is_empty());
        assert_eq!(query::player_tile(&world), TileCoord::new(11, 19));
        assert_eq!(query::active_platforms(&world), 9);
    }

    #[test]
    fn pause_changes_are_reported_once() {
        let (mut world, _) = loaded_world();
        let mut events = Vec::new();

        apply(&mut world, Command::SetPaused { paused: true }, &mut events);
        apply(&mut world, Command::SetPaused { paused: true }, &mut events);
        apply(&mut world, Command::TogglePause, &mut events);

        assert_eq!(
            events,
            vec![
                Event::PauseChanged { paused: true },
                Event::PauseChanged { paused: false },
            ]
        );
    }

    #[test]
    fn intensity_is_frozen_after_game_over() {
        let (mut world, _) = loaded_world();
        let cadence = Cadence {
            damage_interval: Duration::from_millis(3_000),
            spawn_interval: Duration::from_millis(2_000),
        };
        let mut events = Vec::new();

        apply(&mut world, Command::RaiseIntensity { cadence }, &mut events);
        assert_eq!(query::intensity(&world), Intensity::new(2));
        assert_eq!(query::cadence(&world), Some(cadence));

        apply(
            &mut world,
            Command::ResolveCollapse {
                report: CollapseReport {
                    groups: vec![group_at(TileCoord::new(3, 3), 7)],
                    aborted: false,
                },
            },
            &mut events,
        );
        apply(&mut world, Command::RaiseIntensity { cadence }, &mut events);
        assert_eq!(query::intensity(&world), Intensity::new(2));
    }
}
