#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Bridge Keeper engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! views of the bridge grid, and respond exclusively with new command batches.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub mod durability;
mod layout;
pub mod schedule;

pub use layout::{LayoutError, LevelLayout, REFERENCE_MAP_SIZE, REFERENCE_TILE_SIZE_PX};

/// Tile index of a base-tier bridge tile that is structurally intact.
pub const BRIDGE_BASE_INTACT_INDEX: i32 = 2;
/// Tile index of a base-tier bridge tile that is cracked.
pub const BRIDGE_BASE_CRACKED_INDEX: i32 = 3;
/// Tile index of a reinforced bridge tile that is structurally intact.
pub const BRIDGE_REINFORCED_INTACT_INDEX: i32 = 4;
/// Tile index of a reinforced bridge tile that is cracked.
pub const BRIDGE_REINFORCED_CRACKED_INDEX: i32 = 5;
/// Tile index of an impassable gap.
pub const BROKEN_INDEX: i32 = 6;
/// Tile index reported for a coordinate that holds no tile at all.
pub const EMPTY_INDEX: i32 = -1;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Discards any loaded level and loads the provided layout.
    LoadLevel {
        /// Fully materialised static map data for the level.
        layout: Box<LevelLayout>,
    },
    /// Tears the current level down without loading a replacement.
    UnloadLevel,
    /// Advances the shared clock by the provided delta time.
    Tick {
        /// Duration of time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Enters or leaves the soft pause state.
    SetPaused {
        /// Whether the level should be paused after the command.
        paused: bool,
    },
    /// Flips the soft pause state.
    TogglePause,
    /// Reports the tile currently beneath the player.
    MovePlayer {
        /// Tile the player stands on.
        tile: TileCoord,
    },
    /// Applies one damage transition to the tile at the provided coordinate.
    DamageTile {
        /// Coordinate of the tile to damage.
        tile: TileCoord,
    },
    /// Attempts to promote a base-tier bridge tile to the reinforced tier.
    ReinforceTile {
        /// Coordinate of the tile to reinforce.
        tile: TileCoord,
    },
    /// Restores every cracked bridge tile to the intact state at its tier.
    RepairCracked,
    /// Reports that the player caught a collectible of the provided color.
    CatchCollectible {
        /// Color of the caught collectible.
        color: CollectibleColor,
    },
    /// Advances the intensity level by one and installs the matching cadence.
    RaiseIntensity {
        /// Damage and spawn intervals that apply at the new intensity.
        cadence: Cadence,
    },
    /// Applies the outcome of a connectivity pass.
    ResolveCollapse {
        /// Platform groups found disconnected from the master platform.
        report: CollapseReport,
    },
    /// Hands a generated spawn to the actor-creation collaborator.
    SpawnCollectible {
        /// Spawn parameters.
        spawn: SpawnEvent,
        /// Whether the spawn is the one-shot special spawn.
        special: bool,
    },
    /// Signals that the fall animation identified by the effect finished.
    FinishFall {
        /// Effect token handed out with [`Event::PlayerFalling`].
        effect: EffectId,
    },
    /// Signals that the debris animation identified by the effect finished.
    FinishDrop {
        /// Effect token handed out with [`Event::SectionCollapsed`].
        effect: EffectId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that a level finished loading and the counters were reset.
    LevelLoaded {
        /// Intensity the level starts at.
        intensity: Intensity,
        /// Number of platforms tracked for connectivity.
        platforms: u32,
    },
    /// Announces that the level was torn down.
    LevelUnloaded,
    /// Indicates that the shared clock advanced.
    TimeAdvanced {
        /// Duration of time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces a change of the soft pause state.
    PauseChanged {
        /// Whether the level is paused after the change.
        paused: bool,
    },
    /// Reports that a tile changed kind.
    TileChanged {
        /// Coordinate of the tile.
        tile: TileCoord,
        /// Kind held before the change.
        from: TileKind,
        /// Kind held after the change.
        to: TileKind,
    },
    /// Reports that damage turned a bridge tile into a gap.
    TileBroken {
        /// Coordinate of the broken tile.
        tile: TileCoord,
    },
    /// Confirms that a reinforcement request took effect.
    TileReinforced {
        /// Coordinate of the reinforced tile.
        tile: TileCoord,
    },
    /// Reports the outcome of a global crack repair.
    CrackedRepaired {
        /// Number of tiles restored to the intact state.
        count: usize,
    },
    /// Announces that the intensity level advanced.
    IntensityRaised {
        /// Intensity after the increment.
        intensity: Intensity,
        /// Cadence installed for the new intensity.
        cadence: Cadence,
    },
    /// Announces a spawn to the actor-creation collaborator.
    CollectibleSpawned {
        /// Spawn parameters.
        spawn: SpawnEvent,
        /// Whether the spawn is the one-shot special spawn.
        special: bool,
    },
    /// Reports a platform group that was cut off and dropped.
    SectionCollapsed {
        /// Token the decorative-drop collaborator answers with [`Command::FinishDrop`].
        effect: EffectId,
        /// Coordinates converted to gaps together with their prior tile kind.
        tiles: Vec<DroppedTile>,
        /// Number of platforms contained in the group.
        platforms: u32,
        /// Active platforms remaining after the group was removed.
        remaining: u32,
    },
    /// Reports that the player lost their footing.
    PlayerFalling {
        /// Token the fall collaborator answers with [`Command::FinishFall`].
        effect: EffectId,
        /// Tile the player is placed on once the fall completes.
        respawn: TileCoord,
    },
    /// Confirms that a completed fall moved the player to the respawn tile.
    PlayerRespawned {
        /// Tile the player now occupies.
        tile: TileCoord,
    },
    /// Announces that too few platforms remain and the level is lost.
    GameOver,
}

/// Location of a single grid tile expressed as column and row coordinates.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileCoord {
    column: u32,
    row: u32,
}

impl TileCoord {
    /// Creates a new grid tile coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Reports whether the coordinate lies inside a grid of the given size.
    #[must_use]
    pub const fn is_within(&self, columns: u32, rows: u32) -> bool {
        self.column < columns && self.row < rows
    }

    /// Iterates the 4-neighbourhood in north, east, south, west order,
    /// skipping neighbours that fall outside a grid of the given size.
    pub fn neighbors(self, columns: u32, rows: u32) -> impl Iterator<Item = TileCoord> {
        let mut candidates = [None; 4];
        let mut count = 0;

        if let Some(row) = self.row.checked_sub(1) {
            candidates[count] = Some(TileCoord::new(self.column, row));
            count += 1;
        }

        if let Some(column) = self.column.checked_add(1) {
            if column < columns {
                candidates[count] = Some(TileCoord::new(column, self.row));
                count += 1;
            }
        }

        if let Some(row) = self.row.checked_add(1) {
            if row < rows {
                candidates[count] = Some(TileCoord::new(self.column, row));
                count += 1;
            }
        }

        if let Some(column) = self.column.checked_sub(1) {
            candidates[count] = Some(TileCoord::new(column, self.row));
            count += 1;
        }

        candidates.into_iter().take(count).flatten()
    }
}

/// Durability layer of a bridge tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Unreinforced planks.
    Base,
    /// Planks glued by the player; absorbs one hit without structural damage.
    Reinforced,
}

/// Structural state of a bridge tile, independent of its tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructuralState {
    /// Undamaged.
    Intact,
    /// One hit away from breaking once the tier is exhausted.
    Cracked,
}

/// Tier and structural state of a bridge tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BridgeTile {
    tier: Tier,
    state: StructuralState,
}

impl BridgeTile {
    /// Creates a bridge tile with the provided tier and structural state.
    #[must_use]
    pub const fn new(tier: Tier, state: StructuralState) -> Self {
        Self { tier, state }
    }

    /// Durability layer of the tile.
    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    /// Structural state of the tile.
    #[must_use]
    pub const fn state(&self) -> StructuralState {
        self.state
    }

    /// Tile index rendered for this tier and state pair.
    #[must_use]
    pub const fn index(&self) -> i32 {
        match (self.tier, self.state) {
            (Tier::Base, StructuralState::Intact) => BRIDGE_BASE_INTACT_INDEX,
            (Tier::Base, StructuralState::Cracked) => BRIDGE_BASE_CRACKED_INDEX,
            (Tier::Reinforced, StructuralState::Intact) => BRIDGE_REINFORCED_INTACT_INDEX,
            (Tier::Reinforced, StructuralState::Cracked) => BRIDGE_REINFORCED_CRACKED_INDEX,
        }
    }
}

/// Kind of tile stored at a grid coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// No tile present.
    Empty,
    /// Floor that is not part of the bridge model, tagged with its tile index.
    Traversable(u16),
    /// Bridge planks that can be damaged and reinforced.
    Bridge(BridgeTile),
    /// Impassable gap.
    Broken,
    /// Sentinel returned for coordinates outside the map; never stored.
    OutOfBounds,
}

impl TileKind {
    /// Base-tier intact bridge tile.
    pub const BRIDGE: Self = Self::Bridge(BridgeTile::new(Tier::Base, StructuralState::Intact));

    /// Decodes a persisted tile index.
    #[must_use]
    pub fn from_index(index: i32) -> Self {
        match index {
            BRIDGE_BASE_INTACT_INDEX => Self::BRIDGE,
            BRIDGE_BASE_CRACKED_INDEX => {
                Self::Bridge(BridgeTile::new(Tier::Base, StructuralState::Cracked))
            }
            BRIDGE_REINFORCED_INTACT_INDEX => {
                Self::Bridge(BridgeTile::new(Tier::Reinforced, StructuralState::Intact))
            }
            BRIDGE_REINFORCED_CRACKED_INDEX => {
                Self::Bridge(BridgeTile::new(Tier::Reinforced, StructuralState::Cracked))
            }
            BROKEN_INDEX => Self::Broken,
            other => match u16::try_from(other) {
                Ok(value) => Self::Traversable(value),
                Err(_) => Self::Empty,
            },
        }
    }

    /// Persisted tile index; `-1` for empty and out-of-bounds coordinates.
    #[must_use]
    pub fn index(&self) -> i32 {
        match self {
            Self::Empty | Self::OutOfBounds => EMPTY_INDEX,
            Self::Traversable(value) => i32::from(*value),
            Self::Bridge(bridge) => bridge.index(),
            Self::Broken => BROKEN_INDEX,
        }
    }

    /// Reports whether the tile belongs to the bridge model.
    #[must_use]
    pub const fn is_bridge(&self) -> bool {
        matches!(self, Self::Bridge(_))
    }

    /// Reports whether a flood fill may pass through the tile.
    #[must_use]
    pub const fn is_passable(&self) -> bool {
        !matches!(self, Self::Broken | Self::OutOfBounds)
    }
}

/// Read/write access to the tile layer consulted for connectivity.
pub trait GridProvider {
    /// Number of columns and rows in the map.
    fn dimensions(&self) -> (u32, u32);

    /// Kind of tile at the coordinate, or [`TileKind::OutOfBounds`] outside the map.
    fn tile(&self, coord: TileCoord) -> TileKind;

    /// Replaces the tile at the coordinate. Writes outside the map are ignored.
    fn set_tile(&mut self, coord: TileCoord, kind: TileKind);

    /// Clears the coordinate to [`TileKind::Empty`].
    fn remove_tile(&mut self, coord: TileCoord) {
        self.set_tile(coord, TileKind::Empty);
    }

    /// Reports whether the coordinate lies inside the map.
    fn contains(&self, coord: TileCoord) -> bool {
        let (columns, rows) = self.dimensions();
        coord.is_within(columns, rows)
    }

    /// Coordinates of every bridge tile in row-major order.
    fn bridge_tiles(&self) -> Vec<TileCoord> {
        let (columns, rows) = self.dimensions();
        let mut found = Vec::new();
        for row in 0..rows {
            for column in 0..columns {
                let coord = TileCoord::new(column, row);
                if self.tile(coord).is_bridge() {
                    found.push(coord);
                }
            }
        }
        found
    }
}

/// Monotonic difficulty level driving damage cadence and spawn composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Intensity(u32);

impl Intensity {
    /// Intensity every level starts at.
    pub const INITIAL: Self = Self(1);

    /// Creates an intensity level, clamping to at least one.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        if value == 0 {
            Self::INITIAL
        } else {
            Self(value)
        }
    }

    /// Numeric level.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Level directly above this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Every tenth level grants one guaranteed special spawn.
    #[must_use]
    pub const fn triggers_special_spawn(&self) -> bool {
        self.0 % 10 == 0
    }
}

impl Default for Intensity {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// Timer intervals derived from the current intensity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cadence {
    /// Delay between damage firings.
    pub damage_interval: Duration,
    /// Base delay between normal spawns, before jitter.
    pub spawn_interval: Duration,
}

/// Color tag of a collectible creature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectibleColor {
    /// Common once intensity reaches three.
    Yellow,
    /// Appears from intensity five onward.
    Blue,
    /// Always present in the normal pool.
    Red,
    /// Special spawn; catching it repairs every cracked bridge tile.
    Gold,
}

/// Cardinal directions used for facing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward decreasing row indices.
    North,
    /// Toward increasing column indices.
    East,
    /// Toward increasing row indices.
    South,
    /// Toward decreasing column indices.
    West,
}

/// Ephemeral spawn description consumed by the actor-creation collaborator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnEvent {
    /// Position on the map edge, in pixels.
    pub position: Vec2,
    /// Direction pointing into the map interior.
    pub facing: Direction,
    /// Color tag of the collectible.
    pub color: CollectibleColor,
}

/// Control state of the player character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PlayerState {
    /// Player is under normal control.
    #[default]
    Stationary,
    /// A fall animation is playing.
    Falling,
    /// Control is frozen because the level is lost.
    GameOver,
}

/// Lifecycle of a loaded level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LevelPhase {
    /// Play continues.
    #[default]
    Active,
    /// Terminal until the level is reloaded.
    GameOver,
}

/// Token identifying an in-flight visual effect awaiting completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u32);

impl EffectId {
    /// Creates a new effect token with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the token.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Coordinate converted to a gap together with the kind it held before.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DroppedTile {
    /// Coordinate of the dropped tile.
    pub tile: TileCoord,
    /// Kind held before the drop.
    pub prior: TileKind,
}

impl DroppedTile {
    /// Tile index the debris visual should render.
    #[must_use]
    pub fn prior_index(&self) -> i32 {
        self.prior.index()
    }
}

/// Platform group found unreachable from the master platform.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CollapsedGroup {
    /// Number of platforms absorbed into the group.
    pub platforms: u32,
    /// Every passable tile of the component, in fill order.
    pub tiles: Vec<DroppedTile>,
}

/// Outcome of a single connectivity pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CollapseReport {
    /// Groups to drop, in discovery order.
    pub groups: Vec<CollapsedGroup>,
    /// Whether the iteration cap cut the pass short.
    pub aborted: bool,
}

impl CollapseReport {
    /// Total number of platforms contained in the reported groups.
    #[must_use]
    pub fn platforms_lost(&self) -> u32 {
        self.groups.iter().map(|group| group.platforms).sum()
    }
}
