//! Material tier and structural state transitions for bridge tiles.
//!
//! The tile-level functions are pure. The grid-level helpers read and write
//! through a [`GridProvider`] and report each change as a [`Transition`] so the
//! caller can broadcast it. Invalid transitions are no-ops rather than errors.

use crate::{BridgeTile, GridProvider, StructuralState, Tier, TileCoord, TileKind};

/// Single tile change produced by a durability operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Transition {
    /// Coordinate of the changed tile.
    pub tile: TileCoord,
    /// Kind held before the change.
    pub from: TileKind,
    /// Kind held after the change.
    pub to: TileKind,
}

impl Transition {
    /// Reports whether the change turned a bridge tile into a gap.
    #[must_use]
    pub fn is_break(&self) -> bool {
        self.from.is_bridge() && self.to == TileKind::Broken
    }
}

/// Applies one hit to a tile.
///
/// A reinforced tile loses its tier and keeps its structural state. A base
/// tile cracks, and a cracked base tile breaks. Anything that is not a bridge
/// tile is returned unchanged.
#[must_use]
pub fn damage(kind: TileKind) -> TileKind {
    let TileKind::Bridge(bridge) = kind else {
        return kind;
    };

    match (bridge.tier(), bridge.state()) {
        (Tier::Reinforced, state) => TileKind::Bridge(BridgeTile::new(Tier::Base, state)),
        (Tier::Base, StructuralState::Intact) => {
            TileKind::Bridge(BridgeTile::new(Tier::Base, StructuralState::Cracked))
        }
        (Tier::Base, StructuralState::Cracked) => TileKind::Broken,
    }
}

/// Promotes a base-tier bridge tile to the reinforced tier at the same state.
///
/// Returns `None` for reinforced, broken and non-bridge tiles.
#[must_use]
pub fn reinforce(kind: TileKind) -> Option<TileKind> {
    match kind {
        TileKind::Bridge(bridge) if bridge.tier() == Tier::Base => Some(TileKind::Bridge(
            BridgeTile::new(Tier::Reinforced, bridge.state()),
        )),
        _ => None,
    }
}

/// Restores a cracked bridge tile to the intact state at the same tier.
///
/// Returns `None` for intact, broken and non-bridge tiles.
#[must_use]
pub fn repair(kind: TileKind) -> Option<TileKind> {
    match kind {
        TileKind::Bridge(bridge) if bridge.state() == StructuralState::Cracked => Some(
            TileKind::Bridge(BridgeTile::new(bridge.tier(), StructuralState::Intact)),
        ),
        _ => None,
    }
}

/// Damages the tile at the coordinate, writing the result back to the grid.
pub fn damage_at<G>(grid: &mut G, tile: TileCoord) -> Option<Transition>
where
    G: GridProvider + ?Sized,
{
    let from = grid.tile(tile);
    if !from.is_bridge() {
        log::debug!("damage at {tile:?} ignored, tile is {from:?}");
        return None;
    }

    let to = damage(from);
    grid.set_tile(tile, to);
    Some(Transition { tile, from, to })
}

/// Reinforces the tile at the coordinate, writing the result back to the grid.
pub fn reinforce_at<G>(grid: &mut G, tile: TileCoord) -> Option<Transition>
where
    G: GridProvider + ?Sized,
{
    let from = grid.tile(tile);
    let to = reinforce(from)?;
    grid.set_tile(tile, to);
    Some(Transition { tile, from, to })
}

/// Restores every cracked bridge tile in the grid, in row-major order.
pub fn repair_all_cracked<G>(grid: &mut G) -> Vec<Transition>
where
    G: GridProvider + ?Sized,
{
    let mut changed = Vec::new();
    for tile in grid.bridge_tiles() {
        let from = grid.tile(tile);
        if let Some(to) = repair(from) {
            grid.set_tile(tile, to);
            changed.push(Transition { tile, from, to });
        }
    }
    changed
}
