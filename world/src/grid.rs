//! Dense tile layer backing the world's grid provider.

use bridge_keeper_core::{GridProvider, LevelLayout, TileCoord, TileKind};

/// Row-major collision layer holding the current kind of every tile.
///
/// Coordinates outside the map read as [`TileKind::OutOfBounds`] and writes to
/// them are dropped; both cases are logged rather than treated as failures.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BridgeGrid {
    columns: u32,
    rows: u32,
    tiles: Vec<TileKind>,
}

impl BridgeGrid {
    /// Builds the grid from the static tile indices of a layout.
    #[must_use]
    pub fn from_layout(layout: &LevelLayout) -> Self {
        let tiles = layout
            .tiles
            .iter()
            .copied()
            .map(TileKind::from_index)
            .collect();
        Self {
            columns: layout.columns,
            rows: layout.rows,
            tiles,
        }
    }

    /// Builds a grid of the given size filled with a single tile kind.
    #[must_use]
    pub fn filled(columns: u32, rows: u32, kind: TileKind) -> Self {
        let count = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        Self {
            columns,
            rows,
            tiles: vec![kind; count],
        }
    }

    /// Dense tile kinds stored in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[TileKind] {
        &self.tiles
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        if !coord.is_within(self.columns, self.rows) {
            return None;
        }
        let column = usize::try_from(coord.column()).ok()?;
        let row = usize::try_from(coord.row()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

impl GridProvider for BridgeGrid {
    fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    fn tile(&self, coord: TileCoord) -> TileKind {
        match self.index(coord).and_then(|index| self.tiles.get(index)) {
            Some(kind) => *kind,
            None => {
                log::debug!("tile query outside map at {coord:?}");
                TileKind::OutOfBounds
            }
        }
    }

    fn set_tile(&mut self, coord: TileCoord, kind: TileKind) {
        if kind == TileKind::OutOfBounds {
            log::debug!("refusing to store out-of-bounds sentinel at {coord:?}");
            return;
        }

        match self.index(coord) {
            Some(index) => self.tiles[index] = kind,
            None => log::debug!("tile write outside map at {coord:?} dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_layout_decodes_indices() {
        let layout = LevelLayout::reference();
        let grid = BridgeGrid::from_layout(&layout);

        assert_eq!(grid.dimensions(), (27, 27));
        assert_eq!(grid.tile(TileCoord::new(11, 19)), TileKind::Traversable(1));
        assert_eq!(grid.tile(TileCoord::new(7, 3)), TileKind::BRIDGE);
        assert_eq!(grid.tile(TileCoord::new(0, 0)), TileKind::Broken);
    }

    #[test]
    fn out_of_bounds_reads_sentinel_and_ignores_writes() {
        let mut grid = BridgeGrid::filled(2, 2, TileKind::BRIDGE);
        let outside = TileCoord::new(2, 0);

        assert_eq!(grid.tile(outside), TileKind::OutOfBounds);
        grid.set_tile(outside, TileKind::Broken);
        assert!(grid.cells().iter().all(|kind| *kind == TileKind::BRIDGE));
    }

    #[test]
    fn remove_tile_clears_to_empty() {
        let mut grid = BridgeGrid::filled(2, 1, TileKind::BRIDGE);
        grid.remove_tile(TileCoord::new(1, 0));
        assert_eq!(grid.tile(TileCoord::new(1, 0)), TileKind::Empty);
        assert_eq!(grid.bridge_tiles(), vec![TileCoord::new(0, 0)]);
    }
}
