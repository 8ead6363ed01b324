//! Static level data supplied by the map-loading collaborator.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{TileCoord, TileKind, BRIDGE_BASE_INTACT_INDEX, BROKEN_INDEX};

/// Side length of the reference map measured in tiles.
pub const REFERENCE_MAP_SIZE: u32 = 27;
/// Side length of a tile in the reference tileset, in pixels.
pub const REFERENCE_TILE_SIZE_PX: u32 = 16;

const PLATFORM_FLOOR_INDEX: i32 = 1;
const PLATFORM_OFFSET: u32 = 3;
const PLATFORM_SPACING: u32 = 8;
const PLATFORMS_PER_SIDE: u32 = 3;

/// Fully materialised static map data for one level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelLayout {
    /// Number of tile columns in the map.
    pub columns: u32,
    /// Number of tile rows in the map.
    pub rows: u32,
    /// Side length of a tile in pixels.
    pub tile_size_px: u32,
    /// Row-major tile indices of the collision layer.
    pub tiles: Vec<i32>,
    /// Platform anchors tracked for connectivity, in worklist order.
    pub platforms: Vec<TileCoord>,
    /// Platform every other platform must stay connected to.
    pub master: TileCoord,
    /// Tile the player starts on.
    pub player_start: TileCoord,
    /// Tile the player is returned to after a fall.
    pub respawn: TileCoord,
}

/// Reasons a level layout may be rejected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// The tile vector does not match the declared dimensions.
    #[error("layout declares {columns}x{rows} tiles but provides {actual}")]
    TileCountMismatch {
        /// Declared column count.
        columns: u32,
        /// Declared row count.
        rows: u32,
        /// Number of tile indices supplied.
        actual: usize,
    },
    /// No platform anchors were supplied.
    #[error("layout defines no platforms")]
    NoPlatforms,
    /// The master platform is not part of the platform set.
    #[error("master platform {0:?} is not one of the platforms")]
    MasterNotPlatform(TileCoord),
    /// A platform anchor was listed more than once.
    #[error("platform {0:?} is listed twice")]
    DuplicatePlatform(TileCoord),
    /// A coordinate referenced by the layout lies outside the map.
    #[error("{what} {coord:?} lies outside the map")]
    OutOfBounds {
        /// Name of the offending field.
        what: &'static str,
        /// Offending coordinate.
        coord: TileCoord,
    },
}

impl LevelLayout {
    /// Checks the structural invariants of the layout.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let expected = u64::from(self.columns) * u64::from(self.rows);
        if self.tiles.len() as u64 != expected {
            return Err(LayoutError::TileCountMismatch {
                columns: self.columns,
                rows: self.rows,
                actual: self.tiles.len(),
            });
        }

        if self.platforms.is_empty() {
            return Err(LayoutError::NoPlatforms);
        }

        let mut seen = HashSet::with_capacity(self.platforms.len());
        for &platform in &self.platforms {
            self.check_within("platform", platform)?;
            if !seen.insert(platform) {
                return Err(LayoutError::DuplicatePlatform(platform));
            }
        }

        if !seen.contains(&self.master) {
            return Err(LayoutError::MasterNotPlatform(self.master));
        }

        self.check_within("player start", self.player_start)?;
        self.check_within("respawn", self.respawn)?;
        Ok(())
    }

    /// Kind of tile stored at the coordinate, if it lies inside the map.
    #[must_use]
    pub fn tile_kind(&self, coord: TileCoord) -> Option<TileKind> {
        if !coord.is_within(self.columns, self.rows) {
            return None;
        }
        let index = coord.row() as usize * self.columns as usize + coord.column() as usize;
        self.tiles.get(index).copied().map(TileKind::from_index)
    }

    /// Map width in pixels.
    #[must_use]
    pub const fn width_px(&self) -> u32 {
        self.columns * self.tile_size_px
    }

    /// Map height in pixels.
    #[must_use]
    pub const fn height_px(&self) -> u32 {
        self.rows * self.tile_size_px
    }

    /// Builds the reference layout: a 3x3 arrangement of platform pads joined
    /// by intact bridges and surrounded by water, with the master platform at
    /// the bottom centre.
    #[must_use]
    pub fn reference() -> Self {
        let size = REFERENCE_MAP_SIZE;
        let width = size as usize;
        let mut tiles = vec![BROKEN_INDEX; width * width];
        let centres: Vec<u32> = (0..PLATFORMS_PER_SIDE)
            .map(|step| PLATFORM_OFFSET + step * PLATFORM_SPACING)
            .collect();

        for &row in &centres {
            for &column in &centres {
                for pad_row in row - 1..=row + 1 {
                    for pad_column in column - 1..=column + 1 {
                        tiles[pad_row as usize * width + pad_column as usize] =
                            PLATFORM_FLOOR_INDEX;
                    }
                }
            }
        }

        let first = centres[0];
        let last = centres[centres.len() - 1];
        for &centre in &centres {
            for along in first..=last {
                for index in [
                    centre as usize * width + along as usize,
                    along as usize * width + centre as usize,
                ] {
                    if tiles[index] == BROKEN_INDEX {
                        tiles[index] = BRIDGE_BASE_INTACT_INDEX;
                    }
                }
            }
        }

        let mut platforms = Vec::with_capacity(centres.len() * centres.len());
        for &row in &centres {
            for &column in &centres {
                platforms.push(TileCoord::new(column, row));
            }
        }

        let master = TileCoord::new(centres[1], centres[2]);
        Self {
            columns: size,
            rows: size,
            tile_size_px: REFERENCE_TILE_SIZE_PX,
            tiles,
            platforms,
            master,
            player_start: master,
            respawn: master,
        }
    }

    fn check_within(&self, what: &'static str, coord: TileCoord) -> Result<(), LayoutError> {
        if coord.is_within(self.columns, self.rows) {
            Ok(())
        } else {
            Err(LayoutError::OutOfBounds { what, coord })
        }
    }
}
