//! Coordinate types for tile, chunk, and local positions.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Side length of a chunk in tiles.
///
/// Must stay fixed for the lifetime of a world: persisted deltas index
/// tiles by this size, so changing it invalidates existing save data.
pub const CHUNK_SIZE: u32 = 32;

/// Number of tiles in a chunk (`CHUNK_SIZE` squared).
pub const CHUNK_AREA: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

/// Global tile coordinate on the unbounded world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct TileCoord {
    /// X coordinate in tile space
    pub x: i64,
    /// Y coordinate in tile space
    pub y: i64,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Converts to the coordinate of the containing chunk.
    #[must_use]
    pub const fn chunk_coord(self, chunk_size: u32) -> ChunkCoord {
        let size = chunk_size as i64;
        ChunkCoord {
            x: self.x.div_euclid(size) as i32,
            y: self.y.div_euclid(size) as i32,
        }
    }

    /// Converts to the local coordinate within the containing chunk.
    #[must_use]
    pub const fn local_coord(self, chunk_size: u32) -> LocalCoord {
        let size = chunk_size as i64;
        LocalCoord {
            x: self.x.rem_euclid(size) as u16,
            y: self.y.rem_euclid(size) as u16,
        }
    }
}

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Y coordinate in chunk space
    pub y: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Converts to the tile coordinate of the chunk's top-left corner.
    #[must_use]
    pub const fn base_tile(self, chunk_size: u32) -> TileCoord {
        TileCoord {
            x: (self.x as i64) * (chunk_size as i64),
            y: (self.y as i64) * (chunk_size as i64),
        }
    }

    /// Chebyshev (chessboard) distance to another chunk.
    ///
    /// A radius-R neighborhood under this metric is the (2R+1)² square of
    /// chunks centered on `self`, which is the shape streaming works in.
    #[must_use]
    pub const fn chebyshev_distance(self, other: ChunkCoord) -> u32 {
        let dx = (self.x as i64 - other.x as i64).unsigned_abs();
        let dy = (self.y as i64 - other.y as i64).unsigned_abs();
        if dx > dy { dx as u32 } else { dy as u32 }
    }
}

/// Local coordinate within a chunk (0 to chunk_size-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct LocalCoord {
    /// X coordinate within chunk
    pub x: u16,
    /// Y coordinate within chunk
    pub y: u16,
}

impl LocalCoord {
    /// Creates a new local coordinate.
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Converts to a row-major tile index for array access.
    #[must_use]
    pub const fn tile_index(self, chunk_size: u32) -> u16 {
        self.y * (chunk_size as u16) + self.x
    }

    /// Creates from a row-major tile index.
    #[must_use]
    pub const fn from_tile_index(index: u16, chunk_size: u32) -> Self {
        let size = chunk_size as u16;
        Self {
            x: index % size,
            y: index / size,
        }
    }
}
