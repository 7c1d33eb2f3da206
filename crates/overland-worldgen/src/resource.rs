//! Resource spawn decisions.
//!
//! Whether a resource appears on a tile is decided by a stateless
//! integer hash of `(seed, x, y, kind)` compared against the biome's
//! spawn rate. No RNG state is involved, so the gathering layer can ask
//! about tiles whose chunk has never been generated and will get the
//! same answer the generator does later.

use serde::{Deserialize, Serialize};

use overland_common::{TileCoord, WorldSeed};

use crate::biome::BiomeProfile;

/// Categories of harvestable resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ResourceKind {
    /// Trees, harvested for wood
    Tree = 0,
    /// Surface rock, harvested for stone
    Rock = 1,
    /// Bushes, harvested for fiber and food
    Bush = 2,
    /// Crystal outcrops, rare
    Crystal = 3,
}

impl ResourceKind {
    /// Number of resource kinds.
    pub const COUNT: usize = 4;

    /// All kinds, in discriminant order.
    pub const ALL: [ResourceKind; Self::COUNT] = [
        ResourceKind::Tree,
        ResourceKind::Rock,
        ResourceKind::Bush,
        ResourceKind::Crystal,
    ];

    /// Converts from a raw discriminant.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Tree),
            1 => Some(Self::Rock),
            2 => Some(Self::Bush),
            3 => Some(Self::Crystal),
            _ => None,
        }
    }

    /// Index into per-kind tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Tree => "tree",
            Self::Rock => "rock",
            Self::Bush => "bush",
            Self::Crystal => "crystal",
        };
        f.write_str(name)
    }
}

/// Spatial hash multipliers, the classic triple used for position
/// hashing in spatial grids.
const HASH_X: u32 = 73_856_093;
const HASH_Y: u32 = 19_349_663;
const HASH_KIND: u32 = 83_492_791;

/// Deterministic spawn roll for a tile, uniform in [0, 1).
///
/// Folds the 64-bit inputs to 32 bits, combines them with the spatial
/// hash multipliers, and finishes with a multiply/xorshift avalanche so
/// neighboring tiles decorrelate.
#[must_use]
pub fn spawn_roll(seed: WorldSeed, kind: ResourceKind, tile: TileCoord) -> f64 {
    let fold = |v: i64| (v as u32) ^ ((v >> 32) as u32);

    let mut h = (seed.value() as u32) ^ ((seed.value() >> 32) as u32);
    h = h.wrapping_add(fold(tile.x).wrapping_mul(HASH_X));
    h = h.wrapping_add(fold(tile.y).wrapping_mul(HASH_Y));
    h = h.wrapping_add((kind as u32 + 1).wrapping_mul(HASH_KIND));

    h ^= h >> 16;
    h = h.wrapping_mul(0x7FEB_352D);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846C_A68B);
    h ^= h >> 16;

    f64::from(h) / 4_294_967_296.0
}

/// Decides whether a resource of `kind` spawns on `tile`.
///
/// Pure: callable for tiles in unloaded chunks.
#[must_use]
pub fn should_spawn_resource(
    seed: WorldSeed,
    profile: &BiomeProfile,
    kind: ResourceKind,
    tile: TileCoord,
) -> bool {
    spawn_roll(seed, kind, tile) < profile.spawn_rate(kind)
}
