//! # Overland World
//!
//! Chunk streaming and persistence for Overland.
//!
//! This crate handles:
//! - On-demand chunk generation around the player
//! - Distance-based caching with Active/Dormant hysteresis
//! - Delta write-back persistence of harvests and structures
//! - Frame-budgeted background generation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod cache;
pub mod chunk;
pub mod delta;
pub mod store;
pub mod system;
pub mod worker;

mod e2e_tests;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cache::ChunkCache;
    pub use crate::chunk::{Chunk, ChunkState};
    pub use crate::delta::{ChunkDelta, StructureEntry, DELTA_MAGIC, DELTA_VERSION};
    pub use crate::store::{ChunkStore, FileDeltaStore, MemoryDeltaStore, StoreKey};
    pub use crate::system::{ChunkSystem, WorldStats};
    pub use crate::worker::{generate_chunk_biomes, GenResult, GenerationPool};
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use overland_common::{ChunkCoord, WorldSeed, CHUNK_SIZE};
    use overland_worldgen::BiomeId;

    #[test]
    fn test_chunk_creation() {
        let coord = ChunkCoord::new(0, 0);
        let biomes = vec![BiomeId::Forest; (CHUNK_SIZE * CHUNK_SIZE) as usize];
        let chunk = Chunk::from_baseline(coord, CHUNK_SIZE, biomes);
        assert_eq!(chunk.coord(), coord);
        assert!(!chunk.is_dirty());
    }

    #[test]
    fn test_delta_encoding() {
        let key = StoreKey::new(WorldSeed::new(7), ChunkCoord::new(1, 2));
        let delta = ChunkDelta {
            harvested: vec![3, 9],
            structures: Vec::new(),
        };
        let bytes = delta::encode_delta(key, &delta).expect("encode failed");
        let loaded = delta::decode_delta(key, &bytes).expect("decode failed");
        assert_eq!(loaded, delta);
    }
}
