//! Live chunk state.
//!
//! A `Chunk` is the in-memory form of one `chunk_size`² tile area: its
//! deterministic biome baseline plus whatever the player has done to it.
//! Mutations flip the dirty flag; persistence derives a [`ChunkDelta`]
//! from the mutation state at eviction or checkpoint time.

use ahash::{AHashMap, AHashSet};

use overland_common::{ChunkCoord, LocalCoord, StructureId};
use overland_worldgen::BiomeId;

use crate::delta::{ChunkDelta, StructureEntry};

/// Lifecycle state of a chunk, as seen by the chunk system.
///
/// `Generating` describes a coordinate whose classification job is
/// queued or running; such chunks are not yet resident and never
/// observable through queries. Resident chunks are `Active` inside the
/// load radius and `Dormant` in the hysteresis band beyond it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    /// Classification job queued or running, not yet resident
    Generating,
    /// Resident, within the load radius: rendered and simulated
    Active,
    /// Resident, in the margin band: kept to avoid load/evict thrash
    Dormant,
}

/// One loaded chunk: baseline classification plus player mutations.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Coordinate of this chunk in the chunk grid.
    coord: ChunkCoord,
    /// Side length in tiles; fixed per world.
    chunk_size: u32,
    /// Row-major biome grid, `chunk_size`² entries.
    biomes: Vec<BiomeId>,
    /// Tile indices whose resource has been harvested.
    harvested: AHashSet<u16>,
    /// Structures placed by the player, by tile index.
    structures: AHashMap<u16, StructureId>,
    /// Whether mutations exist that persistence has not seen.
    dirty: bool,
    /// Residency state; maintained by the chunk system.
    state: ChunkState,
}

impl Chunk {
    /// Creates a chunk from a freshly classified baseline.
    ///
    /// `biomes` must hold exactly `chunk_size`² row-major entries.
    #[must_use]
    pub fn from_baseline(coord: ChunkCoord, chunk_size: u32, biomes: Vec<BiomeId>) -> Self {
        debug_assert_eq!(biomes.len(), (chunk_size * chunk_size) as usize);
        Self {
            coord,
            chunk_size,
            biomes,
            harvested: AHashSet::new(),
            structures: AHashMap::new(),
            dirty: false,
            state: ChunkState::Active,
        }
    }

    /// Coordinate of this chunk.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Side length in tiles.
    #[must_use]
    pub const fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Residency state.
    #[must_use]
    pub const fn state(&self) -> ChunkState {
        self.state
    }

    /// Sets the residency state.
    pub fn set_state(&mut self, state: ChunkState) {
        self.state = state;
    }

    /// Whether unpersisted mutations exist.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag after a successful flush.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Whether this chunk has no mutations at all.
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.harvested.is_empty() && self.structures.is_empty()
    }

    /// Biome of a tile.
    #[must_use]
    pub fn biome_at(&self, local: LocalCoord) -> BiomeId {
        self.biomes[usize::from(local.tile_index(self.chunk_size))]
    }

    /// Whether a tile's resource has been harvested.
    #[must_use]
    pub fn is_harvested(&self, local: LocalCoord) -> bool {
        self.harvested.contains(&local.tile_index(self.chunk_size))
    }

    /// Records a harvest. Returns false if the tile was already
    /// harvested; the dirty flag is only set on an actual change.
    pub fn mark_harvested(&mut self, local: LocalCoord) -> bool {
        let changed = self.harvested.insert(local.tile_index(self.chunk_size));
        if changed {
            self.dirty = true;
        }
        changed
    }

    /// Structure on a tile, if any.
    #[must_use]
    pub fn structure_at(&self, local: LocalCoord) -> Option<StructureId> {
        self.structures
            .get(&local.tile_index(self.chunk_size))
            .copied()
    }

    /// Places a structure, replacing any existing one on the tile.
    /// Returns the displaced structure.
    pub fn place_structure(&mut self, local: LocalCoord, id: StructureId) -> Option<StructureId> {
        let prev = self
            .structures
            .insert(local.tile_index(self.chunk_size), id);
        if prev != Some(id) {
            self.dirty = true;
        }
        prev
    }

    /// Removes the structure on a tile, if any.
    pub fn remove_structure(&mut self, local: LocalCoord) -> Option<StructureId> {
        let prev = self.structures.remove(&local.tile_index(self.chunk_size));
        if prev.is_some() {
            self.dirty = true;
        }
        prev
    }

    /// Derives the persistence delta: the full diff between the
    /// deterministic baseline and the current mutation state.
    ///
    /// Lists are sorted by tile index so the same state always encodes
    /// to the same bytes.
    #[must_use]
    pub fn to_delta(&self) -> ChunkDelta {
        let mut harvested: Vec<u16> = self.harvested.iter().copied().collect();
        harvested.sort_unstable();

        let mut structures: Vec<StructureEntry> = self
            .structures
            .iter()
            .map(|(&tile_index, &structure)| StructureEntry {
                tile_index,
                structure,
            })
            .collect();
        structures.sort_unstable_by_key(|entry| entry.tile_index);

        ChunkDelta {
            harvested,
            structures,
        }
    }

    /// Applies a persisted delta over the baseline.
    ///
    /// Indices beyond the tile grid are skipped; they can only come
    /// from a record written with a different chunk size.
    pub fn apply_delta(&mut self, delta: &ChunkDelta) {
        let area = (self.chunk_size * self.chunk_size) as u16;

        for &tile_index in &delta.harvested {
            if tile_index < area {
                self.harvested.insert(tile_index);
            }
        }
        for entry in &delta.structures {
            if entry.tile_index < area {
                self.structures.insert(entry.tile_index, entry.structure);
            }
        }
    }

    /// Number of harvested tiles.
    #[must_use]
    pub fn harvested_count(&self) -> usize {
        self.harvested.len()
    }

    /// Number of placed structures.
    #[must_use]
    pub fn structure_count(&self) -> usize {
        self.structures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_chunk() -> Chunk {
        let biomes = vec![BiomeId::Plains; 1024];
        Chunk::from_baseline(ChunkCoord::new(0, 0), 32, biomes)
    }

    #[test]
    fn test_fresh_chunk_is_clean_and_pristine() {
        let chunk = test_chunk();
        assert!(!chunk.is_dirty());
        assert!(chunk.is_pristine());
        assert!(chunk.to_delta().is_empty());
    }

    #[test]
    fn test_harvest_sets_dirty_once() {
        let mut chunk = test_chunk();
        let local = LocalCoord::new(5, 5);

        assert!(chunk.mark_harvested(local));
        assert!(chunk.is_dirty());
        assert!(chunk.is_harvested(local));

        chunk.mark_clean();
        // Harvesting the same tile again is not a new mutation.
        assert!(!chunk.mark_harvested(local));
        assert!(!chunk.is_dirty());
    }

    #[test]
    fn test_place_and_remove_structure() {
        let mut chunk = test_chunk();
        let local = LocalCoord::new(3, 7);
        let cabin = StructureId::new(11);
        let wall = StructureId::new(12);

        assert_eq!(chunk.place_structure(local, cabin), None);
        assert_eq!(chunk.structure_at(local), Some(cabin));
        assert_eq!(chunk.place_structure(local, wall), Some(cabin));

        chunk.mark_clean();
        // Re-placing the identical structure changes nothing.
        assert_eq!(chunk.place_structure(local, wall), Some(wall));
        assert!(!chunk.is_dirty());

        assert_eq!(chunk.remove_structure(local), Some(wall));
        assert!(chunk.is_dirty());
        assert_eq!(chunk.structure_at(local), None);
    }

    #[test]
    fn test_delta_round_trip() {
        let mut chunk = test_chunk();
        chunk.mark_harvested(LocalCoord::new(5, 5));
        chunk.mark_harvested(LocalCoord::new(0, 1));
        chunk.place_structure(LocalCoord::new(9, 9), StructureId::new(3));

        let delta = chunk.to_delta();
        assert_eq!(delta.harvested, vec![32, 165]);
        assert_eq!(delta.structures.len(), 1);

        let mut restored = test_chunk();
        restored.apply_delta(&delta);
        assert!(restored.is_harvested(LocalCoord::new(5, 5)));
        assert!(restored.is_harvested(LocalCoord::new(0, 1)));
        assert_eq!(
            restored.structure_at(LocalCoord::new(9, 9)),
            Some(StructureId::new(3))
        );
    }

    #[test]
    fn test_delta_is_deterministic() {
        let mut chunk = test_chunk();
        for index in [900u16, 5, 512, 77] {
            chunk.mark_harvested(LocalCoord::from_tile_index(index, 32));
        }
        let a = chunk.to_delta();
        let b = chunk.to_delta();
        assert_eq!(a.harvested, b.harvested);
        assert_eq!(a.harvested, vec![5, 77, 512, 900]);
    }

    #[test]
    fn test_apply_delta_skips_foreign_indices() {
        let mut chunk = test_chunk();
        let delta = ChunkDelta {
            harvested: vec![5, 2000],
            structures: vec![StructureEntry {
                tile_index: 5000,
                structure: StructureId::new(1),
            }],
        };
        chunk.apply_delta(&delta);
        assert_eq!(chunk.harvested_count(), 1);
        assert_eq!(chunk.structure_count(), 0);
    }
}
