//! Resident chunk cache.
//!
//! Holds every loaded chunk keyed by coordinate and owns the two
//! eviction policies: radius eviction (anything beyond the dormant
//! ring goes) and the hard cap (farthest chunks go first until the
//! count fits). Eviction here only removes chunks from the map and
//! hands them back; delta write-back is the caller's job so cache
//! logic stays free of I/O.

use ahash::AHashMap;

use overland_common::ChunkCoord;

use crate::chunk::Chunk;

/// Loaded chunks with a bounded footprint.
#[derive(Debug)]
pub struct ChunkCache {
    chunks: AHashMap<ChunkCoord, Chunk>,
    max_loaded: usize,
}

impl ChunkCache {
    /// Creates an empty cache capped at `max_loaded` chunks.
    #[must_use]
    pub fn new(max_loaded: usize) -> Self {
        Self {
            chunks: AHashMap::with_capacity(max_loaded.min(1024)),
            max_loaded,
        }
    }

    /// Number of resident chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunks are resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Hard cap on resident chunks.
    #[must_use]
    pub const fn max_loaded(&self) -> usize {
        self.max_loaded
    }

    /// Whether `coord` is resident.
    #[must_use]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Borrows the chunk at `coord` if resident.
    #[must_use]
    pub fn get(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// Mutably borrows the chunk at `coord` if resident.
    #[must_use]
    pub fn get_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord)
    }

    /// Inserts a chunk, returning the previously resident chunk at the
    /// same coordinate if any.
    pub fn insert(&mut self, chunk: Chunk) -> Option<Chunk> {
        self.chunks.insert(chunk.coord(), chunk)
    }

    /// Removes and returns the chunk at `coord`.
    pub fn remove(&mut self, coord: ChunkCoord) -> Option<Chunk> {
        self.chunks.remove(&coord)
    }

    /// Coordinates of all resident chunks, in no particular order.
    #[must_use]
    pub fn coords(&self) -> Vec<ChunkCoord> {
        self.chunks.keys().copied().collect()
    }

    /// Iterates over resident chunks, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Mutably iterates over resident chunks, in no particular order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.chunks.values_mut()
    }

    /// Removes every chunk strictly beyond `radius` (Chebyshev) from
    /// `center` and returns them for write-back.
    pub fn evict_beyond(&mut self, center: ChunkCoord, radius: u32) -> Vec<Chunk> {
        let victims: Vec<ChunkCoord> = self
            .chunks
            .keys()
            .filter(|c| c.chebyshev_distance(center) > radius)
            .copied()
            .collect();

        victims
            .into_iter()
            .filter_map(|c| self.chunks.remove(&c))
            .collect()
    }

    /// Removes farthest-first until the resident count fits under the
    /// cap, returning the removed chunks for write-back. Ties break on
    /// coordinate so the victim order is deterministic.
    pub fn enforce_cap(&mut self, center: ChunkCoord) -> Vec<Chunk> {
        if self.chunks.len() <= self.max_loaded {
            return Vec::new();
        }

        let mut by_distance: Vec<ChunkCoord> = self.chunks.keys().copied().collect();
        by_distance.sort_unstable_by_key(|c| (c.chebyshev_distance(center), c.x, c.y));

        let excess = self.chunks.len() - self.max_loaded;
        by_distance
            .into_iter()
            .rev()
            .take(excess)
            .filter_map(|c| self.chunks.remove(&c))
            .collect()
    }

    /// Drops every resident chunk, returning them for write-back.
    pub fn drain(&mut self) -> Vec<Chunk> {
        self.chunks.drain().map(|(_, chunk)| chunk).collect()
    }
}
