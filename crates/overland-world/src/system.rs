//! Chunk streaming coordinator.
//!
//! [`ChunkSystem`] owns the resident cache, the generation pool, and
//! the delta store, and advances all three once per call to
//! [`ChunkSystem::update`]. Every game-facing query and mutation goes
//! through it; chunks never leave the system.
//!
//! A frame runs fixed steps in order: recenter the wanted set when the
//! player crosses a chunk border, refresh Active/Dormant states,
//! dispatch a bounded number of generation jobs, merge finished grids
//! under the frame's time slice, evict out-of-range chunks with delta
//! write-back, and checkpoint dirty residents on an interval. Store
//! and generation failures are logged and counted; they never escape
//! the frame loop.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ahash::AHashSet;
use tracing::{debug, info, warn};

use overland_common::{
    ChunkCoord, StructureId, TileCoord, WorldConfig, WorldError, WorldResult, WorldSeed,
};
use overland_worldgen::{
    should_spawn_resource, BiomeClassifier, BiomeId, BiomeProfile, BiomeTable, ResourceKind,
};

use crate::cache::ChunkCache;
use crate::chunk::{Chunk, ChunkState};
use crate::delta::{decode_delta, encode_delta};
use crate::store::{ChunkStore, StoreKey};
use crate::worker::{GenResult, GenerationPool};

/// Snapshot of chunk system health.
///
/// Gauges (`loaded` through `queued`) describe the moment the snapshot
/// was taken; the remaining counters are cumulative since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldStats {
    /// Resident chunks
    pub loaded: usize,
    /// Resident chunks inside the load radius
    pub active: usize,
    /// Resident chunks in the hysteresis band
    pub dormant: usize,
    /// Generation jobs submitted and not yet merged
    pub in_flight: usize,
    /// Coordinates waiting for a free dispatch slot
    pub queued: usize,
    /// Grids merged into the cache
    pub generated_total: u64,
    /// Chunks removed by radius eviction or the cap
    pub evicted_total: u64,
    /// Successful delta write-backs, including deletions of emptied deltas
    pub delta_writes: u64,
    /// Write-backs that failed; the mutations stayed in memory
    pub delta_write_failures: u64,
    /// Stored deltas dropped as unreadable or failing validation
    pub corrupt_deltas_discarded: u64,
    /// Finished grids dropped because the player had moved away
    pub completions_discarded: u64,
}

/// Streams chunks around the player.
pub struct ChunkSystem {
    seed: WorldSeed,
    config: WorldConfig,
    classifier: BiomeClassifier,
    table: BiomeTable,
    cache: ChunkCache,
    store: Box<dyn ChunkStore>,
    pool: GenerationPool,
    to_generate: VecDeque<ChunkCoord>,
    in_flight: AHashSet<ChunkCoord>,
    player_chunk: Option<ChunkCoord>,
    frames_since_checkpoint: u32,
    stats: WorldStats,
}

impl ChunkSystem {
    /// Builds a system for `seed` backed by `store`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidConfig`] when `config` fails
    /// validation.
    pub fn new(
        seed: WorldSeed,
        config: WorldConfig,
        store: Box<dyn ChunkStore>,
    ) -> WorldResult<Self> {
        config.validate()?;

        let classifier =
            BiomeClassifier::new(seed, config.noise_frequency, config.biome_thresholds);
        let pool = GenerationPool::new(&classifier, config.chunk_size, config.worker_threads);
        let cache = ChunkCache::new(config.max_loaded_chunks);

        info!(
            seed = %seed,
            load_radius = config.load_radius,
            dormant_radius = config.dormant_radius(),
            max_loaded = config.max_loaded_chunks,
            "chunk system ready"
        );

        Ok(Self {
            seed,
            config,
            classifier,
            table: BiomeTable::default(),
            cache,
            store,
            pool,
            to_generate: VecDeque::new(),
            in_flight: AHashSet::new(),
            player_chunk: None,
            frames_since_checkpoint: 0,
            stats: WorldStats::default(),
        })
    }

    /// Advances the system one frame with the player at `player_tile`.
    ///
    /// Returns the number of chunks that finished loading this frame.
    pub fn update(&mut self, player_tile: TileCoord) -> usize {
        let center = player_tile.chunk_coord(self.config.chunk_size);

        if self.player_chunk != Some(center) {
            self.recenter(center);
        }
        self.refresh_states(center);
        self.dispatch_jobs();
        let merged = self.merge_completions(center);
        self.evict(center);
        self.checkpoint_tick();

        merged
    }

    /// Rebuilds the generation queue around a new center chunk.
    fn recenter(&mut self, center: ChunkCoord) {
        self.player_chunk = Some(center);
        self.to_generate = spiral_coords(center, self.config.load_radius)
            .into_iter()
            .filter(|c| !self.cache.contains(*c) && !self.in_flight.contains(c))
            .collect();

        debug!(
            cx = center.x,
            cy = center.y,
            queued = self.to_generate.len(),
            "recentered chunk streaming"
        );
    }

    /// Reclassifies residents as Active or Dormant by distance.
    fn refresh_states(&mut self, center: ChunkCoord) {
        let load_radius = self.config.load_radius;
        for chunk in self.cache.iter_mut() {
            let state = if chunk.coord().chebyshev_distance(center) <= load_radius {
                ChunkState::Active
            } else {
                ChunkState::Dormant
            };
            chunk.set_state(state);
        }
    }

    /// Submits queued coordinates to the pool, up to the per-frame cap.
    fn dispatch_jobs(&mut self) {
        let mut dispatched = 0;
        while dispatched < self.config.max_jobs_per_frame {
            let Some(coord) = self.to_generate.pop_front() else {
                break;
            };
            if self.cache.contains(coord) || self.in_flight.contains(&coord) {
                continue;
            }
            if self.pool.submit(coord) {
                self.in_flight.insert(coord);
                dispatched += 1;
            } else {
                // Request queue full; retry the same coordinate next frame.
                self.to_generate.push_front(coord);
                break;
            }
        }
    }

    /// Merges finished grids until the frame's time slice runs out.
    ///
    /// At least one waiting result is merged per frame so a tight
    /// slice cannot starve loading entirely.
    fn merge_completions(&mut self, center: ChunkCoord) -> usize {
        let deadline = Instant::now() + Duration::from_millis(self.config.generation_slice_ms);
        let mut merged = 0;

        while let Some(result) = self.pool.try_next() {
            if self.adopt_completion(result, center) {
                merged += 1;
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        merged
    }

    /// Restores a generated grid's delta and inserts it into the cache.
    /// Returns `false` when the completion was discarded as stale.
    fn adopt_completion(&mut self, result: GenResult, center: ChunkCoord) -> bool {
        self.in_flight.remove(&result.coord);

        let distance = result.coord.chebyshev_distance(center);
        if distance > self.config.dormant_radius() {
            self.stats.completions_discarded += 1;
            debug!(
                cx = result.coord.x,
                cy = result.coord.y,
                "discarded chunk completion outside dormant radius"
            );
            return false;
        }

        let mut chunk = Chunk::from_baseline(result.coord, self.config.chunk_size, result.biomes);

        let key = StoreKey::new(self.seed, result.coord);
        match self.store.read(key) {
            Ok(Some(bytes)) => match decode_delta(key, &bytes) {
                Ok(delta) => chunk.apply_delta(&delta),
                Err(e) => {
                    self.stats.corrupt_deltas_discarded += 1;
                    warn!(key = %key, error = %e, "discarding corrupt chunk delta");
                }
            },
            Ok(None) => {}
            Err(e) => {
                self.stats.corrupt_deltas_discarded += 1;
                warn!(key = %key, error = %e, "unreadable chunk delta, loading baseline");
            }
        }

        if distance > self.config.load_radius {
            chunk.set_state(ChunkState::Dormant);
        }

        let previous = self.cache.insert(chunk);
        debug_assert!(previous.is_none(), "completion for resident chunk {key}");

        self.stats.generated_total += 1;
        true
    }

    /// Evicts chunks beyond the dormant radius, then enforces the cap.
    fn evict(&mut self, center: ChunkCoord) {
        let mut evicted = self.cache.evict_beyond(center, self.config.dormant_radius());
        evicted.extend(self.cache.enforce_cap(center));
        if evicted.is_empty() {
            return;
        }

        self.stats.evicted_total += evicted.len() as u64;
        let count = evicted.len();
        for chunk in evicted {
            if chunk.is_dirty() {
                persist_chunk(self.store.as_mut(), &mut self.stats, self.seed, &chunk);
            }
        }

        debug!(count, loaded = self.cache.len(), "evicted chunks");
    }

    /// Counts frames and flushes dirty residents on the interval.
    fn checkpoint_tick(&mut self) {
        let interval = self.config.checkpoint_interval_frames;
        if interval == 0 {
            return;
        }
        self.frames_since_checkpoint += 1;
        if self.frames_since_checkpoint < interval {
            return;
        }
        self.frames_since_checkpoint = 0;

        let flushed = self.flush_all();
        if flushed > 0 {
            info!(flushed, "checkpoint flushed dirty chunks");
        }
    }

    /// Writes back every dirty resident chunk's delta.
    ///
    /// Chunks are marked clean only when their write-back succeeds, so
    /// a failed write is retried on the next flush or at eviction.
    /// Returns the number of chunks persisted.
    pub fn flush_all(&mut self) -> usize {
        let dirty: Vec<ChunkCoord> = self
            .cache
            .iter()
            .filter(|c| c.is_dirty())
            .map(Chunk::coord)
            .collect();

        let mut flushed = 0;
        for coord in dirty {
            let Some(chunk) = self.cache.get_mut(coord) else {
                continue;
            };
            if persist_chunk(self.store.as_mut(), &mut self.stats, self.seed, chunk) {
                chunk.mark_clean();
                flushed += 1;
            }
        }
        flushed
    }

    /// Biome of `tile`, or [`WorldError::ChunkNotLoaded`] if its chunk
    /// is not resident.
    pub fn biome_at(&self, tile: TileCoord) -> WorldResult<BiomeId> {
        let chunk = self.resident(tile)?;
        Ok(chunk.biome_at(tile.local_coord(self.config.chunk_size)))
    }

    /// Whether the resource at `tile` has been harvested.
    pub fn is_harvested(&self, tile: TileCoord) -> WorldResult<bool> {
        let chunk = self.resident(tile)?;
        Ok(chunk.is_harvested(tile.local_coord(self.config.chunk_size)))
    }

    /// Structure occupying `tile`, if any.
    pub fn structure_at(&self, tile: TileCoord) -> WorldResult<Option<StructureId>> {
        let chunk = self.resident(tile)?;
        Ok(chunk.structure_at(tile.local_coord(self.config.chunk_size)))
    }

    /// Records a harvest at `tile`. Returns `true` when the tile was
    /// not already harvested.
    pub fn mark_harvested(&mut self, tile: TileCoord) -> WorldResult<bool> {
        let local = tile.local_coord(self.config.chunk_size);
        let chunk = self.resident_mut(tile)?;
        Ok(chunk.mark_harvested(local))
    }

    /// Places `structure` at `tile`, returning the structure it
    /// replaced, if any.
    pub fn place_structure(
        &mut self,
        tile: TileCoord,
        structure: StructureId,
    ) -> WorldResult<Option<StructureId>> {
        let local = tile.local_coord(self.config.chunk_size);
        let chunk = self.resident_mut(tile)?;
        Ok(chunk.place_structure(local, structure))
    }

    /// Removes the structure at `tile`, returning it if one was there.
    pub fn remove_structure(&mut self, tile: TileCoord) -> WorldResult<Option<StructureId>> {
        let local = tile.local_coord(self.config.chunk_size);
        let chunk = self.resident_mut(tile)?;
        Ok(chunk.remove_structure(local))
    }

    /// Baseline spawn decision for `kind` at `tile` under `profile`.
    ///
    /// Pure in the world seed and arguments; harvested tiles are not
    /// filtered here. Callers combine this with
    /// [`Self::is_harvested`] for the live answer.
    #[must_use]
    pub fn should_spawn_resource(
        &self,
        profile: &BiomeProfile,
        kind: ResourceKind,
        tile: TileCoord,
    ) -> bool {
        should_spawn_resource(self.seed, profile, kind, tile)
    }

    /// Classifies `tile` and applies its biome's spawn profile.
    ///
    /// Works for any tile, resident or not, since classification is
    /// pure.
    #[must_use]
    pub fn spawns_resource_at(&self, kind: ResourceKind, tile: TileCoord) -> bool {
        let profile = self.table.profile(self.classifier.classify(tile));
        self.should_spawn_resource(profile, kind, tile)
    }

    /// Coordinates of all resident chunks, sorted for stable output.
    #[must_use]
    pub fn loaded_chunk_coords(&self) -> Vec<ChunkCoord> {
        let mut coords = self.cache.coords();
        coords.sort_unstable_by_key(|c| (c.x, c.y));
        coords
    }

    /// Lifecycle state of `coord`: resident state, `Generating` while
    /// queued or in flight, `None` otherwise.
    #[must_use]
    pub fn chunk_state(&self, coord: ChunkCoord) -> Option<ChunkState> {
        if let Some(chunk) = self.cache.get(coord) {
            return Some(chunk.state());
        }
        if self.in_flight.contains(&coord) || self.to_generate.contains(&coord) {
            return Some(ChunkState::Generating);
        }
        None
    }

    /// Number of resident chunks.
    #[must_use]
    pub fn loaded_chunk_count(&self) -> usize {
        self.cache.len()
    }

    /// Coordinates queued or in flight for generation.
    #[must_use]
    pub fn pending_generation_count(&self) -> usize {
        self.to_generate.len() + self.in_flight.len()
    }

    /// Whether no generation work is queued or in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.to_generate.is_empty() && self.in_flight.is_empty()
    }

    /// Chunk the player was last seen in.
    #[must_use]
    pub fn player_chunk(&self) -> Option<ChunkCoord> {
        self.player_chunk
    }

    /// World seed this system generates from.
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Biome profiles used for spawn decisions.
    #[must_use]
    pub const fn biome_table(&self) -> &BiomeTable {
        &self.table
    }

    /// The classifier this world generates from.
    #[must_use]
    pub const fn classifier(&self) -> &BiomeClassifier {
        &self.classifier
    }

    /// Current stats snapshot.
    #[must_use]
    pub fn stats(&self) -> WorldStats {
        let mut stats = self.stats;
        stats.loaded = self.cache.len();
        stats.active = self
            .cache
            .iter()
            .filter(|c| c.state() == ChunkState::Active)
            .count();
        stats.dormant = stats.loaded - stats.active;
        stats.in_flight = self.in_flight.len();
        stats.queued = self.to_generate.len();
        stats
    }

    fn resident(&self, tile: TileCoord) -> WorldResult<&Chunk> {
        let coord = tile.chunk_coord(self.config.chunk_size);
        self.cache
            .get(coord)
            .ok_or(WorldError::ChunkNotLoaded {
                x: coord.x,
                y: coord.y,
            })
    }

    fn resident_mut(&mut self, tile: TileCoord) -> WorldResult<&mut Chunk> {
        let coord = tile.chunk_coord(self.config.chunk_size);
        self.cache
            .get_mut(coord)
            .ok_or(WorldError::ChunkNotLoaded {
                x: coord.x,
                y: coord.y,
            })
    }
}

impl std::fmt::Debug for ChunkSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkSystem")
            .field("seed", &self.seed)
            .field("loaded", &self.cache.len())
            .field("in_flight", &self.in_flight.len())
            .field("queued", &self.to_generate.len())
            .field("player_chunk", &self.player_chunk)
            .finish_non_exhaustive()
    }
}

/// Chunk coordinates covering the square of `radius` around `center`,
/// center first, then ring by ring outward. Every cell of the square
/// appears exactly once.
fn spiral_coords(center: ChunkCoord, radius: u32) -> Vec<ChunkCoord> {
    let mut result = Vec::with_capacity((2 * radius as usize + 1).pow(2));
    result.push(center);

    // Each edge starts on one corner of the ring and stops a cell
    // short of the next corner.
    #[allow(clippy::cast_possible_wrap)]
    for ring in 1..=radius as i32 {
        // Top edge, left corner rightward
        for x in -ring..ring {
            result.push(ChunkCoord::new(center.x + x, center.y + ring));
        }
        // Right edge, top corner downward
        for y in (-ring + 1..=ring).rev() {
            result.push(ChunkCoord::new(center.x + ring, center.y + y));
        }
        // Bottom edge, right corner leftward
        for x in (-ring + 1..=ring).rev() {
            result.push(ChunkCoord::new(center.x + x, center.y - ring));
        }
        // Left edge, bottom corner upward
        for y in -ring..ring {
            result.push(ChunkCoord::new(center.x - ring, center.y + y));
        }
    }

    result
}

/// Writes one dirty chunk's delta to the store. An emptied delta
/// deletes the stored record instead. Returns `true` on success.
fn persist_chunk(
    store: &mut dyn ChunkStore,
    stats: &mut WorldStats,
    seed: WorldSeed,
    chunk: &Chunk,
) -> bool {
    let key = StoreKey::new(seed, chunk.coord());
    let delta = chunk.to_delta();

    let result = if delta.is_empty() {
        store.delete(key)
    } else {
        encode_delta(key, &delta).and_then(|bytes| store.write(key, &bytes))
    };

    match result {
        Ok(()) => {
            stats.delta_writes += 1;
            true
        }
        Err(e) => {
            stats.delta_write_failures += 1;
            warn!(key = %key, error = %e, "failed to persist chunk delta");
            false
        }
    }
}
