//! End-to-end tests for chunk streaming.
//!
//! These tests drive generation, caching, persistence, and failure
//! handling together through the public [`ChunkSystem`] surface,
//! simulating a player moving through the world and validating the
//! outcomes a game client would observe.

#![cfg(test)]

use std::time::{Duration, Instant};

use overland_common::{
    ChunkCoord, StructureId, TileCoord, WorldConfig, WorldSeed, CHUNK_SIZE,
};
use overland_worldgen::{BiomeClassifier, BiomeId, ResourceKind};

use crate::delta::encode_delta;
use crate::store::{ChunkStore, FileDeltaStore, MemoryDeltaStore, StoreKey};
use crate::system::ChunkSystem;

fn config(load_radius: u32, dormant_margin: u32, max_loaded: usize) -> WorldConfig {
    WorldConfig {
        load_radius,
        dormant_margin,
        max_loaded_chunks: max_loaded,
        checkpoint_interval_frames: 0,
        ..WorldConfig::default()
    }
}

/// System plus a second handle onto its in-memory store.
fn memory_system(seed: u64, config: WorldConfig) -> (ChunkSystem, MemoryDeltaStore) {
    let store = MemoryDeltaStore::new();
    let system = ChunkSystem::new(WorldSeed::new(seed), config, Box::new(store.clone()))
        .expect("config rejected");
    (system, store)
}

/// Runs frames until all queued generation has landed.
fn settle(system: &mut ChunkSystem, tile: TileCoord) {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        system.update(tile);
        if system.is_idle() {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "chunk system failed to settle within 10s"
        );
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Every tile of `coord`, in tile-index order.
fn chunk_tiles(coord: ChunkCoord) -> impl Iterator<Item = TileCoord> {
    let base = coord.base_tile(CHUNK_SIZE);
    let size = i64::from(CHUNK_SIZE);
    (0..size).flat_map(move |dy| (0..size).map(move |dx| TileCoord::new(base.x + dx, base.y + dy)))
}

/// Biomes of all loaded chunks keyed by sorted coordinate order.
fn loaded_biome_snapshot(system: &ChunkSystem) -> Vec<(ChunkCoord, Vec<BiomeId>)> {
    system
        .loaded_chunk_coords()
        .into_iter()
        .map(|coord| {
            let biomes = chunk_tiles(coord)
                .map(|tile| system.biome_at(tile).expect("loaded chunk lost mid-snapshot"))
                .collect();
            (coord, biomes)
        })
        .collect()
}

/// Determinism across runs and seeds
mod determinism_tests {
    use super::*;

    #[test]
    fn e2e_same_seed_produces_identical_worlds() {
        let (mut a, _) = memory_system(2024, config(2, 2, 200));
        let (mut b, _) = memory_system(2024, config(2, 2, 200));
        let pos = TileCoord::new(100, -50);

        settle(&mut a, pos);
        settle(&mut b, pos);

        assert_eq!(
            a.loaded_chunk_coords(),
            b.loaded_chunk_coords(),
            "same seed and position must load the same chunk set"
        );
        assert_eq!(
            loaded_biome_snapshot(&a),
            loaded_biome_snapshot(&b),
            "same seed must classify every tile identically"
        );

        // Spawn decisions are part of the deterministic surface too.
        for coord in a.loaded_chunk_coords() {
            for tile in chunk_tiles(coord).step_by(7) {
                for kind in ResourceKind::ALL {
                    assert_eq!(
                        a.spawns_resource_at(kind, tile),
                        b.spawns_resource_at(kind, tile)
                    );
                }
            }
        }
    }

    #[test]
    fn e2e_different_seeds_diverge() {
        let (mut a, _) = memory_system(1, config(2, 2, 200));
        let (mut b, _) = memory_system(2, config(2, 2, 200));
        let pos = TileCoord::new(0, 0);

        settle(&mut a, pos);
        settle(&mut b, pos);

        let differing = a
            .loaded_chunk_coords()
            .into_iter()
            .flat_map(chunk_tiles)
            .filter(|&tile| a.biome_at(tile).unwrap() != b.biome_at(tile).unwrap())
            .count();
        assert!(
            differing > 0,
            "seeds 1 and 2 produced identical biomes over {} tiles",
            25 * (CHUNK_SIZE * CHUNK_SIZE) as usize
        );
    }

    #[test]
    fn e2e_revisiting_regenerates_identical_biomes() {
        let (mut system, _) = memory_system(31_337, config(2, 2, 200));
        let home = TileCoord::new(0, 0);

        settle(&mut system, home);
        let first_visit = loaded_biome_snapshot(&system);

        settle(&mut system, TileCoord::new(50_000, -50_000));
        settle(&mut system, home);

        assert_eq!(
            loaded_biome_snapshot(&system),
            first_visit,
            "revisited chunks must regenerate bit-identical biomes"
        );
    }
}

/// Seam-free generation across chunk borders
mod seam_tests {
    use super::*;

    #[test]
    fn e2e_chunk_borders_match_direct_classification() {
        let seed = 9001;
        let (mut system, _) = memory_system(seed, config(2, 2, 200));
        settle(&mut system, TileCoord::new(0, 0));

        // Independent classifier built from the same world parameters.
        let cfg = system.config();
        let reference =
            BiomeClassifier::new(WorldSeed::new(seed), cfg.noise_frequency, cfg.biome_thresholds);

        let size = i64::from(CHUNK_SIZE);
        // Tiles hugging the vertical border between chunks (0,*) and
        // (1,*), and the horizontal border between (*,0) and (*,1).
        // The two sides were produced by separate generation jobs.
        for along in -size..size {
            for offset in [size - 1, size] {
                for tile in [
                    TileCoord::new(offset, along),
                    TileCoord::new(along, offset),
                ] {
                    assert_eq!(
                        system.biome_at(tile).expect("border tile not loaded"),
                        reference.classify(tile),
                        "seam at {tile:?}: chunk data diverged from classification"
                    );
                }
            }
        }
    }

    #[test]
    fn e2e_loaded_grids_match_worker_output() {
        let seed = 4242;
        let (mut system, _) = memory_system(seed, config(1, 1, 200));
        settle(&mut system, TileCoord::new(16, 16));

        let cfg = system.config();
        let reference =
            BiomeClassifier::new(WorldSeed::new(seed), cfg.noise_frequency, cfg.biome_thresholds);

        for coord in system.loaded_chunk_coords() {
            let expected = crate::worker::generate_chunk_biomes(&reference, coord, CHUNK_SIZE);
            let actual: Vec<BiomeId> = chunk_tiles(coord)
                .map(|tile| system.biome_at(tile).unwrap())
                .collect();
            assert_eq!(actual, expected, "grid mismatch in chunk {coord:?}");
        }
    }
}

/// Delta persistence round trips
mod persistence_tests {
    use super::*;

    /// The canonical teleport scenario: harvest near the origin, jump
    /// ten thousand tiles away so everything evicts, then come back.
    #[test]
    fn e2e_harvest_survives_teleport_round_trip() {
        let (mut system, store) = memory_system(12_345, config(2, 2, 200));
        let home = TileCoord::new(0, 0);
        let harvested_tile = TileCoord::new(5, 5);

        settle(&mut system, home);
        assert_eq!(
            system.loaded_chunk_count(),
            25,
            "load radius 2 must hold exactly 25 chunks"
        );
        let before = loaded_biome_snapshot(&system);

        assert!(system.mark_harvested(harvested_tile).unwrap());

        // Teleport far enough that every home chunk leaves the world.
        settle(&mut system, TileCoord::new(10_000, 10_000));
        assert_eq!(system.chunk_state(ChunkCoord::new(0, 0)), None);
        assert_eq!(
            store.len(),
            1,
            "only the chunk holding the harvest should persist a delta"
        );

        settle(&mut system, home);
        assert_eq!(system.loaded_chunk_count(), 25);
        assert!(
            system.is_harvested(harvested_tile).unwrap(),
            "harvest lost across teleport"
        );

        // Nothing else changed: biomes identical, no other tile
        // harvested, no structures appeared.
        assert_eq!(loaded_biome_snapshot(&system), before);
        for coord in system.loaded_chunk_coords() {
            for tile in chunk_tiles(coord) {
                if tile != harvested_tile {
                    assert!(
                        !system.is_harvested(tile).unwrap(),
                        "spurious harvest at {tile:?}"
                    );
                }
                assert_eq!(system.structure_at(tile).unwrap(), None);
            }
        }
    }

    #[test]
    fn e2e_structures_survive_system_restart() {
        let dir = tempfile::TempDir::new().unwrap();
        let seed = WorldSeed::new(555);
        let cfg = config(1, 1, 200);
        let home = TileCoord::new(16, 16);
        let hut = StructureId::new(9);

        {
            let store = FileDeltaStore::new(dir.path());
            let mut system = ChunkSystem::new(seed, cfg.clone(), Box::new(store)).unwrap();
            settle(&mut system, home);

            system.mark_harvested(TileCoord::new(10, 10)).unwrap();
            assert_eq!(system.place_structure(TileCoord::new(12, 12), hut).unwrap(), None);
            assert_eq!(system.flush_all(), 1);
        }

        assert!(
            dir.path().join("555").join("delta_0_0.ovd").exists(),
            "flush did not write the delta record"
        );

        let store = FileDeltaStore::new(dir.path());
        let mut system = ChunkSystem::new(seed, cfg, Box::new(store)).unwrap();
        settle(&mut system, home);

        assert!(system.is_harvested(TileCoord::new(10, 10)).unwrap());
        assert_eq!(system.structure_at(TileCoord::new(12, 12)).unwrap(), Some(hut));
    }

    #[test]
    fn e2e_emptied_delta_deletes_stored_record() {
        let (mut system, store) = memory_system(800, config(1, 1, 200));
        settle(&mut system, TileCoord::new(16, 16));

        let tile = TileCoord::new(3, 3);
        let id = StructureId::new(2);
        system.place_structure(tile, id).unwrap();
        system.flush_all();
        assert_eq!(store.len(), 1);

        assert_eq!(system.remove_structure(tile).unwrap(), Some(id));
        system.flush_all();
        assert!(
            store.is_empty(),
            "a delta emptied by structure removal must delete its record"
        );
    }
}

/// Eviction behavior
mod eviction_tests {
    use super::*;

    #[test]
    fn e2e_clean_chunks_evict_without_writes() {
        let (mut system, store) = memory_system(77, config(1, 1, 200));
        let home = TileCoord::new(16, 16);

        settle(&mut system, home);
        let first_visit = loaded_biome_snapshot(&system);

        settle(&mut system, TileCoord::new(20_000, 0));
        settle(&mut system, home);

        assert_eq!(
            system.stats().delta_writes,
            0,
            "evicting unmodified chunks must not touch the store"
        );
        assert!(store.is_empty());
        assert_eq!(loaded_biome_snapshot(&system), first_visit);
    }
}

/// Cache capacity bounds
mod capacity_tests {
    use super::*;

    #[test]
    fn e2e_resident_count_never_exceeds_cap() {
        // Cap equal to the Active set leaves no room for a dormant
        // band, so the cap binds on every border crossing.
        let (mut system, _) = memory_system(64, config(1, 2, 9));

        for step in 0..60_i64 {
            system.update(TileCoord::new(step * 8, 0));
            assert!(
                system.loaded_chunk_count() <= 9,
                "cap exceeded at step {step}: {} resident",
                system.loaded_chunk_count()
            );
            std::thread::sleep(Duration::from_millis(1));
        }

        let end = TileCoord::new(60 * 8, 0);
        settle(&mut system, end);
        assert!(system.loaded_chunk_count() <= 9);
        assert!(system.stats().evicted_total > 0);
    }
}

/// Corrupt and unreadable stored data
mod resilience_tests {
    use super::*;

    #[test]
    fn e2e_corrupt_delta_loads_baseline() {
        let seed = 606;
        let store = MemoryDeltaStore::new();
        let key = StoreKey::new(WorldSeed::new(seed), ChunkCoord::new(0, 0));
        {
            let mut handle = store.clone();
            handle.write(key, b"not a delta record at all").unwrap();
        }

        let mut system =
            ChunkSystem::new(WorldSeed::new(seed), config(1, 1, 200), Box::new(store.clone()))
                .unwrap();
        settle(&mut system, TileCoord::new(16, 16));

        assert_eq!(system.stats().corrupt_deltas_discarded, 1);

        // The chunk loads as pristine baseline.
        let cfg = system.config();
        let reference = BiomeClassifier::new(
            WorldSeed::new(seed),
            cfg.noise_frequency,
            cfg.biome_thresholds,
        );
        for tile in chunk_tiles(ChunkCoord::new(0, 0)) {
            assert_eq!(system.biome_at(tile).unwrap(), reference.classify(tile));
            assert!(!system.is_harvested(tile).unwrap());
        }
    }

    #[test]
    fn e2e_truncated_delta_loads_baseline() {
        let seed = 607;
        let store = MemoryDeltaStore::new();
        let key = StoreKey::new(WorldSeed::new(seed), ChunkCoord::new(0, 0));
        {
            let delta = crate::delta::ChunkDelta {
                harvested: vec![5],
                structures: Vec::new(),
            };
            let bytes = encode_delta(key, &delta).unwrap();
            let mut handle = store.clone();
            handle.write(key, &bytes[..bytes.len() / 2]).unwrap();
        }

        let mut system =
            ChunkSystem::new(WorldSeed::new(seed), config(1, 1, 200), Box::new(store))
                .unwrap();
        settle(&mut system, TileCoord::new(16, 16));

        assert_eq!(system.stats().corrupt_deltas_discarded, 1);
        // Tile index 5 is local (5, 0), the tile the lost delta marked.
        assert!(
            !system.is_harvested(TileCoord::new(5, 0)).unwrap(),
            "truncated delta must be discarded, not partially applied"
        );
    }

    #[test]
    fn e2e_harvest_after_corrupt_delta_persists_fresh() {
        let seed = 608;
        let store = MemoryDeltaStore::new();
        let key = StoreKey::new(WorldSeed::new(seed), ChunkCoord::new(0, 0));
        {
            let mut handle = store.clone();
            handle.write(key, b"garbage").unwrap();
        }

        let mut system =
            ChunkSystem::new(WorldSeed::new(seed), config(1, 1, 200), Box::new(store.clone()))
                .unwrap();
        let home = TileCoord::new(16, 16);
        settle(&mut system, home);

        // New mutations replace the corrupt record on write-back.
        system.mark_harvested(TileCoord::new(7, 7)).unwrap();
        system.flush_all();

        settle(&mut system, TileCoord::new(30_000, 0));
        settle(&mut system, home);
        assert!(system.is_harvested(TileCoord::new(7, 7)).unwrap());
        assert_eq!(system.stats().corrupt_deltas_discarded, 1);
    }
}
