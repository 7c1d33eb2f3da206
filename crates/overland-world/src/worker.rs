//! Background chunk generation.
//!
//! A fixed pool of worker threads turns chunk coordinates into biome
//! grids. Workers are pure producers: they classify tiles and never
//! touch the cache or the store, so all mutable world state stays on
//! the coordinating thread. Requests and results flow over bounded
//! channels; a full request queue makes [`GenerationPool::submit`]
//! return `false` and the coordinator retries on a later frame.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::debug;

use overland_common::{ChunkCoord, TileCoord};
use overland_worldgen::{BiomeClassifier, BiomeId};

/// Pending generation requests before `submit` starts refusing.
const REQUEST_QUEUE_CAPACITY: usize = 256;

/// Finished grids awaiting collection. Workers block on a full result
/// queue, which throttles generation to the coordinator's drain rate.
const RESULT_QUEUE_CAPACITY: usize = 64;

/// A chunk the coordinator wants generated.
#[derive(Debug, Clone, Copy)]
struct GenRequest {
    coord: ChunkCoord,
}

/// A finished biome grid, row-major over the chunk's tiles.
#[derive(Debug, Clone)]
pub struct GenResult {
    /// Chunk the grid belongs to
    pub coord: ChunkCoord,
    /// `chunk_size * chunk_size` biomes in tile-index order
    pub biomes: Vec<BiomeId>,
}

/// Classifies every tile of `coord` in tile-index order.
#[must_use]
pub fn generate_chunk_biomes(
    classifier: &BiomeClassifier,
    coord: ChunkCoord,
    chunk_size: u32,
) -> Vec<BiomeId> {
    let base = coord.base_tile(chunk_size);
    let size = i64::from(chunk_size);
    let mut biomes = Vec::with_capacity((chunk_size * chunk_size) as usize);
    for dy in 0..size {
        for dx in 0..size {
            biomes.push(classifier.classify(TileCoord::new(base.x + dx, base.y + dy)));
        }
    }
    biomes
}

/// Fixed-size pool of generation workers.
///
/// Dropping the pool closes the request channel, lets each worker
/// finish its current grid, and joins every thread.
#[derive(Debug)]
pub struct GenerationPool {
    request_tx: Option<Sender<GenRequest>>,
    result_rx: Option<Receiver<GenResult>>,
    workers: Vec<JoinHandle<()>>,
}

impl GenerationPool {
    /// Spawns `worker_count` threads, each owning a clone of
    /// `classifier`.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn a thread.
    #[must_use]
    pub fn new(classifier: &BiomeClassifier, chunk_size: u32, worker_count: usize) -> Self {
        let (request_tx, request_rx) = bounded::<GenRequest>(REQUEST_QUEUE_CAPACITY);
        let (result_tx, result_rx) = bounded::<GenResult>(RESULT_QUEUE_CAPACITY);

        let workers = (0..worker_count)
            .map(|i| {
                let classifier = classifier.clone();
                let request_rx = request_rx.clone();
                let result_tx = result_tx.clone();
                std::thread::Builder::new()
                    .name(format!("overland-gen-{i}"))
                    .spawn(move || worker_loop(&classifier, chunk_size, &request_rx, &result_tx))
                    .expect("failed to spawn generation worker")
            })
            .collect();

        debug!(worker_count, "generation pool started");

        Self {
            request_tx: Some(request_tx),
            result_rx: Some(result_rx),
            workers,
        }
    }

    /// Queues `coord` for generation. Returns `false` when the request
    /// queue is full; the caller keeps the coordinate and retries.
    pub fn submit(&self, coord: ChunkCoord) -> bool {
        self.request_tx
            .as_ref()
            .is_some_and(|tx| tx.try_send(GenRequest { coord }).is_ok())
    }

    /// Takes one finished grid if any is ready. Never blocks.
    pub fn try_next(&self) -> Option<GenResult> {
        self.result_rx.as_ref()?.try_recv().ok()
    }

    /// Blocks up to `timeout` for one finished grid. Test and shutdown
    /// helper; frame code uses [`Self::try_next`].
    pub fn next_timeout(&self, timeout: Duration) -> Option<GenResult> {
        self.result_rx.as_ref()?.recv_timeout(timeout).ok()
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for GenerationPool {
    fn drop(&mut self) {
        // Closing requests ends each worker's recv loop; closing the
        // result channel unblocks any worker stuck on a full queue.
        drop(self.request_tx.take());
        drop(self.result_rx.take());
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        debug!("generation pool stopped");
    }
}

fn worker_loop(
    classifier: &BiomeClassifier,
    chunk_size: u32,
    requests: &Receiver<GenRequest>,
    results: &Sender<GenResult>,
) {
    while let Ok(request) = requests.recv() {
        let biomes = generate_chunk_biomes(classifier, request.coord, chunk_size);
        let result = GenResult {
            coord: request.coord,
            biomes,
        };
        if results.send(result).is_err() {
            break;
        }
    }
}
