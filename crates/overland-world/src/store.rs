//! Persistent delta storage.
//!
//! The store is a flat key/value surface: deterministic string keys of
//! `"<seed>:<cx>:<cy>"` mapping to encoded delta records. A missing key
//! means the chunk has no mutations and regenerates purely from the
//! classifier. Backends stay byte-oriented; framing and corruption
//! detection live in [`crate::delta`] so every backend inherits the
//! same policy.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

use overland_common::{ChunkCoord, StoreResult, WorldSeed};

/// Canonical key of a persisted chunk delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreKey {
    /// World the delta belongs to
    pub seed: WorldSeed,
    /// Chunk the delta describes
    pub coord: ChunkCoord,
}

impl StoreKey {
    /// Creates a store key.
    #[must_use]
    pub const fn new(seed: WorldSeed, coord: ChunkCoord) -> Self {
        Self { seed, coord }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.seed, self.coord.x, self.coord.y)
    }
}

/// Byte-oriented persistence backend for chunk deltas.
///
/// Implementations must treat a missing key as `Ok(None)`, never as an
/// error: absence is the normal state for unmutated chunks.
pub trait ChunkStore: Send {
    /// Reads the record under `key`, or `None` if absent.
    fn read(&self, key: StoreKey) -> StoreResult<Option<Vec<u8>>>;

    /// Writes (or replaces) the record under `key`.
    fn write(&mut self, key: StoreKey, bytes: &[u8]) -> StoreResult<()>;

    /// Deletes the record under `key`. Deleting an absent key is a no-op.
    fn delete(&mut self, key: StoreKey) -> StoreResult<()>;

    /// All keys currently present, as canonical strings. Diagnostic.
    fn keys(&self) -> StoreResult<Vec<String>>;
}

/// Filesystem-backed delta store.
///
/// Layout: `<root>/<seed>/delta_<cx>_<cy>.ovd`. Writes go through a
/// temp file and rename so a crash mid-write leaves either the old
/// record or none, never a torn one.
#[derive(Debug)]
pub struct FileDeltaStore {
    root: PathBuf,
}

impl FileDeltaStore {
    /// Creates a store rooted at `root`. The directory is created on
    /// first write, not here.
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Path of the record for `key`.
    fn record_path(&self, key: StoreKey) -> PathBuf {
        self.root
            .join(key.seed.to_string())
            .join(format!("delta_{}_{}.ovd", key.coord.x, key.coord.y))
    }

    /// Parses `delta_<cx>_<cy>.ovd` back into a chunk coordinate.
    fn parse_record_name(name: &str) -> Option<ChunkCoord> {
        let middle = name.strip_prefix("delta_")?.strip_suffix(".ovd")?;
        let (cx, cy) = middle.split_once('_')?;
        Some(ChunkCoord::new(cx.parse().ok()?, cy.parse().ok()?))
    }
}

impl ChunkStore for FileDeltaStore {
    fn read(&self, key: StoreKey) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.record_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: StoreKey, bytes: &[u8]) -> StoreResult<()> {
        let path = self.record_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("ovd.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&mut self, key: StoreKey) -> StoreResult<()> {
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();

        let seed_dirs = match fs::read_dir(&self.root) {
            Ok(dirs) => dirs,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(e.into()),
        };

        for seed_dir in seed_dirs {
            let seed_dir = seed_dir?;
            let Some(seed) = seed_dir
                .file_name()
                .to_str()
                .and_then(|s| s.parse::<u64>().ok())
            else {
                continue;
            };

            for record in fs::read_dir(seed_dir.path())? {
                let record = record?;
                let name = record.file_name();
                let Some(coord) = name.to_str().and_then(Self::parse_record_name) else {
                    continue;
                };
                keys.push(StoreKey::new(WorldSeed::new(seed), coord).to_string());
            }
        }

        Ok(keys)
    }
}

/// In-memory delta store for tests and no-persistence worlds.
///
/// Clones share the same underlying records, so a caller can hand one
/// handle to the chunk system and keep another to observe what it
/// persists.
#[derive(Debug, Default, Clone)]
pub struct MemoryDeltaStore {
    records: Arc<Mutex<AHashMap<String, Vec<u8>>>>,
}

impl MemoryDeltaStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl ChunkStore for MemoryDeltaStore {
    fn read(&self, key: StoreKey) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.records.lock().get(&key.to_string()).cloned())
    }

    fn write(&mut self, key: StoreKey, bytes: &[u8]) -> StoreResult<()> {
        self.records.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: StoreKey) -> StoreResult<()> {
        self.records.lock().remove(&key.to_string());
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.records.lock().keys().cloned().collect())
    }
}
