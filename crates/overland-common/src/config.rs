//! World configuration.
//!
//! Provides the tunable parameters for chunk streaming, generation
//! budgets, persistence, and biome classification thresholds.
//! Configuration can be loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::coords::CHUNK_SIZE;
use crate::error::WorldError;

/// World configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    // === Chunk geometry ===
    /// Chunk side length in tiles. Must stay fixed for the lifetime of a
    /// world; persisted deltas index tiles by this size.
    pub chunk_size: u32,

    // === Streaming ===
    /// Radius in chunks (Chebyshev) kept Active around the player
    pub load_radius: u32,
    /// Extra radius band kept Dormant before eviction kicks in
    pub dormant_margin: u32,
    /// Absolute cap on resident chunks, regardless of radii
    pub max_loaded_chunks: usize,

    // === Generation budget ===
    /// Cap on synchronous completion-merge work per frame, in milliseconds
    pub generation_slice_ms: u64,
    /// Generation jobs dispatched to the worker pool per frame
    pub max_jobs_per_frame: usize,
    /// Worker threads classifying chunks in the background
    pub worker_threads: usize,

    // === Persistence ===
    /// Frames between checkpoint flushes of dirty resident chunks (0 = disabled)
    pub checkpoint_interval_frames: u32,
    /// Directory holding persisted chunk deltas
    pub save_dir: PathBuf,

    // === Classification ===
    /// Base frequency of the climate noise channels
    pub noise_frequency: f64,
    /// Biome classification thresholds
    pub biome_thresholds: BiomeThresholds,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            load_radius: 3,
            dormant_margin: 2,
            max_loaded_chunks: 200,
            generation_slice_ms: 2,
            max_jobs_per_frame: 2,
            worker_threads: 2,
            checkpoint_interval_frames: 600,
            save_dir: PathBuf::from("world_data"),
            noise_frequency: 0.008,
            biome_thresholds: BiomeThresholds::default(),
        }
    }
}

impl WorldConfig {
    /// Loads configuration from a TOML file.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("World config not found at {}, using defaults", path.display());
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read world config: {e}");
                    return Self::default();
                }

                match toml::from_str(&contents) {
                    Ok(config) => {
                        info!("Loaded world config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse world config: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open world config: {e}");
                Self::default()
            },
        }
    }

    /// Saves configuration to a TOML file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved world config to {}", path.display());
        Ok(())
    }

    /// Number of chunks in the Active square around the player.
    #[must_use]
    pub const fn active_set_size(&self) -> usize {
        let side = 2 * self.load_radius as usize + 1;
        side * side
    }

    /// Radius beyond which resident chunks are evicted.
    #[must_use]
    pub const fn dormant_radius(&self) -> u32 {
        self.load_radius + self.dormant_margin
    }

    /// Validates the configuration.
    ///
    /// Rejects values the chunk system cannot operate under, rather than
    /// clamping them: a cap smaller than the Active set would evict chunks
    /// the same frame they load.
    pub fn validate(&self) -> Result<(), WorldError> {
        if !(8..=128).contains(&self.chunk_size) {
            return Err(WorldError::InvalidConfig(format!(
                "chunk_size {} outside supported range 8..=128",
                self.chunk_size
            )));
        }
        if self.load_radius == 0 {
            return Err(WorldError::InvalidConfig(
                "load_radius must be at least 1".into(),
            ));
        }
        if self.max_loaded_chunks < self.active_set_size() {
            return Err(WorldError::InvalidConfig(format!(
                "max_loaded_chunks {} is smaller than the {} chunks required at load_radius {}",
                self.max_loaded_chunks,
                self.active_set_size(),
                self.load_radius
            )));
        }
        if self.generation_slice_ms == 0 {
            return Err(WorldError::InvalidConfig(
                "generation_slice_ms must be at least 1".into(),
            ));
        }
        if self.max_jobs_per_frame == 0 {
            return Err(WorldError::InvalidConfig(
                "max_jobs_per_frame must be at least 1".into(),
            ));
        }
        if !(1..=32).contains(&self.worker_threads) {
            return Err(WorldError::InvalidConfig(format!(
                "worker_threads {} outside supported range 1..=32",
                self.worker_threads
            )));
        }
        if !(self.noise_frequency.is_finite() && self.noise_frequency > 0.0) {
            return Err(WorldError::InvalidConfig(format!(
                "noise_frequency {} must be finite and positive",
                self.noise_frequency
            )));
        }
        self.biome_thresholds.validate()
    }
}

/// Thresholds steering biome classification.
///
/// Elevation thresholds apply first as overrides; the temperature and
/// moisture thresholds then bucket the remaining tiles into the
/// Whittaker-style lookup grid. All values are in the normalized [0, 1]
/// range the noise channels produce. Exact values are tunable flavor,
/// not a correctness contract.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeThresholds {
    /// Elevation at or below this becomes Water
    pub water_elevation: f64,
    /// Elevation at or above this becomes Mountains
    pub mountain_elevation: f64,
    /// Temperature below this is the cold band
    pub cold: f64,
    /// Temperature at or above this is the hot band
    pub hot: f64,
    /// Moisture below this is the dry band
    pub dry: f64,
    /// Moisture at or above this is the wet band
    pub wet: f64,
}

impl Default for BiomeThresholds {
    fn default() -> Self {
        Self {
            water_elevation: 0.26,
            mountain_elevation: 0.78,
            cold: 0.34,
            hot: 0.66,
            dry: 0.33,
            wet: 0.67,
        }
    }
}

impl BiomeThresholds {
    /// Validates threshold ordering and range.
    pub fn validate(&self) -> Result<(), WorldError> {
        let in_range = |v: f64| (0.0..=1.0).contains(&v) && v.is_finite();
        let all = [
            self.water_elevation,
            self.mountain_elevation,
            self.cold,
            self.hot,
            self.dry,
            self.wet,
        ];
        if !all.iter().copied().all(in_range) {
            return Err(WorldError::InvalidConfig(
                "biome thresholds must lie in [0, 1]".into(),
            ));
        }
        if self.water_elevation >= self.mountain_elevation {
            return Err(WorldError::InvalidConfig(format!(
                "water_elevation {} must be below mountain_elevation {}",
                self.water_elevation, self.mountain_elevation
            )));
        }
        if self.cold >= self.hot {
            return Err(WorldError::InvalidConfig(format!(
                "cold threshold {} must be below hot threshold {}",
                self.cold, self.hot
            )));
        }
        if self.dry >= self.wet {
            return Err(WorldError::InvalidConfig(format!(
                "dry threshold {} must be below wet threshold {}",
                self.dry, self.wet
            )));
        }
        Ok(())
    }
}
