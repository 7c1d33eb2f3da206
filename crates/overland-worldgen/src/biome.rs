//! Biome classification.
//!
//! Maps any tile coordinate to one of seven biomes using three
//! decorrelated climate channels (temperature, moisture, elevation).
//! Classification is a pure function of `(seed, x, y)`, so two chunks
//! that share a border always agree about the tiles along it.

use serde::{Deserialize, Serialize};

use overland_common::{BiomeThresholds, TileCoord, WorldSeed};

use crate::noise::NoiseChannel;
use crate::resource::ResourceKind;

/// Channel number for the temperature field.
const TEMPERATURE_CHANNEL: u64 = 1;
/// Channel number for the moisture field.
const MOISTURE_CHANNEL: u64 = 2;
/// Channel number for the elevation field.
const ELEVATION_CHANNEL: u64 = 3;

/// Frequency multiplier for the moisture channel, relative to the
/// configured base frequency. Slightly off-unity so moisture bands do
/// not track temperature bands.
const MOISTURE_FREQUENCY_SCALE: f64 = 1.31;
/// Frequency multiplier for the elevation channel. Below unity:
/// landmasses and ranges are broader features than climate bands.
const ELEVATION_FREQUENCY_SCALE: f64 = 0.53;

/// The seven biome classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BiomeId {
    /// Dense tree cover, the default temperate biome
    Forest = 0,
    /// Open grassland
    Plains = 1,
    /// High elevation, rocky
    Mountains = 2,
    /// Lakes and seas
    Water = 3,
    /// Hot and dry
    Desert = 4,
    /// Wet lowland
    Swamp = 5,
    /// Cold and sparse
    Tundra = 6,
}

impl BiomeId {
    /// All biomes, in discriminant order.
    pub const ALL: [BiomeId; 7] = [
        BiomeId::Forest,
        BiomeId::Plains,
        BiomeId::Mountains,
        BiomeId::Water,
        BiomeId::Desert,
        BiomeId::Swamp,
        BiomeId::Tundra,
    ];

    /// Converts from a raw discriminant.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Forest),
            1 => Some(Self::Plains),
            2 => Some(Self::Mountains),
            3 => Some(Self::Water),
            4 => Some(Self::Desert),
            5 => Some(Self::Swamp),
            6 => Some(Self::Tundra),
            _ => None,
        }
    }

    /// Index into per-biome tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for BiomeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Forest => "forest",
            Self::Plains => "plains",
            Self::Mountains => "mountains",
            Self::Water => "water",
            Self::Desert => "desert",
            Self::Swamp => "swamp",
            Self::Tundra => "tundra",
        };
        f.write_str(name)
    }
}

/// Normalized climate values at one tile, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateSample {
    /// Temperature field value
    pub temperature: f64,
    /// Moisture field value
    pub moisture: f64,
    /// Elevation field value
    pub elevation: f64,
}

/// The three decorrelated climate channels of a world.
#[derive(Debug, Clone)]
pub struct NoiseField {
    temperature: NoiseChannel,
    moisture: NoiseChannel,
    elevation: NoiseChannel,
}

impl NoiseField {
    /// Creates the climate channels for a world seed.
    ///
    /// Each channel derives its own sub-seed, so the three fields are
    /// statistically independent even though they come from one seed.
    #[must_use]
    pub fn new(seed: WorldSeed, base_frequency: f64) -> Self {
        Self {
            temperature: NoiseChannel::new(seed.channel(TEMPERATURE_CHANNEL), base_frequency),
            moisture: NoiseChannel::new(
                seed.channel(MOISTURE_CHANNEL),
                base_frequency * MOISTURE_FREQUENCY_SCALE,
            ),
            elevation: NoiseChannel::new(
                seed.channel(ELEVATION_CHANNEL),
                base_frequency * ELEVATION_FREQUENCY_SCALE,
            ),
        }
    }

    /// Samples all three channels at a tile.
    #[must_use]
    pub fn sample(&self, tile: TileCoord) -> ClimateSample {
        ClimateSample {
            temperature: self.temperature.sample01(tile),
            moisture: self.moisture.sample01(tile),
            elevation: self.elevation.sample01(tile),
        }
    }
}

/// Static per-biome rules consumed by the gathering layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiomeProfile {
    /// Human-readable biome name
    pub name: &'static str,
    /// Whether ground units can enter tiles of this biome
    pub walkable: bool,
    /// Spawn probability per resource kind, indexed by `ResourceKind`
    pub spawn_rates: [f64; ResourceKind::COUNT],
}

impl BiomeProfile {
    /// Spawn probability for one resource kind.
    #[must_use]
    pub const fn spawn_rate(&self, kind: ResourceKind) -> f64 {
        self.spawn_rates[kind.index()]
    }
}

/// The built-in biome profile table.
///
/// Rates are per-tile probabilities; order within each row is
/// Tree, Rock, Bush, Crystal.
#[derive(Debug, Clone)]
pub struct BiomeTable {
    profiles: [BiomeProfile; 7],
}

impl Default for BiomeTable {
    fn default() -> Self {
        Self {
            profiles: [
                BiomeProfile {
                    name: "forest",
                    walkable: true,
                    spawn_rates: [0.18, 0.02, 0.08, 0.002],
                },
                BiomeProfile {
                    name: "plains",
                    walkable: true,
                    spawn_rates: [0.02, 0.02, 0.05, 0.001],
                },
                BiomeProfile {
                    name: "mountains",
                    walkable: true,
                    spawn_rates: [0.01, 0.15, 0.01, 0.012],
                },
                BiomeProfile {
                    name: "water",
                    walkable: false,
                    spawn_rates: [0.0, 0.0, 0.0, 0.0],
                },
                BiomeProfile {
                    name: "desert",
                    walkable: true,
                    spawn_rates: [0.0, 0.06, 0.01, 0.006],
                },
                BiomeProfile {
                    name: "swamp",
                    walkable: true,
                    spawn_rates: [0.08, 0.01, 0.10, 0.003],
                },
                BiomeProfile {
                    name: "tundra",
                    walkable: true,
                    spawn_rates: [0.03, 0.08, 0.02, 0.008],
                },
            ],
        }
    }
}

impl BiomeTable {
    /// Profile for a biome.
    #[must_use]
    pub const fn profile(&self, id: BiomeId) -> &BiomeProfile {
        &self.profiles[id.index()]
    }
}

/// Deterministic tile-to-biome classifier.
///
/// Cheap to clone: each generation worker owns its own copy so workers
/// never share state.
#[derive(Debug, Clone)]
pub struct BiomeClassifier {
    field: NoiseField,
    thresholds: BiomeThresholds,
}

impl BiomeClassifier {
    /// Creates a classifier for a world seed.
    #[must_use]
    pub fn new(seed: WorldSeed, base_frequency: f64, thresholds: BiomeThresholds) -> Self {
        Self {
            field: NoiseField::new(seed, base_frequency),
            thresholds,
        }
    }

    /// Classifies a tile.
    ///
    /// Pure in `(seed, x, y)`: the result never depends on which chunk
    /// triggered the call, which is what keeps chunk borders seamless.
    #[must_use]
    pub fn classify(&self, tile: TileCoord) -> BiomeId {
        self.classify_climate(self.field.sample(tile))
    }

    /// Samples the raw climate at a tile.
    #[must_use]
    pub fn climate_at(&self, tile: TileCoord) -> ClimateSample {
        self.field.sample(tile)
    }

    /// Maps a climate sample to a biome.
    ///
    /// Elevation overrides come first: the highest ground is always
    /// Mountains and the lowest always Water, whatever the climate says.
    /// The remaining tiles fall into a Whittaker-style grid of
    /// temperature band by moisture band.
    #[must_use]
    pub fn classify_climate(&self, climate: ClimateSample) -> BiomeId {
        let t = &self.thresholds;

        if climate.elevation >= t.mountain_elevation {
            return BiomeId::Mountains;
        }
        if climate.elevation <= t.water_elevation {
            return BiomeId::Water;
        }

        let cold = climate.temperature < t.cold;
        let hot = climate.temperature >= t.hot;
        let dry = climate.moisture < t.dry;
        let wet = climate.moisture >= t.wet;

        match (cold, hot) {
            // Cold band: tundra except where there is enough moisture
            // to support taiga-like forest.
            (true, _) => {
                if wet {
                    BiomeId::Forest
                } else {
                    BiomeId::Tundra
                }
            },
            // Hot band: deserts when dry, swamps when wet.
            (_, true) => {
                if dry {
                    BiomeId::Desert
                } else if wet {
                    BiomeId::Swamp
                } else {
                    BiomeId::Plains
                }
            },
            // Temperate band.
            (false, false) => {
                if dry {
                    BiomeId::Plains
                } else if wet {
                    BiomeId::Swamp
                } else {
                    BiomeId::Forest
                }
            },
        }
    }
}
