//! # Overland Worldgen
//!
//! Deterministic procedural generation for Overland:
//! - Seeded simplex noise and octaved climate channels
//! - Biome classification (Whittaker-style, elevation overrides)
//! - Stateless resource spawn decisions
//!
//! Everything in this crate is a pure function of the world seed and a
//! tile coordinate. There is no caching and no mutable state, which is
//! what makes chunks regenerable and chunk borders seamless.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod biome;
pub mod noise;
pub mod resource;

pub use biome::{BiomeClassifier, BiomeId, BiomeProfile, BiomeTable, ClimateSample, NoiseField};
pub use noise::{NoiseChannel, SimplexNoise, NOISE_COORD_LIMIT};
pub use resource::{should_spawn_resource, spawn_roll, ResourceKind};
