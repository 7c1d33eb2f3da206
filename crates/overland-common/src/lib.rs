//! # Overland Common
//!
//! Common types, utilities, and shared abstractions for Overland.
//!
//! This crate provides foundational types used across all Overland subsystems:
//! - Coordinate types (tile, chunk, local)
//! - The world seed and per-channel sub-seed derivation
//! - ID types
//! - World configuration and biome thresholds
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod coords;
pub mod error;
pub mod ids;
pub mod seed;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::seed::*;
}

pub use prelude::*;
