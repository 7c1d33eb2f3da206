//! Error types for Overland.

use thiserror::Error;

/// Errors from the persistent delta store and the delta wire codec.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize a delta payload
    #[error("Failed to encode delta: {0}")]
    Encode(String),

    /// Failed to deserialize a delta payload
    #[error("Failed to decode delta: {0}")]
    Decode(String),

    /// Stored bytes do not start with the delta magic
    #[error("Bad magic bytes, not a delta record")]
    BadMagic,

    /// Schema version this build does not understand
    #[error("Unsupported delta version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the record header
        found: u32,
        /// Highest version this build can read
        supported: u32,
    },

    /// Checksum of the stored payload does not match its header
    #[error("Checksum mismatch: header says {expected:#010x}, payload is {actual:#010x}")]
    ChecksumMismatch {
        /// Checksum recorded in the header
        expected: u32,
        /// Checksum computed over the stored payload
        actual: u32,
    },

    /// Record was written for a different seed or chunk than requested
    #[error("Key mismatch: record is for {found}, expected {expected}")]
    KeyMismatch {
        /// Key the caller asked for
        expected: String,
        /// Key found in the record header
        found: String,
    },

    /// Record is too short to contain what its framing promises
    #[error("Insufficient data: need {needed} bytes, have {available}")]
    InsufficientData {
        /// Bytes required by the framing
        needed: usize,
        /// Bytes actually present
        available: usize,
    },
}

/// Errors from the chunk system's public API.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Query or mutation touched a chunk that is not resident
    #[error("Chunk not loaded at ({x}, {y})")]
    ChunkNotLoaded {
        /// Chunk X coordinate
        x: i32,
        /// Chunk Y coordinate
        y: i32,
    },

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Store failure surfaced through the world API
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for world operations.
pub type WorldResult<T> = Result<T, WorldError>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
