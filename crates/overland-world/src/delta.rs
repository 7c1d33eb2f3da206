//! Delta wire format.
//!
//! A persisted record is a length-prefixed bincode header followed by
//! the lz4-compressed bincode payload:
//!
//! ```text
//! [header_len: u32 LE][DeltaHeader][lz4(ChunkDelta payload)]
//! ```
//!
//! The header carries magic bytes, a schema version, the store key the
//! record was written under, and a CRC-32 of the compressed payload.
//! Decoding checks each in that order; records from unknown schema
//! versions are rejected outright rather than guessed at, and any byte
//! damage surfaces as a checksum or decode error the caller downgrades
//! to "no delta".

use serde::{Deserialize, Serialize};

use overland_common::{StoreError, StoreResult, StructureId};

use crate::store::StoreKey;

/// Magic bytes identifying a delta record.
pub const DELTA_MAGIC: [u8; 4] = *b"OVLD";

/// Current delta schema version.
pub const DELTA_VERSION: u32 = 1;

/// One placed structure inside a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureEntry {
    /// Row-major tile index within the chunk
    pub tile_index: u16,
    /// Structure occupying the tile
    pub structure: StructureId,
}

/// Minimal diff between a chunk's deterministic baseline and its
/// mutated state. Both lists are sorted by tile index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Tile indices whose resource has been harvested
    pub harvested: Vec<u16>,
    /// Structures placed by the player
    pub structures: Vec<StructureEntry>,
}

impl ChunkDelta {
    /// Whether the delta records no mutations.
    ///
    /// Empty deltas are never written; an empty delta at flush time
    /// means any previously stored record should be deleted instead.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.harvested.is_empty() && self.structures.is_empty()
    }
}

/// Record header preceding the compressed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct DeltaHeader {
    /// Magic bytes, always `DELTA_MAGIC`
    magic: [u8; 4],
    /// Schema version, always `DELTA_VERSION` for records we write
    version: u32,
    /// World seed the record belongs to
    seed: u64,
    /// Chunk X coordinate
    cx: i32,
    /// Chunk Y coordinate
    cy: i32,
    /// CRC-32 of the compressed payload bytes
    payload_crc: u32,
}

/// Encodes a delta into its wire format.
pub fn encode_delta(key: StoreKey, delta: &ChunkDelta) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(delta).map_err(|e| StoreError::Encode(e.to_string()))?;
    let compressed = lz4_flex::compress_prepend_size(&payload);

    let header = DeltaHeader {
        magic: DELTA_MAGIC,
        version: DELTA_VERSION,
        seed: key.seed.value(),
        cx: key.coord.x,
        cy: key.coord.y,
        payload_crc: crc32(&compressed),
    };
    let header_bytes =
        bincode::serialize(&header).map_err(|e| StoreError::Encode(e.to_string()))?;

    let mut out = Vec::with_capacity(4 + header_bytes.len() + compressed.len());
    out.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Decodes a delta record, validating framing, magic, version, key,
/// and checksum.
pub fn decode_delta(key: StoreKey, bytes: &[u8]) -> StoreResult<ChunkDelta> {
    if bytes.len() < 4 {
        return Err(StoreError::InsufficientData {
            needed: 4,
            available: bytes.len(),
        });
    }
    let header_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;

    let body_start = 4 + header_len;
    if bytes.len() < body_start {
        return Err(StoreError::InsufficientData {
            needed: body_start,
            available: bytes.len(),
        });
    }

    let header: DeltaHeader = bincode::deserialize(&bytes[4..body_start])
        .map_err(|e| StoreError::Decode(e.to_string()))?;

    if header.magic != DELTA_MAGIC {
        return Err(StoreError::BadMagic);
    }
    if header.version != DELTA_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: header.version,
            supported: DELTA_VERSION,
        });
    }

    let found_key = StoreKey::new(header.seed.into(), overland_common::ChunkCoord::new(header.cx, header.cy));
    if found_key != key {
        return Err(StoreError::KeyMismatch {
            expected: key.to_string(),
            found: found_key.to_string(),
        });
    }

    let compressed = &bytes[body_start..];
    let actual_crc = crc32(compressed);
    if actual_crc != header.payload_crc {
        return Err(StoreError::ChecksumMismatch {
            expected: header.payload_crc,
            actual: actual_crc,
        });
    }

    let payload = lz4_flex::decompress_size_prepended(compressed)
        .map_err(|e| StoreError::Decode(e.to_string()))?;
    bincode::deserialize(&payload).map_err(|e| StoreError::Decode(e.to_string()))
}

/// CRC-32 (reflected, polynomial `0xEDB8_8320`), computed bitwise.
///
/// Small enough inputs that a lookup table is not worth carrying.
#[must_use]
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in bytes {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}
