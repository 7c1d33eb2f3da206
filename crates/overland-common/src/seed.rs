//! World seed and per-channel sub-seed derivation.

use serde::{Deserialize, Serialize};

/// Root seed of a world. All deterministic content derives from this
/// value through [`WorldSeed::channel`] sub-seeds.
///
/// Passed explicitly into generators and stores so multiple independent
/// worlds can coexist in one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a world seed from a raw value.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives a decorrelated sub-seed for channel `n`.
    ///
    /// Mixes the channel number in with a splitmix64-style avalanche so
    /// adjacent channel numbers (1, 2, 3) produce unrelated bit patterns
    /// rather than nearly-identical noise fields.
    #[must_use]
    pub const fn channel(self, n: u64) -> u64 {
        let mut h = self.0 ^ n.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        h = (h ^ (h >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        h = (h ^ (h >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        h ^ (h >> 31)
    }
}

impl From<u64> for WorldSeed {
    fn from(seed: u64) -> Self {
        Self::new(seed)
    }
}

impl std::fmt::Display for WorldSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_channel_deterministic() {
        let seed = WorldSeed::new(12345);
        assert_eq!(seed.channel(1), seed.channel(1));
        assert_eq!(seed.channel(7), WorldSeed::new(12345).channel(7));
    }

    #[test]
    fn test_channels_decorrelate() {
        let seed = WorldSeed::new(12345);
        let a = seed.channel(1);
        let b = seed.channel(2);
        let c = seed.channel(3);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
        // Adjacent channels should differ in many bits, not just the low ones.
        assert!((a ^ b).count_ones() > 16);
    }

    proptest! {
        #[test]
        fn prop_distinct_seeds_diverge(seed in any::<u64>(), n in 0u64..64) {
            let a = WorldSeed::new(seed).channel(n);
            let b = WorldSeed::new(seed.wrapping_add(1)).channel(n);
            prop_assert_ne!(a, b);
        }
    }
}
