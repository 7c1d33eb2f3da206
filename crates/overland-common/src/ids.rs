//! ID types shared across the world subsystem.

use serde::{Deserialize, Serialize};

/// Unique identifier for a placeable structure type.
///
/// The building layer owns the meaning of each value; the world subsystem
/// only records and round-trips it through persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructureId(u16);

impl StructureId {
    /// Creates a structure ID from a raw value.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for StructureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "structure#{}", self.0)
    }
}
