use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Storage address of an object record inside a container.
///
/// Addresses are allocated by the storage backend and play the role of the
/// object-header address in an HDF5 file: hard links point at addresses, and
/// the identity registry maps identifiers onto them. An address is stable for
/// the lifetime of the record but carries no meaning across containers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(u64);

impl Address {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }

    /// The address that follows this one in allocation order.
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| TypeError::InvalidAddress(format!("{s}: {e}")))
    }
}
