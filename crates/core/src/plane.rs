//! Trie planes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The database a trie node belongs to.
///
/// Only `State` and `Storage` are synchronized by the coordinator. `Details`
/// (contract details records) exists on the wire and is ignored by every
/// fast-sync store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriePlane {
    /// Accounts trie
    State,
    /// Per-contract storage trie
    Storage,
    /// Contract details records
    Details,
}

impl TriePlane {
    /// Wire code of this plane.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            TriePlane::State => 0,
            TriePlane::Storage => 1,
            TriePlane::Details => 2,
        }
    }

    /// Decodes a wire code. Unknown codes yield `None` and are dropped by callers.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(TriePlane::State),
            1 => Some(TriePlane::Storage),
            2 => Some(TriePlane::Details),
            _ => None,
        }
    }

    /// True for the two planes fast sync downloads.
    #[must_use]
    pub const fn is_synced(self) -> bool {
        matches!(self, TriePlane::State | TriePlane::Storage)
    }
}

impl fmt::Display for TriePlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriePlane::State => write!(f, "state"),
            TriePlane::Storage => write!(f, "storage"),
            TriePlane::Details => write!(f, "details"),
        }
    }
}
