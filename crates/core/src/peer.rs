//! Peer identity as seen by the transport.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric peer identifier assigned by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId(pub u32);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connected peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    /// Identifier used for sends
    pub id: PeerId,
    /// Short display form used in logs
    pub display: String,
    /// Best block number the peer has announced
    pub best_block_number: u64,
}

impl PeerInfo {
    /// Creates a new peer record.
    pub fn new(id: PeerId, display: impl Into<String>, best_block_number: u64) -> Self {
        Self {
            id,
            display: display.into(),
            best_block_number,
        }
    }
}
