//! Coordinator error types

use fastsync_core::{PeerId, TriePlane, H256};
use thiserror::Error;

/// Fast-sync errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Response could not be decoded or carried no content
    #[error("Malformed response from peer {peer}: {reason}")]
    MalformedResponse { peer: PeerId, reason: String },

    /// Peer sent data that breaks the protocol (bad PoW, broken parentage)
    #[error("Protocol violation by peer {peer}: {reason}")]
    ProtocolViolation { peer: PeerId, reason: String },

    /// Trie node whose bytes do not hash to the requested key
    #[error("Hash mismatch: expected {key}, got {actual}")]
    HashMismatch { key: H256, actual: H256 },

    /// A different value is already stored for the key
    #[error("Conflicting {plane} value for {key}")]
    ConflictingValue { key: H256, plane: TriePlane },

    /// Internal inconsistency with no recovery path; fast sync is disabled
    #[error("Unrecoverable fast sync error: {0}")]
    Unrecoverable(String),

    /// External collaborator reported a failure
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Wire encoding or decoding failed
    #[error("Codec error: {0}")]
    Codec(String),

    /// Worker runtime could not be started
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl SyncError {
    /// True for errors that disable the coordinator.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Unrecoverable(_))
    }

    /// True for errors caused by data a peer sent.
    pub fn is_peer_attributable(&self) -> bool {
        matches!(
            self,
            SyncError::MalformedResponse { .. }
                | SyncError::ProtocolViolation { .. }
                | SyncError::HashMismatch { .. }
        )
    }
}

impl From<bincode::Error> for SyncError {
    fn from(err: bincode::Error) -> Self {
        SyncError::Codec(err.to_string())
    }
}

/// Result type for coordinator operations
pub type SyncResult<T> = Result<T, SyncError>;
