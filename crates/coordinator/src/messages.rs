//! Fast-sync wire messages.
//!
//! Planes travel as raw `u8` codes. Callers resolve them with
//! [`TriePlane::from_code`] and drop entries whose code is unknown.

use crate::error::SyncResult;
use bytes::Bytes;
use fastsync_config::{BLOCKS_REQUEST_MAXIMUM_BATCH_SIZE, TRIE_DATA_REQUEST_MAXIMUM_BATCH_SIZE};
use fastsync_core::{BlockRef, TriePlane, H256};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Binary encoding shared by every fast-sync message.
pub trait WireMessage: Serialize + DeserializeOwned + Sized {
    /// Encodes the message.
    fn encode(&self) -> SyncResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decodes a message.
    fn decode(bytes: &[u8]) -> SyncResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Request for a trie node and up to `batch_size_limit` of its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTrieData {
    /// Key of the requested node
    pub key: H256,
    /// Plane code
    pub plane: u8,
    /// Maximum number of nodes in the response
    pub batch_size_limit: u32,
}

impl RequestTrieData {
    /// Creates a request, clamping the batch size to the protocol maximum.
    pub fn new(key: H256, plane: TriePlane, batch_size_limit: u32) -> Self {
        Self {
            key,
            plane: plane.code(),
            batch_size_limit: batch_size_limit.min(TRIE_DATA_REQUEST_MAXIMUM_BATCH_SIZE),
        }
    }

    /// Decoded plane, `None` for unknown codes.
    pub fn plane(&self) -> Option<TriePlane> {
        TriePlane::from_code(self.plane)
    }
}

impl WireMessage for RequestTrieData {}

/// Trie nodes sent in answer to a [`RequestTrieData`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseTrieData {
    /// Key that was requested
    pub key: H256,
    /// Plane code
    pub plane: u8,
    /// `(key, value)` pairs with `key == keccak(value)`
    pub entries: Vec<(H256, Bytes)>,
}

impl ResponseTrieData {
    /// Creates a response for a known plane.
    pub fn new(key: H256, plane: TriePlane, entries: Vec<(H256, Bytes)>) -> Self {
        Self {
            key,
            plane: plane.code(),
            entries,
        }
    }

    /// Decoded plane, `None` for unknown codes.
    pub fn plane(&self) -> Option<TriePlane> {
        TriePlane::from_code(self.plane)
    }
}

impl WireMessage for ResponseTrieData {}

/// Request for a contiguous range of blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBlocks {
    /// First block of the range
    pub from_block: u64,
    /// Number of blocks
    pub count: u32,
    /// Walk towards genesis when set
    pub descending: bool,
}

impl RequestBlocks {
    /// Creates a request, clamping the count to the protocol maximum.
    pub fn new(from_block: u64, count: u32, descending: bool) -> Self {
        Self {
            from_block,
            count: count.min(BLOCKS_REQUEST_MAXIMUM_BATCH_SIZE),
            descending,
        }
    }

    /// Inclusive `(first, last)` heights covered by the request, in request order.
    ///
    /// Descending ranges stop at genesis. Returns `None` for an empty request.
    pub fn range(&self) -> Option<(u64, u64)> {
        if self.count == 0 {
            return None;
        }
        let span = u64::from(self.count) - 1;
        if self.descending {
            Some((self.from_block, self.from_block.saturating_sub(span)))
        } else {
            Some((self.from_block, self.from_block.saturating_add(span)))
        }
    }

    /// Order label used in logs.
    pub fn order(&self) -> &'static str {
        if self.descending {
            "DESC"
        } else {
            "ASC"
        }
    }
}

impl WireMessage for RequestBlocks {}

/// Blocks sent in answer to a [`RequestBlocks`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBlocks {
    /// Blocks in the order of the request
    pub blocks: Vec<BlockRef>,
}

impl WireMessage for ResponseBlocks {}

/// Envelope handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMessage {
    /// Outbound trie request
    RequestTrieData(RequestTrieData),
    /// Trie response
    ResponseTrieData(ResponseTrieData),
    /// Outbound block request
    RequestBlocks(RequestBlocks),
    /// Block response
    ResponseBlocks(ResponseBlocks),
}

impl WireMessage for SyncMessage {}
