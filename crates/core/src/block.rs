//! Blocks as exchanged during fast sync.

use crate::{PeerId, H256};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A block with the header fields fast sync inspects and its raw encodings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    /// Block height
    pub number: u64,
    /// Block hash
    pub hash: H256,
    /// Hash of the parent block
    pub parent_hash: H256,
    /// Root of the world-state trie after this block
    pub state_root: H256,
    /// Encoded header
    pub header: Bytes,
    /// Encoded body
    pub body: Bytes,
}

impl BlockRef {
    /// Creates a block with empty header and body encodings.
    pub fn new(number: u64, hash: H256, parent_hash: H256, state_root: H256) -> Self {
        Self {
            number,
            hash,
            parent_hash,
            state_root,
            header: Bytes::new(),
            body: Bytes::new(),
        }
    }

    /// True if `child` is the direct successor of this block.
    pub fn is_parent_of(&self, child: &BlockRef) -> bool {
        child.parent_hash == self.hash && self.number.checked_add(1) == Some(child.number)
    }
}

/// Validated blocks from one peer, in descending height order with contiguous
/// parent linkage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockBatch {
    /// Peer that delivered the batch
    pub peer_id: PeerId,
    /// Short display name of that peer
    pub peer_display: String,
    /// Blocks, highest first
    pub blocks: Vec<BlockRef>,
}

impl BlockBatch {
    /// Creates a new batch.
    pub fn new(peer_id: PeerId, peer_display: impl Into<String>, blocks: Vec<BlockRef>) -> Self {
        Self {
            peer_id,
            peer_display: peer_display.into(),
            blocks,
        }
    }

    /// Hash of the first (highest) block, the key the batch is buffered under.
    pub fn key(&self) -> Option<H256> {
        self.blocks.first().map(|b| b.hash)
    }

    /// Number of blocks in the batch.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True if the batch holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
