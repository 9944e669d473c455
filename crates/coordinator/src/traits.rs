//! Collaborator interfaces consumed by the coordinator.
//!
//! The coordinator only holds these handles; none of the collaborators keep a
//! reference back into it. Wiring happens once at startup through
//! [`Collaborators`].

use crate::error::SyncResult;
use crate::messages::SyncMessage;
use fastsync_core::{AccountState, Address, BlockRef, ContractInfo, PeerId, PeerInfo, TriePlane, H256};
use std::collections::HashSet;
use std::sync::Arc;

/// Block-store and chain metadata.
pub trait BlockStore: Send + Sync {
    /// Canonical block at `number`.
    fn get_block_by_number(&self, number: u64) -> Option<BlockRef>;

    /// Blocks from `first` to `last` inclusive, in that direction.
    fn get_blocks_by_range(&self, first: u64, last: u64) -> SyncResult<Vec<BlockRef>>;

    /// Highest height in `1..=number` with no stored block, 0 when the chain is complete.
    fn find_missing_ancestor_height(&self, number: u64) -> u64;

    /// Makes `block` the chain head.
    fn set_best_block(&self, block: &BlockRef);

    /// Walks the chain correcting total difficulty and dropping side branches.
    fn prune_and_correct(&self);

    /// Persists pending writes.
    fn flush(&self);

    /// Addresses of every indexed contract.
    fn contracts_iter(&self) -> Box<dyn Iterator<Item = Address> + '_>;

    /// Indexed information for a contract.
    fn indexed_contract_information(&self, address: &Address) -> Option<ContractInfo>;

    /// World-state entry for an account.
    fn account_state(&self, address: &Address) -> Option<AccountState>;

    /// Finalizes the details record of a contract whose storage is complete.
    fn mark_contract_complete(&self, address: &Address);
}

/// Trie engine over the state and storage databases.
pub trait TrieEngine: Send + Sync {
    /// Persists a node and returns the keys of the nodes it references.
    fn import_node(&self, key: &H256, value: &[u8], plane: TriePlane) -> SyncResult<Vec<H256>>;

    /// Keys reachable from `root` whose bytes are not stored yet.
    ///
    /// Traversal stops at missing nodes, so an unstored `root` yields `{root}`.
    fn traverse_from(&self, root: &H256, plane: TriePlane) -> SyncResult<HashSet<H256>>;
}

/// Proof-of-work header validation.
pub trait HeaderValidator: Send + Sync {
    /// True if the header of `block` carries valid proof of work.
    fn validate(&self, block: &BlockRef) -> bool;
}

/// Receipt subsystem.
pub trait ReceiptOracle: Send + Sync {
    /// True once every receipt up to the pivot is processed.
    fn is_complete_receipt_data(&self) -> bool;
}

/// Peer-to-peer transport.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// A randomly chosen connected peer.
    fn random_peer(&self) -> Option<PeerInfo>;

    /// Sends a message to a peer.
    fn send(&self, peer: PeerId, peer_display: &str, message: SyncMessage) -> SyncResult<()>;

    /// Drops the connection to a peer.
    fn disconnect(&self, peer: PeerId, peer_display: &str);
}

/// Everything the coordinator needs from the rest of the node.
#[derive(Clone)]
pub struct Collaborators {
    /// Block-store
    pub chain: Arc<dyn BlockStore>,
    /// Trie engine
    pub trie: Arc<dyn TrieEngine>,
    /// Header validator
    pub validator: Arc<dyn HeaderValidator>,
    /// Receipt subsystem
    pub receipts: Arc<dyn ReceiptOracle>,
    /// Transport
    pub transport: Arc<dyn Transport>,
}
