//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use bytes::{BufMut, Bytes, BytesMut};
use fastsync_config::FastSyncConfig;
use fastsync_coordinator::{
    BlockStore, Collaborators, FastSyncManager, HeaderValidator, ReceiptOracle, SyncError,
    SyncMessage, SyncResult, Transport, TrieEngine,
};
use fastsync_core::{
    AccountState, Address, BlockRef, ContractInfo, PeerId, PeerInfo, TriePlane, H256,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Trie
// ============================================================================

/// Encodes a test trie node: an 8-byte label followed by child hashes.
pub fn encode_node(label: u64, children: &[H256]) -> Bytes {
    let mut buf = BytesMut::with_capacity(8 + 32 * children.len());
    buf.put_u64(label);
    for child in children {
        buf.put_slice(child.as_bytes());
    }
    buf.freeze()
}

fn decode_children(value: &[u8]) -> SyncResult<Vec<H256>> {
    if value.len() < 8 || (value.len() - 8) % 32 != 0 {
        return Err(SyncError::Collaborator(format!(
            "undecodable node of {} bytes",
            value.len()
        )));
    }
    value[8..]
        .chunks(32)
        .map(|chunk| H256::from_bytes(chunk).map_err(|e| SyncError::Collaborator(e.to_string())))
        .collect()
}

/// Trie engine keeping nodes per plane in memory.
#[derive(Default)]
pub struct MemoryTrie {
    state: RwLock<HashMap<H256, Bytes>>,
    storage: RwLock<HashMap<H256, Bytes>>,
    pub reject_imports: AtomicBool,
}

impl MemoryTrie {
    fn plane(&self, plane: TriePlane) -> SyncResult<&RwLock<HashMap<H256, Bytes>>> {
        match plane {
            TriePlane::State => Ok(&self.state),
            TriePlane::Storage => Ok(&self.storage),
            TriePlane::Details => Err(SyncError::Collaborator("no details trie".into())),
        }
    }

    /// Stores a node directly, as if persisted by an earlier run.
    pub fn preload(&self, plane: TriePlane, value: Bytes) -> H256 {
        let key = H256::keccak(&value);
        if let Ok(store) = self.plane(plane) {
            store.write().insert(key, value);
        }
        key
    }

    pub fn contains(&self, plane: TriePlane, key: &H256) -> bool {
        self.plane(plane)
            .map(|store| store.read().contains_key(key))
            .unwrap_or(false)
    }
}

impl TrieEngine for MemoryTrie {
    fn import_node(&self, key: &H256, value: &[u8], plane: TriePlane) -> SyncResult<Vec<H256>> {
        if self.reject_imports.load(Ordering::SeqCst) {
            return Err(SyncError::Collaborator("database closed".into()));
        }
        let children = decode_children(value)?;
        self.plane(plane)?
            .write()
            .insert(*key, Bytes::copy_from_slice(value));
        Ok(children)
    }

    fn traverse_from(&self, root: &H256, plane: TriePlane) -> SyncResult<HashSet<H256>> {
        let store = self.plane(plane)?.read();
        let mut missing = HashSet::new();
        let mut seen = HashSet::new();
        let mut pending = vec![*root];
        while let Some(key) = pending.pop() {
            if !seen.insert(key) {
                continue;
            }
            match store.get(&key) {
                Some(value) => pending.extend(decode_children(value)?),
                None => {
                    missing.insert(key);
                }
            }
        }
        Ok(missing)
    }
}

// ============================================================================
// Chain
// ============================================================================

pub fn block_hash(number: u64) -> H256 {
    H256::keccak(format!("block-{number}").as_bytes())
}

pub fn state_root(number: u64) -> H256 {
    H256::keccak(format!("state-{number}").as_bytes())
}

/// Block `number` linked to `number - 1`.
pub fn block(number: u64) -> BlockRef {
    let parent = if number == 0 {
        H256::zero()
    } else {
        block_hash(number - 1)
    };
    BlockRef::new(number, block_hash(number), parent, state_root(number))
}

/// Blocks `from` down to `to`, highest first.
pub fn descending(from: u64, to: u64) -> Vec<BlockRef> {
    (to..=from).rev().map(block).collect()
}

/// Block-store over an in-memory canonical chain.
#[derive(Default)]
pub struct MemoryChain {
    blocks: RwLock<BTreeMap<u64, BlockRef>>,
    contracts: RwLock<Vec<Address>>,
    infos: RwLock<HashMap<Address, ContractInfo>>,
    accounts: RwLock<HashMap<Address, AccountState>>,
    pub best: RwLock<Option<BlockRef>>,
    pub pruned: AtomicUsize,
    pub flushed: AtomicUsize,
    pub range_reads: Mutex<Vec<(u64, u64)>>,
    pub fail_ranges: AtomicBool,
}

impl MemoryChain {
    /// Chain holding blocks `0..=tip`.
    pub fn with_blocks(tip: u64) -> Self {
        let chain = Self::default();
        for number in 0..=tip {
            chain.insert(block(number));
        }
        chain
    }

    pub fn insert(&self, block: BlockRef) {
        self.blocks.write().insert(block.number, block);
    }

    pub fn remove(&self, number: u64) {
        self.blocks.write().remove(&number);
    }

    /// Replaces the state root of a stored block and returns the block.
    pub fn set_state_root(&self, number: u64, root: H256) -> BlockRef {
        let mut blocks = self.blocks.write();
        let stored = blocks.entry(number).or_insert_with(|| block(number));
        stored.state_root = root;
        stored.clone()
    }

    /// Indexes a contract, optionally with a world-state entry.
    pub fn add_contract(&self, info: ContractInfo, account: Option<AccountState>) {
        self.contracts.write().push(info.address);
        if let Some(account) = account {
            self.accounts.write().insert(info.address, account);
        }
        self.infos.write().insert(info.address, info);
    }

    /// Lists a contract without indexed information.
    pub fn add_unindexed_contract(&self, address: Address) {
        self.contracts.write().push(address);
    }

    pub fn contract(&self, address: &Address) -> Option<ContractInfo> {
        self.infos.read().get(address).cloned()
    }
}

impl BlockStore for MemoryChain {
    fn get_block_by_number(&self, number: u64) -> Option<BlockRef> {
        self.blocks.read().get(&number).cloned()
    }

    fn get_blocks_by_range(&self, first: u64, last: u64) -> SyncResult<Vec<BlockRef>> {
        self.range_reads.lock().push((first, last));
        if self.fail_ranges.load(Ordering::SeqCst) {
            return Err(SyncError::Collaborator("block store unavailable".into()));
        }
        let blocks = self.blocks.read();
        let found = if first <= last {
            blocks.range(first..=last).map(|(_, b)| b.clone()).collect()
        } else {
            blocks.range(last..=first).rev().map(|(_, b)| b.clone()).collect()
        };
        Ok(found)
    }

    fn find_missing_ancestor_height(&self, number: u64) -> u64 {
        let blocks = self.blocks.read();
        (1..=number)
            .rev()
            .find(|n| !blocks.contains_key(n))
            .unwrap_or(0)
    }

    fn set_best_block(&self, block: &BlockRef) {
        *self.best.write() = Some(block.clone());
    }

    fn prune_and_correct(&self) {
        self.pruned.fetch_add(1, Ordering::SeqCst);
    }

    fn flush(&self) {
        self.flushed.fetch_add(1, Ordering::SeqCst);
    }

    fn contracts_iter(&self) -> Box<dyn Iterator<Item = Address> + '_> {
        Box::new(self.contracts.read().clone().into_iter())
    }

    fn indexed_contract_information(&self, address: &Address) -> Option<ContractInfo> {
        self.contract(address)
    }

    fn account_state(&self, address: &Address) -> Option<AccountState> {
        self.accounts.read().get(address).cloned()
    }

    fn mark_contract_complete(&self, address: &Address) {
        if let Some(info) = self.infos.write().get_mut(address) {
            info.complete = true;
        }
    }
}

// ============================================================================
// Validator, receipts, transport
// ============================================================================

/// Accepts every header except the listed hashes.
#[derive(Default)]
pub struct FixedValidator {
    rejected: RwLock<HashSet<H256>>,
}

impl FixedValidator {
    pub fn reject(&self, hash: H256) {
        self.rejected.write().insert(hash);
    }
}

impl HeaderValidator for FixedValidator {
    fn validate(&self, block: &BlockRef) -> bool {
        !self.rejected.read().contains(&block.hash)
    }
}

#[derive(Default)]
pub struct StaticReceipts(pub AtomicBool);

impl StaticReceipts {
    pub fn set(&self, complete: bool) {
        self.0.store(complete, Ordering::SeqCst);
    }
}

impl ReceiptOracle for StaticReceipts {
    fn is_complete_receipt_data(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Transport handing out peers round-robin and recording traffic.
#[derive(Default)]
pub struct RecordingTransport {
    peers: RwLock<Vec<PeerInfo>>,
    next: AtomicUsize,
    pub sent: Mutex<Vec<(PeerId, SyncMessage)>>,
    pub disconnected: Mutex<Vec<PeerId>>,
    pub fail_sends: AtomicBool,
}

impl RecordingTransport {
    pub fn with_peers(count: u32) -> Self {
        let transport = Self::default();
        *transport.peers.write() = (1..=count)
            .map(|id| PeerInfo::new(PeerId(id), format!("peer-{id}"), 1_000))
            .collect();
        transport
    }

    pub fn sent(&self) -> Vec<(PeerId, SyncMessage)> {
        self.sent.lock().clone()
    }

    pub fn disconnected(&self) -> Vec<PeerId> {
        self.disconnected.lock().clone()
    }
}

impl Transport for RecordingTransport {
    fn random_peer(&self) -> Option<PeerInfo> {
        let peers = self.peers.read();
        if peers.is_empty() {
            return None;
        }
        let index = self.next.fetch_add(1, Ordering::SeqCst) % peers.len();
        Some(peers[index].clone())
    }

    fn send(&self, peer: PeerId, _display: &str, message: SyncMessage) -> SyncResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(SyncError::Collaborator("connection reset".into()));
        }
        self.sent.lock().push((peer, message));
        Ok(())
    }

    fn disconnect(&self, peer: PeerId, _display: &str) {
        self.disconnected.lock().push(peer);
    }
}

// ============================================================================
// Harness
// ============================================================================

/// One set of collaborators and helpers to build coordinators over them.
pub struct Harness {
    pub chain: Arc<MemoryChain>,
    pub trie: Arc<MemoryTrie>,
    pub validator: Arc<FixedValidator>,
    pub receipts: Arc<StaticReceipts>,
    pub transport: Arc<RecordingTransport>,
}

impl Harness {
    /// Chain of `tip + 1` blocks and two peers.
    pub fn new(tip: u64) -> Self {
        Self {
            chain: Arc::new(MemoryChain::with_blocks(tip)),
            trie: Arc::new(MemoryTrie::default()),
            validator: Arc::new(FixedValidator::default()),
            receipts: Arc::new(StaticReceipts::default()),
            transport: Arc::new(RecordingTransport::with_peers(2)),
        }
    }

    pub fn with_transport(mut self, transport: RecordingTransport) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            chain: self.chain.clone(),
            trie: self.trie.clone(),
            validator: self.validator.clone(),
            receipts: self.receipts.clone(),
            transport: self.transport.clone(),
        }
    }

    pub fn manager(&self) -> FastSyncManager {
        self.manager_with(FastSyncConfig::default())
    }

    pub fn manager_with(&self, config: FastSyncConfig) -> FastSyncManager {
        FastSyncManager::new(config, self.collaborators())
    }
}

pub fn address(n: u8) -> Address {
    Address::from([n; 32])
}

pub fn contract(n: u8, inception_block: u64, storage_root: H256) -> ContractInfo {
    ContractInfo {
        address: address(n),
        inception_block,
        complete: false,
        storage_root,
    }
}
