//! Fast sync coordinator façade
//!
//! Owns every piece of coordinator state. The request generator, response
//! ingestor, completeness evaluator and pivot controller are `impl` blocks on
//! [`FastSyncManager`] spread across their own modules.

use crate::blocks::BlockBuffer;
use crate::imported::ImportedNodes;
use crate::pivot::PivotController;
use crate::queue::MissingKeys;
use crate::traits::{BlockStore, Collaborators, Transport, TrieEngine};
use bytes::Bytes;
use fastsync_config::FastSyncConfig;
use fastsync_core::{BlockRef, TriePlane, H256};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Point-in-time view of coordinator state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Whether the coordinator is enabled
    pub enabled: bool,
    /// Keys queued in the state plane
    pub missing_state: usize,
    /// Keys queued in the storage plane
    pub missing_storage: usize,
    /// Imported state nodes
    pub imported_state: usize,
    /// Imported storage nodes
    pub imported_storage: usize,
    /// Buffered block batches
    pub buffered_batches: usize,
    /// Indexed received block hashes
    pub received_hashes: usize,
    /// Remembered imported block hashes
    pub imported_hashes: usize,
    /// Current pivot height
    pub pivot_number: Option<u64>,
    /// Block latch
    pub complete_blocks: bool,
    /// Global latch
    pub complete: bool,
}

/// Fast sync coordinator
pub struct FastSyncManager {
    pub(crate) config: FastSyncConfig,
    enabled: AtomicBool,
    pub(crate) complete: AtomicBool,
    pub(crate) complete_blocks: AtomicBool,
    pub(crate) missing_state: MissingKeys,
    pub(crate) missing_storage: MissingKeys,
    pub(crate) imported: ImportedNodes,
    pub(crate) blocks: BlockBuffer,
    pub(crate) pivot: PivotController,
    pub(crate) collaborators: Collaborators,
}

impl FastSyncManager {
    /// Creates a coordinator wired to its collaborators
    pub fn new(config: FastSyncConfig, collaborators: Collaborators) -> Self {
        let queue_limit = config.queue_limit();
        Self {
            enabled: AtomicBool::new(config.enabled),
            complete: AtomicBool::new(false),
            complete_blocks: AtomicBool::new(false),
            missing_state: MissingKeys::new(queue_limit),
            missing_storage: MissingKeys::new(queue_limit),
            imported: ImportedNodes::new(),
            blocks: BlockBuffer::new(
                config.imported_hashes_capacity,
                config.received_hashes_capacity,
            ),
            pivot: PivotController::new(),
            collaborators,
            config,
        }
    }

    /// Starts a builder for customised coordinators
    pub fn builder() -> FastSyncManagerBuilder {
        FastSyncManagerBuilder::default()
    }

    /// True while fast sync is active
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Turns the coordinator into a pass-through. Irreversible.
    pub fn disable(&self) {
        if self.enabled.swap(false, Ordering::AcqRel) {
            info!(target: "fastsync::pivot", "fast sync disabled");
        }
    }

    /// True once fast sync has nothing left to do
    pub fn is_complete(&self) -> bool {
        !self.is_enabled() || self.complete.load(Ordering::Acquire)
    }

    /// True once blocks back to genesis are present and linked
    pub fn is_complete_blocks(&self) -> bool {
        self.complete_blocks.load(Ordering::Acquire)
    }

    /// Records a block committed by the block importer
    pub fn add_imported_block(&self, hash: H256) {
        if self.is_enabled() {
            self.blocks.add_imported(hash);
        }
    }

    /// Records a trie node persisted outside the response path
    pub fn add_imported_node(&self, key: H256, value: Bytes, plane: TriePlane) {
        if self.is_enabled() {
            self.imported.put(key, value, plane);
        }
    }

    /// True iff `key` was imported with exactly `value`. Always false when disabled.
    pub fn contains_exact(&self, key: &H256, value: &[u8], plane: TriePlane) -> bool {
        self.is_enabled() && self.imported.contains_exact(key, value, plane)
    }

    /// Missing-key queue of a plane
    pub fn missing(&self, plane: TriePlane) -> Option<&MissingKeys> {
        match plane {
            TriePlane::State => Some(&self.missing_state),
            TriePlane::Storage => Some(&self.missing_storage),
            TriePlane::Details => None,
        }
    }

    /// Imported trie nodes
    pub fn imported(&self) -> &ImportedNodes {
        &self.imported
    }

    /// Buffered block batches
    pub fn block_buffer(&self) -> &BlockBuffer {
        &self.blocks
    }

    /// Active configuration
    pub fn config(&self) -> &FastSyncConfig {
        &self.config
    }

    pub(crate) fn chain(&self) -> &dyn BlockStore {
        self.collaborators.chain.as_ref()
    }

    pub(crate) fn trie(&self) -> &dyn TrieEngine {
        self.collaborators.trie.as_ref()
    }

    /// Transport used for outbound requests
    pub fn transport(&self) -> &dyn Transport {
        self.collaborators.transport.as_ref()
    }

    /// Snapshot of the coordinator state
    pub fn stats(&self) -> SyncStats {
        SyncStats {
            enabled: self.is_enabled(),
            missing_state: self.missing_state.len(),
            missing_storage: self.missing_storage.len(),
            imported_state: self.imported.len(TriePlane::State),
            imported_storage: self.imported.len(TriePlane::Storage),
            buffered_batches: self.blocks.batch_count(),
            received_hashes: self.blocks.received_hash_count(),
            imported_hashes: self.blocks.imported_hash_count(),
            pivot_number: self.pivot_number(),
            complete_blocks: self.is_complete_blocks(),
            complete: self.complete.load(Ordering::Acquire),
        }
    }
}

impl std::fmt::Debug for FastSyncManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastSyncManager")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Builder for coordinators with preset state
#[derive(Debug, Default)]
pub struct FastSyncManagerBuilder {
    config: Option<FastSyncConfig>,
    pivot: Option<BlockRef>,
    pivot_number: Option<u64>,
    required_storage: Vec<H256>,
    disabled: bool,
}

impl FastSyncManagerBuilder {
    /// Uses `config` instead of the defaults
    pub fn with_config(mut self, config: FastSyncConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the pivot block
    pub fn with_pivot(mut self, block: BlockRef) -> Self {
        self.pivot = Some(block);
        self
    }

    /// Sets the pivot height without a pivot block
    pub fn with_pivot_number(mut self, number: u64) -> Self {
        self.pivot_number = Some(number);
        self
    }

    /// Seeds the storage queue
    pub fn with_required_storage<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = H256>,
    {
        self.required_storage.extend(keys);
        self
    }

    /// Builds a disabled coordinator
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Builds the coordinator
    pub fn build(self, collaborators: Collaborators) -> FastSyncManager {
        let mut config = self.config.unwrap_or_default();
        if self.disabled {
            config.enabled = false;
        }
        let manager = FastSyncManager::new(config, collaborators);

        if let Some(block) = self.pivot {
            manager.pivot.set(block);
        }
        // an explicit height wins over the block's own
        if let Some(number) = self.pivot_number {
            manager.pivot.set_number(number);
        }
        let seeded = manager.missing_storage.offer_all(self.required_storage);
        if seeded > 0 {
            debug!(target: "fastsync::requests", seeded, "storage queue seeded");
        }
        manager
    }
}
