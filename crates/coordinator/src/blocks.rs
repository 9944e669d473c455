//! Buffer of validated block batches awaiting the block importer.

use fastsync_core::{BlockBatch, H256};
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;

struct Buffers {
    /// Batch key (first hash) to batch
    received_blocks: HashMap<H256, BlockBatch>,
    /// Every buffered hash to the key of its batch
    received_hashes: LruCache<H256, H256>,
    /// Hashes already committed to the canonical chain
    imported_hashes: LruCache<H256, ()>,
}

/// Validated batches plus the hash indexes used to filter new deliveries.
///
/// The three maps share one lock.
pub struct BlockBuffer {
    inner: Mutex<Buffers>,
}

fn capacity(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).unwrap_or(NonZeroUsize::MIN)
}

impl BlockBuffer {
    /// Creates an empty buffer with the given LRU capacities.
    pub fn new(imported_capacity: usize, received_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Buffers {
                received_blocks: HashMap::new(),
                received_hashes: LruCache::new(capacity(received_capacity)),
                imported_hashes: LruCache::new(capacity(imported_capacity)),
            }),
        }
    }

    /// Records a block hash as committed to the chain.
    pub fn add_imported(&self, hash: H256) {
        self.inner.lock().imported_hashes.put(hash, ());
    }

    /// True if `hash` was recorded as imported and not evicted since.
    pub fn is_imported(&self, hash: &H256) -> bool {
        self.inner.lock().imported_hashes.contains(hash)
    }

    /// True if `hash` is imported or sits in a buffered batch.
    pub fn is_known(&self, hash: &H256) -> bool {
        let inner = self.inner.lock();
        inner.imported_hashes.contains(hash) || inner.received_hashes.contains(hash)
    }

    /// Drops received hashes that have since been imported.
    ///
    /// Returns the number of entries removed.
    pub fn compact(&self) -> usize {
        let mut inner = self.inner.lock();
        let Buffers {
            received_hashes,
            imported_hashes,
            ..
        } = &mut *inner;
        let stale: Vec<H256> = received_hashes
            .iter()
            .filter(|(hash, _)| imported_hashes.contains(*hash))
            .map(|(hash, _)| *hash)
            .collect();
        for hash in &stale {
            received_hashes.pop(hash);
        }
        stale.len()
    }

    /// Buffers a validated batch under the hash of its first block.
    ///
    /// A batch already stored under the same key is replaced. Returns the key,
    /// or `None` for an empty batch.
    pub fn offer_batch(&self, batch: BlockBatch) -> Option<H256> {
        let key = batch.key()?;
        let mut inner = self.inner.lock();
        for block in &batch.blocks {
            inner.received_hashes.put(block.hash, key);
        }
        inner.received_blocks.insert(key, batch);
        Some(key)
    }

    /// Removes and returns the batch holding `required_hash`.
    ///
    /// A batch keyed by `required_hash` is returned as stored. A batch found
    /// through the hash index loses its already-imported blocks first and is
    /// dropped if none remain.
    pub fn take(&self, required_hash: &H256) -> Option<BlockBatch> {
        let mut inner = self.inner.lock();
        if let Some(batch) = inner.received_blocks.remove(required_hash) {
            return Some(batch);
        }

        let key = *inner.received_hashes.peek(required_hash)?;
        let mut batch = inner.received_blocks.remove(&key)?;
        batch
            .blocks
            .retain(|block| !inner.imported_hashes.contains(&block.hash));
        (!batch.is_empty()).then_some(batch)
    }

    /// Key of the batch indexing `hash`, if any.
    pub fn batch_key_of(&self, hash: &H256) -> Option<H256> {
        self.inner.lock().received_hashes.peek(hash).copied()
    }

    /// Number of buffered batches.
    pub fn batch_count(&self) -> usize {
        self.inner.lock().received_blocks.len()
    }

    /// Number of indexed received hashes.
    pub fn received_hash_count(&self) -> usize {
        self.inner.lock().received_hashes.len()
    }

    /// Number of remembered imported hashes.
    pub fn imported_hash_count(&self) -> usize {
        self.inner.lock().imported_hashes.len()
    }
}

impl std::fmt::Debug for BlockBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("BlockBuffer")
            .field("batches", &inner.received_blocks.len())
            .field("received_hashes", &inner.received_hashes.len())
            .field("imported_hashes", &inner.imported_hashes.len())
            .finish()
    }
}
