//! Outbound request generation.

use crate::error::SyncResult;
use crate::manager::FastSyncManager;
use crate::messages::{RequestBlocks, RequestTrieData, SyncMessage};
use fastsync_core::{BlockBatch, TriePlane, H256};
use tracing::{debug, trace, warn};

impl FastSyncManager {
    fn poll_request(&self, plane: TriePlane) -> Option<RequestTrieData> {
        let key = self.missing(plane)?.poll()?;
        Some(RequestTrieData::new(key, plane, self.config.trie_batch_max))
    }

    /// Next trie-data request to send, or `None` when nothing is missing.
    ///
    /// Queued state keys go first, then storage keys. With both queues empty
    /// the world state and then the contract storage are re-traversed to find
    /// more keys, and finally global completeness is evaluated.
    ///
    /// # Errors
    ///
    /// Surfaces unrecoverable inconsistencies found while scanning contracts;
    /// fast sync is disabled by then.
    pub fn create_next_trie_request(&self) -> SyncResult<Option<RequestTrieData>> {
        if self.is_complete() {
            return Ok(None);
        }

        if let Some(request) = self
            .poll_request(TriePlane::State)
            .or_else(|| self.poll_request(TriePlane::Storage))
        {
            trace!(target: "fastsync::requests", key = %request.key, plane = request.plane, "queued key");
            return Ok(Some(request));
        }

        if !self.is_complete_world_state()? {
            if let Some(request) = self.poll_request(TriePlane::State) {
                return Ok(Some(request));
            }
        }

        if !self.is_complete_contract_data()? {
            if let Some(request) = self.poll_request(TriePlane::Storage) {
                return Ok(Some(request));
            }
        }

        self.check_completeness()?;
        Ok(None)
    }

    /// Puts the key of an unsent request back into its queue.
    pub fn requeue(&self, request: &RequestTrieData) -> bool {
        request
            .plane()
            .and_then(|plane| self.missing(plane))
            .is_some_and(|queue| queue.offer(request.key))
    }

    /// Takes the buffered batch holding `required_hash`.
    ///
    /// On a miss, blocks around `required_level` are requested from the
    /// network and `None` is returned.
    pub fn take_filtered_blocks(&self, required_hash: &H256, required_level: u64) -> Option<BlockBatch> {
        if !self.is_enabled() {
            return None;
        }
        if let Some(batch) = self.blocks.take(required_hash) {
            return Some(batch);
        }
        self.make_block_requests(required_level);
        None
    }

    /// Requests a batch of blocks descending from `required_level`, plus the
    /// batch below it when there is one.
    ///
    /// Each request goes to an independently chosen peer. Returns the number
    /// of requests sent.
    pub fn make_block_requests(&self, required_level: u64) -> usize {
        if !self.is_enabled() {
            return 0;
        }
        let count = self.config.blocks_batch_max;
        let mut levels = vec![required_level];
        if required_level > u64::from(count) {
            levels.push(required_level - u64::from(count));
        }

        let transport = self.transport();
        let mut sent = 0;
        for from_block in levels {
            let Some(peer) = transport.random_peer() else {
                debug!(target: "fastsync::requests", from_block, "no peer for block request");
                continue;
            };
            let request = RequestBlocks::new(from_block, count, true);
            match transport.send(peer.id, &peer.display, SyncMessage::RequestBlocks(request)) {
                Ok(()) => {
                    debug!(
                        target: "fastsync::requests",
                        peer = %peer.display,
                        from_block,
                        count,
                        "requested blocks"
                    );
                    sent += 1;
                }
                Err(err) => {
                    warn!(target: "fastsync::requests", peer = %peer.display, error = %err, "block request failed");
                }
            }
        }
        sent
    }
}
