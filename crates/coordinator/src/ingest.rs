//! Inbound block and trie-node responses.

use crate::error::{SyncError, SyncResult};
use crate::imported::ImportOutcome;
use crate::manager::FastSyncManager;
use crate::messages::ResponseTrieData;
use bytes::Bytes;
use fastsync_core::{BlockBatch, BlockRef, PeerId, TriePlane, H256};
use std::collections::HashSet;
use tracing::{debug, trace, warn};

impl FastSyncManager {
    /// Validates a block response and buffers its new blocks as one batch.
    ///
    /// Blocks must arrive highest first with contiguous parent linkage. Blocks
    /// already imported or buffered are skipped but still anchor the linkage
    /// check. One invalid header or broken link discards the whole response.
    /// Returns the number of blocks buffered.
    pub fn validate_and_add_blocks(&self, peer: PeerId, peer_display: &str, blocks: Vec<BlockRef>) -> usize {
        if !self.is_enabled() {
            return 0;
        }
        self.blocks.compact();

        let validator = self.collaborators.validator.as_ref();
        let mut filtered = Vec::with_capacity(blocks.len());
        let mut prev: Option<&BlockRef> = None;
        let mut rejection = None;

        for block in &blocks {
            if self.blocks.is_known(&block.hash) {
                prev = Some(block);
                continue;
            }
            if !validator.validate(block) {
                debug!(
                    target: "fastsync::blocks",
                    peer = %peer_display,
                    number = block.number,
                    hash = %block.hash,
                    "invalid header"
                );
                trace!(target: "fastsync::blocks", header = %hex_preview(&block.header), "invalid header bytes");
                rejection = Some(SyncError::ProtocolViolation {
                    peer,
                    reason: format!("invalid header for block {}", block.number),
                });
                break;
            }
            if let Some(previous) = prev {
                if !block.is_parent_of(previous) {
                    debug!(
                        target: "fastsync::blocks",
                        peer = %peer_display,
                        number = block.number,
                        expected = previous.number.saturating_sub(1),
                        parent_hash = %previous.parent_hash,
                        hash = %block.hash,
                        "inconsistent block headers"
                    );
                    rejection = Some(SyncError::ProtocolViolation {
                        peer,
                        reason: format!("block {} does not link to block {}", block.number, previous.number),
                    });
                    break;
                }
            }
            filtered.push(block.clone());
            prev = Some(block);
        }

        if let Some(rejection) = rejection {
            self.report_peer(peer, peer_display, &rejection);
            return 0;
        }

        let accepted = filtered.len();
        if let Some(key) = self.blocks.offer_batch(BlockBatch::new(peer, peer_display, filtered)) {
            debug!(
                target: "fastsync::blocks",
                peer = %peer_display,
                key = %key.short(),
                accepted,
                "buffered block batch"
            );
        }
        accepted
    }

    /// Imports the nodes of a trie-data response.
    ///
    /// Entries whose bytes do not hash to their key, or that conflict with an
    /// already imported value, are routed to [`handle_failed_import`]. New
    /// nodes are handed to the trie engine and their unknown children are
    /// queued. Responses for unknown or untracked planes and responses
    /// without entries are dropped. Returns the number of nodes imported.
    ///
    /// [`handle_failed_import`]: FastSyncManager::handle_failed_import
    pub fn add_trie_response(&self, peer: PeerId, peer_display: &str, response: ResponseTrieData) -> SyncResult<usize> {
        if !self.is_enabled() {
            return Ok(0);
        }
        let plane = match response.plane() {
            Some(plane) if plane.is_synced() => plane,
            _ => {
                trace!(target: "fastsync::trie", plane = response.plane, "dropping response for untracked plane");
                return Ok(0);
            }
        };
        if response.entries.is_empty() {
            let err = SyncError::MalformedResponse {
                peer,
                reason: format!("no entries for {}", response.key),
            };
            debug!(target: "fastsync::trie", peer = %peer_display, %plane, error = %err, "ignoring trie response");
            return Ok(0);
        }

        let mut imported = 0;
        let mut refs = HashSet::new();
        for (key, value) in response.entries {
            match self.import_entry(key, value.clone(), plane) {
                Ok(Some(children)) => {
                    imported += 1;
                    refs.extend(children);
                }
                Ok(None) => {}
                Err(err) => {
                    debug!(target: "fastsync::trie", peer = %peer_display, %plane, error = %err, "rejected trie node");
                    self.handle_failed_import(key, &value, plane, peer, peer_display);
                }
            }
        }

        if !refs.is_empty() {
            self.imported.retain_unknown(&mut refs, plane);
            self.update_requests(refs, plane)?;
        }
        Ok(imported)
    }

    /// Admits one node. `Ok(None)` means it was already imported.
    fn import_entry(&self, key: H256, value: Bytes, plane: TriePlane) -> SyncResult<Option<Vec<H256>>> {
        let actual = H256::keccak(&value);
        if actual != key {
            return Err(SyncError::HashMismatch { key, actual });
        }
        match self.imported.insert_if_absent(key, value.clone(), plane) {
            ImportOutcome::Inserted => {}
            ImportOutcome::Duplicate | ImportOutcome::Ignored => return Ok(None),
            ImportOutcome::Conflict(_) => return Err(SyncError::ConflictingValue { key, plane }),
        }
        match self.trie().import_node(&key, &value, plane) {
            Ok(children) => {
                // delivered alongside another request while still queued
                if let Some(queue) = self.missing(plane) {
                    queue.remove(&key);
                }
                Ok(Some(children))
            }
            Err(err) => {
                self.imported.remove(&key, plane);
                warn!(target: "fastsync::trie", %key, %plane, error = %err, "trie engine rejected node");
                Ok(None)
            }
        }
    }

    /// Queues the missing descendants of `refs` in `plane`.
    ///
    /// Returns the number of keys added to the queue.
    pub fn update_requests<I>(&self, refs: I, plane: TriePlane) -> SyncResult<usize>
    where
        I: IntoIterator<Item = H256>,
    {
        if !self.is_enabled() {
            return Ok(0);
        }
        let Some(queue) = self.missing(plane) else {
            return Ok(0);
        };

        let mut missing = HashSet::new();
        for root in refs {
            missing.extend(self.trie().traverse_from(&root, plane)?);
        }
        self.imported.retain_unknown(&mut missing, plane);

        let added = queue.offer_all(missing);
        trace!(target: "fastsync::trie", %plane, added, queued = queue.len(), "updated requests");
        Ok(added)
    }
}

fn hex_preview(bytes: &[u8]) -> String {
    const PREVIEW: usize = 64;
    let shown = &bytes[..bytes.len().min(PREVIEW)];
    if bytes.len() > PREVIEW {
        format!("{}..", hex::encode(shown))
    } else {
        hex::encode(shown)
    }
}
