//! Pivot ownership, failed-import accounting and pivot repositioning.

use crate::error::SyncError;
use crate::manager::FastSyncManager;
use dashmap::DashMap;
use fastsync_core::{BlockRef, PeerId, PeerInfo, TriePlane, H256};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, error, info, warn};

/// Block fast sync targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pivot {
    /// Height, always equal to `block.number`
    pub number: u64,
    /// Hash, always equal to `block.hash`
    pub hash: H256,
    /// The pivot block
    pub block: BlockRef,
}

impl Pivot {
    fn from_block(block: BlockRef) -> Self {
        Self {
            number: block.number,
            hash: block.hash,
            block,
        }
    }

    /// Root of the world state to download.
    pub fn state_root(&self) -> H256 {
        self.block.state_root
    }
}

#[derive(Debug, Default)]
struct PivotSlot {
    pivot: Option<Pivot>,
    number: Option<u64>,
}

/// Current pivot plus failure counters.
#[derive(Debug, Default)]
pub struct PivotController {
    slot: RwLock<PivotSlot>,
    inconsistencies: AtomicU32,
    peer_failures: DashMap<PeerId, u32>,
}

impl PivotController {
    /// Creates a controller with no pivot.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self, block: BlockRef) {
        let mut slot = self.slot.write();
        slot.number = Some(block.number);
        slot.pivot = Some(Pivot::from_block(block));
    }

    /// Sets the height alone, dropping a pivot block of another height.
    pub(crate) fn set_number(&self, number: u64) {
        let mut slot = self.slot.write();
        if slot.pivot.as_ref().is_some_and(|p| p.number != number) {
            slot.pivot = None;
        }
        slot.number = Some(number);
    }

    /// Current pivot block.
    pub fn current(&self) -> Option<Pivot> {
        self.slot.read().pivot.clone()
    }

    /// Current pivot height.
    pub fn number(&self) -> Option<u64> {
        self.slot.read().number
    }

    /// Failed imports counted against the current pivot.
    pub fn inconsistencies(&self) -> u32 {
        self.inconsistencies.load(Ordering::Acquire)
    }

    /// Failures counted against `peer` since its last disconnect.
    pub fn peer_failures(&self, peer: PeerId) -> u32 {
        self.peer_failures.get(&peer).map_or(0, |count| *count)
    }

    /// Counts a failed import. Returns true for the one caller whose failure
    /// reaches `threshold`; the counter restarts from zero for it.
    fn record_inconsistency(&self, threshold: u32) -> bool {
        let previous = self
            .inconsistencies
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                let next = count.saturating_add(1);
                Some(if next >= threshold { 0 } else { next })
            })
            .unwrap_or_else(|count| count);
        previous.saturating_add(1) >= threshold
    }

    fn reset_inconsistencies(&self) {
        self.inconsistencies.store(0, Ordering::Release);
    }

    fn record_peer_failure(&self, peer: PeerId) -> u32 {
        let mut count = self.peer_failures.entry(peer).or_insert(0);
        *count += 1;
        *count
    }

    fn clear_peer(&self, peer: PeerId) {
        self.peer_failures.remove(&peer);
    }
}

impl FastSyncManager {
    /// Replaces the pivot. Ignored when disabled.
    pub fn set_pivot(&self, block: BlockRef) {
        if !self.is_enabled() {
            return;
        }
        info!(
            target: "fastsync::pivot",
            number = block.number,
            hash = %block.hash,
            "pivot set"
        );
        self.pivot.set(block);
        self.pivot.reset_inconsistencies();
    }

    /// Current pivot.
    pub fn pivot(&self) -> Option<Pivot> {
        self.pivot.current()
    }

    /// Current pivot height.
    pub fn pivot_number(&self) -> Option<u64> {
        self.pivot.number()
    }

    /// Current pivot hash.
    pub fn pivot_hash(&self) -> Option<H256> {
        self.pivot.current().map(|p| p.hash)
    }

    /// Pivot state and failure counters.
    pub fn pivot_controller(&self) -> &PivotController {
        &self.pivot
    }

    /// True if `peer` announces a best block above the pivot.
    ///
    /// Any peer qualifies while no pivot height is known.
    pub fn is_above_pivot(&self, peer: &PeerInfo) -> bool {
        self.is_enabled()
            && self
                .pivot_number()
                .map_or(true, |number| peer.best_block_number > number)
    }

    /// Handles a trie node that could not be admitted.
    ///
    /// The peer is always charged with the failure. Bytes that do not hash to
    /// their key are the peer's fault alone; only a conflict with an already
    /// imported value counts against the pivot, which moves back once enough
    /// conflicts accumulate around it. Returns the new pivot height when the
    /// pivot moved.
    pub fn handle_failed_import(
        &self,
        key: H256,
        value: &[u8],
        plane: TriePlane,
        peer: PeerId,
        peer_display: &str,
    ) -> Option<u64> {
        if !self.is_enabled() || self.complete.load(Ordering::Acquire) {
            return None;
        }
        let actual = H256::keccak(value);
        let failure = if actual != key {
            SyncError::HashMismatch { key, actual }
        } else {
            SyncError::ConflictingValue { key, plane }
        };
        warn!(
            target: "fastsync::pivot",
            peer = %peer_display,
            value_len = value.len(),
            error = %failure,
            "failed trie import"
        );
        self.report_peer(peer, peer_display, &failure);
        if failure.is_peer_attributable() {
            return None;
        }

        if self
            .pivot
            .record_inconsistency(self.config.pivot_inconsistency_threshold)
        {
            self.reposition_pivot()
        } else {
            None
        }
    }

    /// Charges `peer` with `failure` and disconnects it at the threshold.
    pub fn report_peer(&self, peer: PeerId, peer_display: &str, failure: &SyncError) {
        let failures = self.pivot.record_peer_failure(peer);
        debug!(target: "fastsync::pivot", peer = %peer_display, failures, reason = %failure, "peer failure");
        if failures >= self.config.peer_failure_threshold {
            warn!(
                target: "fastsync::pivot",
                peer = %peer_display,
                failures,
                "disconnecting peer"
            );
            self.transport().disconnect(peer, peer_display);
            self.pivot.clear_peer(peer);
        }
    }

    /// Moves the pivot back and restarts the world-state download from it.
    ///
    /// Returns the new pivot height, or `None` when the pivot stayed.
    pub fn reposition_pivot(&self) -> Option<u64> {
        let Some(current) = self.pivot_number() else {
            warn!(target: "fastsync::pivot", "no pivot to reposition");
            return None;
        };
        let target = current.saturating_sub(self.config.pivot_reposition_distance);
        if target == current {
            warn!(target: "fastsync::pivot", number = current, "pivot already at genesis");
            return None;
        }
        let Some(block) = self.chain().get_block_by_number(target) else {
            warn!(
                target: "fastsync::pivot",
                from = current,
                to = target,
                "pivot target block unavailable"
            );
            return None;
        };

        // the head set when block data latched belongs to the abandoned pivot
        if self.is_complete_blocks() {
            let chain = self.chain();
            chain.set_best_block(&block);
            chain.prune_and_correct();
            chain.flush();
        }

        let state_root = block.state_root;
        self.pivot.set(block);
        self.pivot.reset_inconsistencies();
        self.missing_state.clear();
        self.missing_storage.clear();
        self.imported.clear();

        let seeded = match self.trie().traverse_from(&state_root, TriePlane::State) {
            Ok(missing) => self.missing_state.offer_all(missing),
            Err(err) => {
                warn!(target: "fastsync::pivot", error = %err, "failed to traverse new pivot state");
                0
            }
        };
        info!(
            target: "fastsync::pivot",
            from = current,
            to = target,
            seeded,
            "pivot repositioned"
        );
        Some(target)
    }

    /// Disables fast sync and builds the error surfaced to the caller.
    pub(crate) fn fail_fatal(&self, reason: impl Into<String>) -> SyncError {
        let reason = reason.into();
        error!(target: "fastsync::pivot", %reason, "unrecoverable fast sync inconsistency");
        self.disable();
        SyncError::Unrecoverable(reason)
    }
}
