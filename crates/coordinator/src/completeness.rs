//! Completeness evaluation
//!
//! Four predicates gate the global latch: blocks back to genesis, receipts,
//! the world state under the pivot and the storage of every contract deployed
//! up to the pivot. Evaluating the trie predicates re-traverses the tries and
//! refills the missing-key queues as a side effect, so the whole check is
//! expensive and only runs when the request queues run dry or on a timer.

use crate::error::SyncResult;
use crate::manager::FastSyncManager;
use fastsync_core::TriePlane;
use std::sync::atomic::Ordering;
use tracing::{debug, info};

impl FastSyncManager {
    /// Evaluates every predicate in order and latches completion when all pass.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Unrecoverable` when the contract scan finds an
    /// inconsistency with no recovery path. Fast sync is disabled by then.
    pub fn check_completeness(&self) -> SyncResult<bool> {
        if self.is_complete() {
            return Ok(true);
        }
        if !self.is_complete_block_data() {
            return Ok(false);
        }
        if !self.is_complete_receipt_data() {
            return Ok(false);
        }
        if !self.is_complete_world_state()? {
            return Ok(false);
        }
        if !self.is_complete_contract_data()? {
            return Ok(false);
        }

        if self
            .complete
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            info!(
                target: "fastsync::completeness",
                pivot = ?self.pivot_number(),
                "fast sync complete"
            );
        }
        Ok(true)
    }

    /// True once every block from genesis to the pivot is stored and linked.
    ///
    /// On first success the pivot becomes the best block and the block-store
    /// is pruned and flushed.
    pub fn is_complete_block_data(&self) -> bool {
        if self.is_complete_blocks() {
            return true;
        }
        if !self.is_enabled() {
            return false;
        }
        let Some(number) = self.pivot_number() else {
            return false;
        };
        let chain = self.chain();
        if chain.get_block_by_number(1).is_none() {
            return false;
        }
        let missing = chain.find_missing_ancestor_height(number);
        if missing != 0 {
            debug!(target: "fastsync::completeness", pivot = number, missing, "block data incomplete");
            return false;
        }
        let Some(pivot) = self
            .pivot()
            .map(|p| p.block)
            .or_else(|| chain.get_block_by_number(number))
        else {
            debug!(target: "fastsync::completeness", pivot = number, "pivot block not stored");
            return false;
        };

        chain.set_best_block(&pivot);
        chain.prune_and_correct();
        chain.flush();

        if self
            .complete_blocks
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            info!(target: "fastsync::completeness", pivot = number, "block data complete");
        }
        true
    }

    /// True once the receipt subsystem reports every receipt processed.
    pub fn is_complete_receipt_data(&self) -> bool {
        self.collaborators.receipts.is_complete_receipt_data()
    }

    /// Re-traverses the world state under the pivot.
    ///
    /// The state queue is replaced with the missing nodes found. Returns true
    /// when nothing is missing.
    pub fn is_complete_world_state(&self) -> SyncResult<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }
        let Some(pivot) = self.pivot() else {
            return Ok(false);
        };

        let missing = self
            .trie()
            .traverse_from(&pivot.state_root(), TriePlane::State)?;
        self.missing_state.clear();
        if missing.is_empty() {
            return Ok(true);
        }
        let total = missing.len();
        let queued = self.missing_state.offer_all(missing);
        debug!(target: "fastsync::completeness", total, queued, "world state incomplete");
        Ok(false)
    }

    /// Scans contracts deployed up to the pivot for missing storage nodes.
    ///
    /// Runs only once receipts and the world state are complete and the
    /// storage queue has drained. Contracts whose storage is fully present are
    /// marked complete. The scan stops early once the storage queue holds
    /// `contract_missing_keys_limit` keys.
    ///
    /// # Errors
    ///
    /// A contract without indexed information or without an account state is
    /// an unrecoverable inconsistency: fast sync is disabled and
    /// `SyncError::Unrecoverable` is returned.
    pub fn is_complete_contract_data(&self) -> SyncResult<bool> {
        if !self.is_enabled() || !self.missing_storage.is_empty() {
            return Ok(false);
        }
        if !self.is_complete_receipt_data() || !self.is_complete_world_state()? {
            return Ok(false);
        }
        let Some(pivot_number) = self.pivot_number() else {
            return Ok(false);
        };

        let chain = self.chain();
        let limit = self.config.contract_missing_keys_limit;
        for address in chain.contracts_iter() {
            let Some(info) = chain.indexed_contract_information(&address) else {
                return Err(self.fail_fatal(format!("no indexed information for contract {address}")));
            };
            if info.inception_block > pivot_number || info.complete {
                continue;
            }
            let Some(account) = chain.account_state(&address) else {
                return Err(self.fail_fatal(format!("no account state for contract {address}")));
            };

            let missing = self
                .trie()
                .traverse_from(&account.storage_root, TriePlane::Storage)?;
            if missing.is_empty() {
                chain.mark_contract_complete(&address);
                debug!(target: "fastsync::completeness", contract = %address, "contract storage complete");
            } else {
                self.missing_storage.offer_all(missing);
            }

            if self.missing_storage.len() >= limit {
                debug!(
                    target: "fastsync::completeness",
                    queued = self.missing_storage.len(),
                    "contract scan paused at missing-key limit"
                );
                return Ok(false);
            }
        }
        Ok(self.missing_storage.is_empty())
    }
}
