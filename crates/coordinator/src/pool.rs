//! Worker pool for block response validation.

use crate::error::{SyncError, SyncResult};
use crate::manager::FastSyncManager;
use fastsync_core::{BlockRef, PeerId};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// A block response awaiting validation.
#[derive(Debug, Clone)]
pub struct BlockResponse {
    /// Sending peer
    pub peer: PeerId,
    /// Display name of the sending peer
    pub display: String,
    /// Blocks as received
    pub blocks: Vec<BlockRef>,
}

impl BlockResponse {
    /// Creates a new response
    pub fn new(peer: PeerId, display: impl Into<String>, blocks: Vec<BlockRef>) -> Self {
        Self {
            peer,
            display: display.into(),
            blocks,
        }
    }
}

/// Fixed-size pool running [`FastSyncManager::validate_and_add_blocks`].
pub struct ValidationPool {
    pool: rayon::ThreadPool,
}

impl ValidationPool {
    /// Builds a pool with `threads` workers, at least one.
    pub fn new(threads: usize) -> SyncResult<Self> {
        let threads = threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("fastsync-validate-{i}"))
            .build()
            .map_err(|e| SyncError::Runtime(e.to_string()))?;
        debug!(target: "fastsync::blocks", threads, "validation pool started");
        Ok(Self { pool })
    }

    /// Builds a pool sized by `worker_threads`, or the hardware parallelism when zero.
    pub fn for_manager(manager: &FastSyncManager) -> SyncResult<Self> {
        Self::new(manager.config().effective_worker_threads(num_cpus::get()))
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Validates one response in the background.
    pub fn submit(&self, manager: Arc<FastSyncManager>, response: BlockResponse) {
        self.pool.spawn(move || {
            manager.validate_and_add_blocks(response.peer, &response.display, response.blocks);
        });
    }

    /// Validates every response in parallel and returns the number of blocks buffered.
    pub fn validate_all(&self, manager: &FastSyncManager, responses: Vec<BlockResponse>) -> usize {
        self.pool.install(|| {
            responses
                .into_par_iter()
                .map(|response| {
                    manager.validate_and_add_blocks(response.peer, &response.display, response.blocks)
                })
                .sum()
        })
    }
}

impl std::fmt::Debug for ValidationPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationPool")
            .field("threads", &self.threads())
            .finish()
    }
}
