//! # Fast-sync Coordinator
//!
//! Brings a fresh node up to a recent committed block, the pivot, by
//! downloading blocks, the world-state trie and contract storage tries in
//! parallel from many peers. The node counts as synced only when all of them
//! are complete and consistent.
//!
//! The coordinator does not own a database, a trie engine or a network. It
//! drives the collaborators in [`traits`] and keeps only bookkeeping:
//!
//! - [`MissingKeys`]: bounded queues of trie keys still to request
//! - [`ImportedNodes`]: trie nodes received so far
//! - [`BlockBuffer`]: validated block batches awaiting import
//! - [`PivotController`]: the pivot and failure accounting
//! - [`FastSyncManager`]: the façade tying them together
//!
//! [`RequestScheduler`] runs the request loop on tokio, [`ValidationPool`]
//! validates block responses on a rayon pool and [`RequestBlocksHandler`]
//! serves block ranges to other peers.

pub mod blocks;
mod completeness;
pub mod error;
pub mod handler;
pub mod imported;
mod ingest;
pub mod manager;
pub mod messages;
pub mod pivot;
pub mod pool;
pub mod queue;
mod requests;
pub mod scheduler;
pub mod traits;

pub use blocks::BlockBuffer;
pub use error::{SyncError, SyncResult};
pub use handler::RequestBlocksHandler;
pub use imported::{ImportOutcome, ImportedNodes};
pub use manager::{FastSyncManager, FastSyncManagerBuilder, SyncStats};
pub use messages::{
    RequestBlocks, RequestTrieData, ResponseBlocks, ResponseTrieData, SyncMessage, WireMessage,
};
pub use pivot::{Pivot, PivotController};
pub use pool::{BlockResponse, ValidationPool};
pub use queue::MissingKeys;
pub use scheduler::RequestScheduler;
pub use traits::{
    BlockStore, Collaborators, HeaderValidator, ReceiptOracle, Transport, TrieEngine,
};
