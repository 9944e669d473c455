//! # fastsync-rs
//!
//! Fast-sync coordinator for a proof-of-work full node. Instead of replaying
//! every historical block, the node adopts a recent pivot block, downloads
//! the world-state and contract-storage tries under the pivot's state root,
//! and backfills the block bodies between genesis and the pivot.
//!
//! ## Architecture
//!
//! - [`core`] - hashes, blocks, trie planes, peers and contract metadata
//! - [`config`] - protocol constants and TOML configuration
//! - [`coordinator`] - missing-key queues, imported-node registry, block
//!   batch buffer, request generation, response ingestion, completeness
//!   detection and pivot ownership
//! - [`logging`] - tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fastsync_rs::prelude::*;
//! use std::sync::Arc;
//!
//! let config = FastSyncConfig::load("fastsync.toml")?;
//! fastsync_rs::logging::init(&config.logging)?;
//!
//! let manager = Arc::new(
//!     FastSyncManager::builder()
//!         .with_config(config)
//!         .with_pivot(pivot_block)
//!         .build(collaborators),
//! );
//! let (_shutdown, rx) = tokio::sync::watch::channel(false);
//! RequestScheduler::new(manager.clone()).run(rx).await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub use fastsync_config as config;
pub use fastsync_coordinator as coordinator;
pub use fastsync_core as core;

pub mod logging;

/// Common imports for embedding the coordinator
pub mod prelude {
    pub use crate::config::{FastSyncConfig, LogFormat, LoggingConfig};
    pub use crate::coordinator::{
        BlockStore, Collaborators, FastSyncManager, HeaderValidator, ReceiptOracle,
        RequestBlocksHandler, RequestScheduler, SyncError, SyncResult, Transport, TrieEngine,
        ValidationPool,
    };
    pub use crate::core::{BlockRef, PeerId, PeerInfo, TriePlane, H256};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
