//! # Fast-sync Core
//!
//! Primitive types shared by the fast-sync crates.
//!
//! This crate provides:
//! - `H256`: 32-byte hash used for block hashes, trie node keys and state roots
//! - `Address`: 32-byte account address
//! - `TriePlane`: the database a trie node belongs to
//! - `BlockRef` / `BlockBatch`: blocks as received from peers
//! - `ContractInfo` / `AccountState`: contract metadata supplied by the block-store
//! - `PeerId` / `PeerInfo`: peer identity as seen by the transport
//!
//! ## Example
//!
//! ```rust
//! use fastsync_core::{H256, TriePlane};
//!
//! let key = H256::keccak(b"node");
//! assert!(!key.is_zero());
//! assert_eq!(TriePlane::from_code(1), Some(TriePlane::Storage));
//! ```

pub mod block;
pub mod contract;
pub mod error;
pub mod h256;
pub mod peer;
pub mod plane;

pub use block::{BlockBatch, BlockRef};
pub use contract::{AccountState, Address, ContractInfo};
pub use error::{CoreError, CoreResult};
pub use h256::{H256, H256_SIZE};
pub use peer::{PeerId, PeerInfo};
pub use plane::TriePlane;
