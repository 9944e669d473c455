//! Contract metadata consumed from the block-store.

use crate::{CoreError, CoreResult, H256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte account address.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address([u8; 32]);

impl Address {
    /// Creates an address from a byte slice.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidLength` if the input is not exactly 32 bytes.
    pub fn from_bytes(value: &[u8]) -> CoreResult<Self> {
        let bytes: [u8; 32] = value.try_into().map_err(|_| CoreError::InvalidLength {
            expected: 32,
            actual: value.len(),
        })?;
        Ok(Self(bytes))
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

/// Indexed information about a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    /// Contract address
    pub address: Address,
    /// Block at which the contract was deployed
    pub inception_block: u64,
    /// Whether storage and details for the contract are fully downloaded
    pub complete: bool,
    /// Root of the contract's storage trie as indexed
    pub storage_root: H256,
}

/// World-state entry for an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Account nonce
    pub nonce: u64,
    /// Root of the account's storage trie
    pub storage_root: H256,
    /// Hash of the account's code
    pub code_hash: H256,
}

impl AccountState {
    /// Creates an account state with zero nonce and code hash.
    pub fn with_storage_root(storage_root: H256) -> Self {
        Self {
            nonce: 0,
            storage_root,
            code_hash: H256::zero(),
        }
    }
}
