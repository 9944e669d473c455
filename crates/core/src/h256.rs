//! Implementation of `H256`, the 32-byte hash used across fast sync.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// The length of `H256` values in bytes.
pub const H256_SIZE: usize = 32;

/// A 32-byte hash.
///
/// Block hashes, trie node keys and state roots are all `H256` values. Equality,
/// ordering and hashing are by value so the type can key maps and sets directly.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct H256([u8; H256_SIZE]);

impl H256 {
    /// Alias for the byte length.
    pub const LENGTH: usize = H256_SIZE;

    /// Returns the all-zero hash.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; H256_SIZE])
    }

    /// Checks if every byte is zero.
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Computes the Keccak-256 digest of `data`.
    ///
    /// Trie nodes are keyed by the digest of their encoded bytes, so a received
    /// `(key, value)` pair is consistent iff `H256::keccak(value) == key`.
    #[must_use]
    pub fn keccak(data: &[u8]) -> Self {
        let digest = Keccak256::digest(data);
        let mut bytes = [0u8; H256_SIZE];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Creates a new `H256` from a byte slice.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidLength` if the input is not exactly 32 bytes.
    pub fn from_bytes(value: &[u8]) -> CoreResult<Self> {
        if value.len() != H256_SIZE {
            return Err(CoreError::InvalidLength {
                expected: H256_SIZE,
                actual: value.len(),
            });
        }

        let mut bytes = [0u8; H256_SIZE];
        bytes.copy_from_slice(value);
        Ok(Self(bytes))
    }

    /// Returns the underlying bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; H256_SIZE] {
        &self.0
    }

    /// Returns the bytes as a `Vec<u8>`.
    #[inline]
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Lower-case hex with a `0x` prefix.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Abbreviated form used in log lines.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parses a hash from a 64-character hex string, with or without `0x`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidFormat` for bad hex and `CoreError::InvalidLength`
    /// for a decoded length other than 32 bytes.
    pub fn parse(s: &str) -> CoreResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidFormat {
            message: e.to_string(),
        })?;
        Self::from_bytes(&bytes)
    }
}

impl From<[u8; H256_SIZE]> for H256 {
    fn from(bytes: [u8; H256_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for H256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

impl fmt::Debug for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H256({})", self.to_hex_string())
    }
}

impl FromStr for H256 {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
