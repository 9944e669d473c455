//! Fast-sync Configuration Module
//!
//! Protocol constants and configuration types for the fast-sync coordinator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Maximum number of trie nodes a peer may return for one trie-data request
pub const TRIE_DATA_REQUEST_MAXIMUM_BATCH_SIZE: u32 = 100;
/// Maximum number of blocks that can be requested at once
pub const BLOCKS_REQUEST_MAXIMUM_BATCH_SIZE: u32 = 40;
/// Missing storage keys gathered before the contract scan stops
pub const CONTRACT_MISSING_KEYS_LIMIT: usize = 1_000;

/// Capacity of the LRU of block hashes already imported into the chain
pub const IMPORTED_HASHES_CAPACITY: usize = 4096;
/// Capacity of the LRU mapping received block hashes to their batch
pub const RECEIVED_HASHES_CAPACITY: usize = 1000;

/// Default number of blocks the pivot moves back on repositioning
pub const DEFAULT_PIVOT_REPOSITION_DISTANCE: u64 = 256;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading the configuration file failed
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// File that could not be read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The TOML document could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value outside its allowed range
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Fast-sync configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastSyncConfig {
    /// Whether fast sync runs at all; a disabled coordinator is a pass-through
    pub enabled: bool,
    /// Batch size limit attached to trie-data requests
    pub trie_batch_max: u32,
    /// Number of blocks per block request
    pub blocks_batch_max: u32,
    /// Missing storage keys gathered before the contract scan stops
    pub contract_missing_keys_limit: usize,
    /// Capacity of the imported block hashes LRU
    pub imported_hashes_capacity: usize,
    /// Capacity of the received block hashes LRU
    pub received_hashes_capacity: usize,
    /// Peer-attributable failures tolerated before a disconnect
    pub peer_failure_threshold: u32,
    /// Failed imports tolerated around one pivot before it moves
    pub pivot_inconsistency_threshold: u32,
    /// Blocks the pivot moves back when repositioned
    pub pivot_reposition_distance: u64,
    /// Validation worker threads, 0 for hardware parallelism
    pub worker_threads: usize,
    /// Interval between trie request rounds
    pub request_interval_ms: u64,
    /// Trie requests dispatched per round
    pub requests_per_tick: usize,
    /// Interval between completeness evaluations
    pub completeness_interval_ms: u64,
    /// Logging
    pub logging: LoggingConfig,
}

impl Default for FastSyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trie_batch_max: TRIE_DATA_REQUEST_MAXIMUM_BATCH_SIZE,
            blocks_batch_max: BLOCKS_REQUEST_MAXIMUM_BATCH_SIZE,
            contract_missing_keys_limit: CONTRACT_MISSING_KEYS_LIMIT,
            imported_hashes_capacity: IMPORTED_HASHES_CAPACITY,
            received_hashes_capacity: RECEIVED_HASHES_CAPACITY,
            peer_failure_threshold: 3,
            pivot_inconsistency_threshold: 3,
            pivot_reposition_distance: DEFAULT_PIVOT_REPOSITION_DISTANCE,
            worker_threads: 0,
            request_interval_ms: 100,
            requests_per_tick: 16,
            completeness_interval_ms: 5_000,
            logging: LoggingConfig::default(),
        }
    }
}

impl FastSyncConfig {
    /// Configuration for a coordinator that stays out of the way.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Capacity of each missing-key queue.
    pub fn queue_limit(&self) -> usize {
        self.contract_missing_keys_limit.saturating_mul(2)
    }

    /// Effective validation pool size.
    pub fn effective_worker_threads(&self, available: usize) -> usize {
        if self.worker_threads == 0 {
            available.max(1)
        } else {
            self.worker_threads
        }
    }

    /// Trie request round interval.
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    /// Completeness evaluation interval.
    pub fn completeness_interval(&self) -> Duration {
        Duration::from_millis(self.completeness_interval_ms)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(input: &str) -> ConfigResult<Self> {
        let config: FastSyncConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// Checks every field against its allowed range.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.trie_batch_max == 0 || self.trie_batch_max > TRIE_DATA_REQUEST_MAXIMUM_BATCH_SIZE {
            return Err(ConfigError::Invalid {
                field: "trie_batch_max",
                reason: format!(
                    "must be between 1 and {}",
                    TRIE_DATA_REQUEST_MAXIMUM_BATCH_SIZE
                ),
            });
        }
        if self.blocks_batch_max == 0 || self.blocks_batch_max > BLOCKS_REQUEST_MAXIMUM_BATCH_SIZE
        {
            return Err(ConfigError::Invalid {
                field: "blocks_batch_max",
                reason: format!(
                    "must be between 1 and {}",
                    BLOCKS_REQUEST_MAXIMUM_BATCH_SIZE
                ),
            });
        }
        let positive: [(&'static str, u64); 9] = [
            (
                "contract_missing_keys_limit",
                self.contract_missing_keys_limit as u64,
            ),
            (
                "imported_hashes_capacity",
                self.imported_hashes_capacity as u64,
            ),
            (
                "received_hashes_capacity",
                self.received_hashes_capacity as u64,
            ),
            ("peer_failure_threshold", self.peer_failure_threshold as u64),
            (
                "pivot_inconsistency_threshold",
                self.pivot_inconsistency_threshold as u64,
            ),
            ("request_interval_ms", self.request_interval_ms),
            ("requests_per_tick", self.requests_per_tick as u64),
            ("completeness_interval_ms", self.completeness_interval_ms),
            ("pivot_reposition_distance", self.pivot_reposition_distance),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}
