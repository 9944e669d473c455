//! Trie nodes already received and persisted, per plane.

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fastsync_core::{TriePlane, H256};

/// Result of inserting a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The node was new and is now recorded
    Inserted,
    /// The same bytes were already recorded
    Duplicate,
    /// Different bytes are recorded under the key
    Conflict(Bytes),
    /// The plane is not tracked
    Ignored,
}

/// Imported state and storage nodes keyed by hash.
#[derive(Debug, Default)]
pub struct ImportedNodes {
    state: DashMap<H256, Bytes>,
    storage: DashMap<H256, Bytes>,
}

impl ImportedNodes {
    /// Creates empty stores.
    pub fn new() -> Self {
        Self::default()
    }

    fn plane(&self, plane: TriePlane) -> Option<&DashMap<H256, Bytes>> {
        match plane {
            TriePlane::State => Some(&self.state),
            TriePlane::Storage => Some(&self.storage),
            TriePlane::Details => None,
        }
    }

    /// Records `value` under `key`, replacing any previous value.
    ///
    /// Planes other than state and storage are ignored.
    pub fn put(&self, key: H256, value: Bytes, plane: TriePlane) {
        if let Some(store) = self.plane(plane) {
            store.insert(key, value);
        }
    }

    /// Records `value` under `key` unless the key already holds a value.
    pub fn insert_if_absent(&self, key: H256, value: Bytes, plane: TriePlane) -> ImportOutcome {
        let Some(store) = self.plane(plane) else {
            return ImportOutcome::Ignored;
        };
        match store.entry(key) {
            Entry::Occupied(existing) => {
                if existing.get() == &value {
                    ImportOutcome::Duplicate
                } else {
                    ImportOutcome::Conflict(existing.get().clone())
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(value);
                ImportOutcome::Inserted
            }
        }
    }

    /// True iff `key` holds exactly `value`.
    pub fn contains_exact(&self, key: &H256, value: &[u8], plane: TriePlane) -> bool {
        self.plane(plane)
            .and_then(|store| store.get(key).map(|stored| stored.as_ref() == value))
            .unwrap_or(false)
    }

    /// True if `key` holds any value.
    pub fn contains_key(&self, key: &H256, plane: TriePlane) -> bool {
        self.plane(plane).is_some_and(|store| store.contains_key(key))
    }

    /// Stored value for `key`.
    pub fn get(&self, key: &H256, plane: TriePlane) -> Option<Bytes> {
        self.plane(plane)
            .and_then(|store| store.get(key).map(|stored| stored.clone()))
    }

    /// Forgets `key`.
    pub fn remove(&self, key: &H256, plane: TriePlane) {
        if let Some(store) = self.plane(plane) {
            store.remove(key);
        }
    }

    /// Removes every key recorded for `plane` from `keys`.
    pub fn retain_unknown(&self, keys: &mut std::collections::HashSet<H256>, plane: TriePlane) {
        if let Some(store) = self.plane(plane) {
            keys.retain(|key| !store.contains_key(key));
        }
    }

    /// Number of nodes recorded for `plane`.
    pub fn len(&self, plane: TriePlane) -> usize {
        self.plane(plane).map_or(0, DashMap::len)
    }

    /// True if no node is recorded in any plane.
    pub fn is_empty(&self) -> bool {
        self.state.is_empty() && self.storage.is_empty()
    }

    /// Forgets every node.
    pub fn clear(&self) {
        self.state.clear();
        self.storage.clear();
    }
}
