//! Pivot ownership and repositioning after failed imports.

mod common;

use bytes::Bytes;
use common::*;
use fastsync_config::FastSyncConfig;
use fastsync_coordinator::{FastSyncManager, ResponseTrieData};
use fastsync_core::{PeerId, PeerInfo, TriePlane, H256};

fn config() -> FastSyncConfig {
    FastSyncConfig {
        pivot_inconsistency_threshold: 3,
        peer_failure_threshold: 3,
        pivot_reposition_distance: 100,
        ..FastSyncConfig::default()
    }
}

/// Response whose entries never hash to their keys.
fn forged(count: u8) -> ResponseTrieData {
    let entries = (0..count)
        .map(|n| (H256::keccak(&[n, 0xff]), Bytes::from(vec![n; 8])))
        .collect();
    ResponseTrieData::new(H256::zero(), TriePlane::State, entries)
}

/// Response carrying genuine nodes whose keys were already bound to other bytes.
fn conflicting(manager: &FastSyncManager, first: u8, count: u8) -> ResponseTrieData {
    let entries = (first..first + count)
        .map(|n| {
            let value = encode_node(100 + u64::from(n), &[]);
            let key = H256::keccak(&value);
            manager.add_imported_node(key, Bytes::from(vec![n; 8]), TriePlane::State);
            (key, value)
        })
        .collect();
    ResponseTrieData::new(H256::zero(), TriePlane::State, entries)
}

#[test]
fn test_is_above_pivot() {
    let harness = Harness::new(10);
    let manager = harness.manager();
    let peer = |best| PeerInfo::new(PeerId(1), "peer-1", best);

    assert!(manager.is_above_pivot(&peer(0)));

    manager.set_pivot(block(10));
    assert_eq!(manager.pivot_number(), Some(10));
    assert_eq!(manager.pivot_hash(), Some(block_hash(10)));
    assert!(manager.is_above_pivot(&peer(11)));
    assert!(!manager.is_above_pivot(&peer(10)));

    manager.disable();
    assert!(!manager.is_above_pivot(&peer(11)));
}

/// Repeated failed imports move the pivot back and restart the state download.
#[test]
fn test_repeated_failures_reposition_pivot() {
    let harness = Harness::new(300);
    let manager = harness.manager_with(config());
    manager.set_pivot(harness.chain.set_state_root(300, state_root(300)));

    let node = encode_node(1, &[H256::keccak(b"child")]);
    manager.add_imported_node(H256::keccak(&node), node, TriePlane::State);
    manager
        .update_requests([H256::keccak(b"queued")], TriePlane::Storage)
        .unwrap();

    let first = conflicting(&manager, 0, 2);
    manager.add_trie_response(PeerId(1), "peer-1", first).unwrap();
    assert_eq!(manager.pivot_number(), Some(300));
    assert_eq!(manager.pivot_controller().inconsistencies(), 2);

    let second = conflicting(&manager, 2, 1);
    manager.add_trie_response(PeerId(2), "peer-2", second).unwrap();
    let pivot = manager.pivot().unwrap();
    assert_eq!(pivot.number, 200);
    assert_eq!(pivot.hash, block_hash(200));
    assert_eq!(manager.pivot_controller().inconsistencies(), 0);

    let stats = manager.stats();
    assert_eq!(stats.imported_state, 0);
    assert_eq!(stats.missing_storage, 0);
    assert_eq!(stats.missing_state, 1);
    assert!(manager
        .missing(TriePlane::State)
        .unwrap()
        .contains(&state_root(200)));
}

/// The peer behind the failures is disconnected at the threshold.
#[test]
fn test_failing_peer_is_disconnected() {
    let harness = Harness::new(300);
    let manager = harness.manager_with(FastSyncConfig {
        pivot_inconsistency_threshold: 10,
        ..config()
    });
    manager.set_pivot(block(300));

    manager.add_trie_response(PeerId(5), "peer-5", forged(2)).unwrap();
    assert!(harness.transport.disconnected().is_empty());
    manager.add_trie_response(PeerId(5), "peer-5", forged(1)).unwrap();
    assert_eq!(harness.transport.disconnected(), vec![PeerId(5)]);
    assert_eq!(manager.pivot_number(), Some(300));
}

/// Forged nodes from one peer cost that peer, never the pivot.
#[test]
fn test_forged_nodes_keep_pivot() {
    let harness = Harness::new(300);
    let manager = harness.manager();
    manager.set_pivot(block(300));

    manager.add_trie_response(PeerId(9), "peer-9", forged(3)).unwrap();
    assert_eq!(manager.pivot_number(), Some(300));
    assert_eq!(manager.pivot_controller().inconsistencies(), 0);
    assert_eq!(harness.transport.disconnected(), vec![PeerId(9)]);
}

/// A head set from latched block data follows the pivot back.
#[test]
fn test_best_block_follows_reposition() {
    let harness = Harness::new(300);
    let manager = harness.manager_with(config());
    manager.set_pivot(block(300));

    assert!(manager.is_complete_block_data());
    assert_eq!(harness.chain.best.read().as_ref().map(|b| b.hash), Some(block_hash(300)));

    assert_eq!(manager.reposition_pivot(), Some(200));
    assert_eq!(harness.chain.best.read().as_ref().map(|b| b.hash), Some(block_hash(200)));
    assert_eq!(harness.chain.pruned.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert_eq!(harness.chain.flushed.load(std::sync::atomic::Ordering::SeqCst), 2);
}

/// The pivot stays when the target block is not stored.
#[test]
fn test_reposition_needs_target_block() {
    let harness = Harness::new(300);
    harness.chain.remove(200);
    let manager = harness.manager_with(config());
    manager.set_pivot(block(300));

    let response = conflicting(&manager, 0, 3);
    manager.add_trie_response(PeerId(1), "peer-1", response).unwrap();
    assert_eq!(manager.pivot_number(), Some(300));
    assert_eq!(manager.pivot_controller().inconsistencies(), 0);

    harness.chain.insert(block(200));
    assert_eq!(manager.reposition_pivot(), Some(200));
}

/// Repositioning saturates at genesis and cannot go below it.
#[test]
fn test_reposition_saturates_at_genesis() {
    let harness = Harness::new(50);
    let manager = harness.manager_with(config());
    manager.set_pivot(block(50));

    assert_eq!(manager.reposition_pivot(), Some(0));
    assert_eq!(manager.pivot_number(), Some(0));
    assert_eq!(manager.reposition_pivot(), None);
}

/// Nothing moves once fast sync is complete or disabled.
#[test]
fn test_no_reposition_when_done() {
    let harness = Harness::new(300);
    let manager = FastSyncManager::builder()
        .with_config(config())
        .with_pivot(block(300))
        .disabled()
        .build(harness.collaborators());

    let moved = manager.handle_failed_import(H256::zero(), b"x", TriePlane::State, PeerId(1), "peer-1");
    assert_eq!(moved, None);
    assert_eq!(manager.pivot_controller().peer_failures(PeerId(1)), 0);
}
