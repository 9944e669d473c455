//! Bounded set-FIFO of trie node keys awaiting request.

use fastsync_core::H256;
use hashbrown::HashSet;
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Debug, Default)]
struct Slots {
    order: VecDeque<H256>,
    members: HashSet<H256>,
}

/// Keys of trie nodes known to be referenced but not yet requested.
///
/// Each key is held at most once and keys are polled in insertion order.
/// Offers beyond `capacity` are dropped; the next traversal rediscovers them.
#[derive(Debug)]
pub struct MissingKeys {
    capacity: usize,
    slots: Mutex<Slots>,
}

impl MissingKeys {
    /// Creates an empty queue holding at most `capacity` keys.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Maximum number of keys held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts `key` unless it is already queued or the queue is full.
    ///
    /// Returns `true` if the key was added.
    pub fn offer(&self, key: H256) -> bool {
        let mut slots = self.slots.lock();
        Self::offer_locked(&mut slots, self.capacity, key)
    }

    /// Offers every key, returning how many were added.
    pub fn offer_all<I>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = H256>,
    {
        let mut slots = self.slots.lock();
        let mut added = 0;
        for key in keys {
            if slots.order.len() >= self.capacity {
                break;
            }
            if Self::offer_locked(&mut slots, self.capacity, key) {
                added += 1;
            }
        }
        added
    }

    fn offer_locked(slots: &mut Slots, capacity: usize, key: H256) -> bool {
        if slots.order.len() >= capacity || !slots.members.insert(key) {
            return false;
        }
        slots.order.push_back(key);
        true
    }

    /// Removes and returns the oldest key.
    pub fn poll(&self) -> Option<H256> {
        let mut slots = self.slots.lock();
        let key = slots.order.pop_front()?;
        slots.members.remove(&key);
        Some(key)
    }

    /// Withdraws `key` if queued. Returns `true` if it was.
    pub fn remove(&self, key: &H256) -> bool {
        let mut slots = self.slots.lock();
        if !slots.members.remove(key) {
            return false;
        }
        slots.order.retain(|queued| queued != key);
        true
    }

    /// True if `key` is queued.
    pub fn contains(&self, key: &H256) -> bool {
        self.slots.lock().members.contains(key)
    }

    /// Removes every key.
    pub fn clear(&self) {
        let mut slots = self.slots.lock();
        slots.order.clear();
        slots.members.clear();
    }

    /// Number of queued keys.
    pub fn len(&self) -> usize {
        self.slots.lock().order.len()
    }

    /// True if no key is queued.
    pub fn is_empty(&self) -> bool {
        self.slots.lock().order.is_empty()
    }

    /// Moves every queued key into `target`, leaving the queue empty.
    pub fn drain_into<E>(&self, target: &mut E)
    where
        E: Extend<H256>,
    {
        let mut slots = self.slots.lock();
        slots.members.clear();
        target.extend(slots.order.drain(..));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet as StdHashSet;

    fn key(n: u8) -> H256 {
        H256::from([n; 32])
    }

    #[test]
    fn test_offer_is_idempotent() {
        let queue = MissingKeys::new(4);
        assert!(queue.offer(key(1)));
        assert!(!queue.offer(key(1)));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.poll(), Some(key(1)));
        assert_eq!(queue.poll(), None);
    }

    #[test]
    fn test_fifo_order() {
        let queue = MissingKeys::new(8);
        queue.offer_all([key(3), key(1), key(2)]);
        assert_eq!(queue.poll(), Some(key(3)));
        // a re-offered key goes behind its unpolled siblings
        queue.offer(key(3));
        assert_eq!(queue.poll(), Some(key(1)));
        assert_eq!(queue.poll(), Some(key(2)));
        assert_eq!(queue.poll(), Some(key(3)));
    }

    #[test]
    fn test_full_queue_drops_silently() {
        let queue = MissingKeys::new(2);
        assert_eq!(queue.offer_all([key(1), key(2), key(3)]), 2);
        assert!(!queue.offer(key(4)));
        assert_eq!(queue.len(), 2);
        assert!(!queue.contains(&key(3)));
    }

    #[test]
    fn test_drain_into() {
        let queue = MissingKeys::new(8);
        queue.offer_all([key(1), key(2)]);
        let mut drained = StdHashSet::new();
        queue.drain_into(&mut drained);
        assert!(queue.is_empty());
        assert_eq!(drained.len(), 2);
        assert!(queue.offer(key(1)));
    }

    #[test]
    fn test_remove_withdraws_key() {
        let queue = MissingKeys::new(8);
        queue.offer_all([key(1), key(2), key(3)]);
        assert!(queue.remove(&key(2)));
        assert!(!queue.remove(&key(2)));
        assert!(!queue.contains(&key(2)));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.poll(), Some(key(1)));
        assert_eq!(queue.poll(), Some(key(3)));
        assert_eq!(queue.poll(), None);
    }

    #[test]
    fn test_clear() {
        let queue = MissingKeys::new(8);
        queue.offer_all([key(1), key(2)]);
        queue.clear();
        assert!(queue.is_empty());
        assert!(!queue.contains(&key(1)));
    }

    proptest! {
        #[test]
        fn test_bounded_and_unique(
            capacity in 1usize..16,
            keys in proptest::collection::vec(any::<u8>(), 0..64)
        ) {
            let queue = MissingKeys::new(capacity);
            for k in &keys {
                queue.offer(key(*k));
            }
            prop_assert!(queue.len() <= capacity);

            let mut seen = StdHashSet::new();
            while let Some(k) = queue.poll() {
                prop_assert!(seen.insert(k));
            }
            let distinct: StdHashSet<_> = keys.iter().collect();
            prop_assert_eq!(seen.len(), distinct.len().min(capacity));
        }
    }
}
