//! Bounded least-recently-used cache backed by a slot arena.
//!
//! Recency is an intrusive doubly-linked list of indices into the arena, so
//! there are no pointer cycles and no per-entry allocations after the arena
//! fills. Entries are evicted only by capacity pressure.

use std::collections::HashMap;
use std::hash::Hash;

const NIL: usize = usize::MAX;

struct Slot<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

pub struct LruCache<K, V> {
    map: HashMap<K, usize>,
    slots: Vec<Slot<K, V>>,
    head: usize,
    tail: usize,
    capacity: usize,
}

impl<K: Hash + Eq + Copy, V> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "LRU cache capacity must be positive");
        Self {
            map: HashMap::new(),
            slots: Vec::new(),
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Looks up a key and marks it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.detach(idx);
        self.attach_front(idx);
        Some(&self.slots[idx].value)
    }

    /// Inserts or replaces a value, evicting the least recently used entry
    /// once the cache is full.
    pub fn insert(&mut self, key: K, value: V) {
        if let Some(&idx) = self.map.get(&key) {
            self.slots[idx].value = value;
            self.detach(idx);
            self.attach_front(idx);
            return;
        }

        if self.map.len() == self.capacity {
            let idx = self.tail;
            self.detach(idx);
            let evicted = std::mem::replace(
                &mut self.slots[idx],
                Slot {
                    key,
                    value,
                    prev: NIL,
                    next: NIL,
                },
            );
            self.map.remove(&evicted.key);
            self.map.insert(key, idx);
            self.attach_front(idx);
        } else {
            let idx = self.slots.len();
            self.slots.push(Slot {
                key,
                value,
                prev: NIL,
                next: NIL,
            });
            self.map.insert(key, idx);
            self.attach_front(idx);
        }
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        if prev != NIL {
            self.slots[prev].next = next;
        } else if self.head == idx {
            self.head = next;
        }
        if next != NIL {
            self.slots[next].prev = prev;
        } else if self.tail == idx {
            self.tail = prev;
        }
        self.slots[idx].prev = NIL;
        self.slots[idx].next = NIL;
    }

    fn attach_front(&mut self, idx: usize) {
        self.slots[idx].prev = NIL;
        self.slots[idx].next = self.head;
        if self.head != NIL {
            self.slots[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resident_count_never_exceeds_capacity() {
        let mut cache = LruCache::new(8);
        for i in 0..100 {
            cache.insert(i, i * 10);
            assert!(cache.len() <= cache.capacity());
        }
        assert_eq!(cache.len(), 8);
    }

    #[test]
    fn evicts_least_recently_used_first() {
        let mut cache = LruCache::new(2);
        cache.insert('a', 1);
        cache.insert('b', 2);
        cache.insert('c', 3);
        assert_eq!(cache.get(&'a'), None);
        assert_eq!(cache.get(&'b'), Some(&2));
        assert_eq!(cache.get(&'c'), Some(&3));
    }

    #[test]
    fn get_refreshes_recency() {
        let mut cache = LruCache::new(2);
        cache.insert('a', 1);
        cache.insert('b', 2);
        assert_eq!(cache.get(&'a'), Some(&1));
        cache.insert('c', 3);
        // 'b' was the least recent after the touch on 'a'.
        assert_eq!(cache.get(&'b'), None);
        assert_eq!(cache.get(&'a'), Some(&1));
    }

    #[test]
    fn insert_replaces_existing_value_without_growth() {
        let mut cache = LruCache::new(4);
        cache.insert(7, "old");
        cache.insert(7, "new");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&7), Some(&"new"));
    }
}
