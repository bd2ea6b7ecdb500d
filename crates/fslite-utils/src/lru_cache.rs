use std::collections::HashMap;
use std::hash::Hash;

struct Entry<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// A bounded LRU map with O(1) get/put.
///
/// Entries live in a slab of `Option` slots threaded into a doubly-linked
/// recency list (head = most recently used). Freed slots are recycled
/// through a free list, so `remove` and eviction never shift indices.
pub struct LruCache<K, V> {
    capacity: usize,
    map: HashMap<K, usize>,
    slots: Vec<Option<Entry<K, V>>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
}

const NONE: usize = usize::MAX;

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries. A zero capacity is
    /// bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NONE,
            tail: NONE,
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

    /// Look up `key` and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.move_to_front(idx);
        self.slots[idx].as_ref().map(|e| &e.value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Insert or overwrite `key`, returning the previous value for that key.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&idx) = self.map.get(&key) {
            self.move_to_front(idx);
            return self.slots[idx]
                .as_mut()
                .map(|e| std::mem::replace(&mut e.value, value));
        }
        self.insert_new(key, value);
        None
    }

    /// Insert `key`, returning the entry pushed out of the cache if the
    /// bound was exceeded. Overwriting an existing key evicts nothing.
    pub fn push(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&idx) = self.map.get(&key) {
            self.move_to_front(idx);
            if let Some(e) = self.slots[idx].as_mut() {
                e.value = value;
            }
            return None;
        }
        self.insert_new(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.map.remove(key)?;
        self.detach(idx);
        self.release(idx).map(|e| e.value)
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NONE;
        self.tail = NONE;
    }

    /// Keys ordered from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        let mut out = Vec::with_capacity(self.map.len());
        let mut cur = self.head;
        while cur != NONE {
            match &self.slots[cur] {
                Some(e) => {
                    out.push(e.key.clone());
                    cur = e.next;
                }
                None => break,
            }
        }
        out
    }

    fn insert_new(&mut self, key: K, value: V) -> Option<(K, V)> {
        let evicted = if self.map.len() >= self.capacity {
            self.evict_tail()
        } else {
            None
        };

        let entry = Entry {
            key: key.clone(),
            value,
            prev: NONE,
            next: self.head,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(entry);
                idx
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };

        if let Some(h) = self.slot_mut(self.head) {
            h.prev = idx;
        }
        self.head = idx;
        if self.tail == NONE {
            self.tail = idx;
        }
        self.map.insert(key, idx);
        evicted
    }

    fn slot_mut(&mut self, idx: usize) -> Option<&mut Entry<K, V>> {
        if idx == NONE {
            return None;
        }
        self.slots.get_mut(idx).and_then(|s| s.as_mut())
    }

    fn release(&mut self, idx: usize) -> Option<Entry<K, V>> {
        let entry = self.slots.get_mut(idx)?.take();
        self.free.push(idx);
        entry
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.detach(idx);
        let old_head = self.head;
        if let Some(e) = self.slot_mut(idx) {
            e.prev = NONE;
            e.next = old_head;
        }
        if let Some(h) = self.slot_mut(old_head) {
            h.prev = idx;
        }
        self.head = idx;
        if self.tail == NONE {
            self.tail = idx;
        }
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = match self.slot_mut(idx) {
            Some(e) => (e.prev, e.next),
            None => return,
        };

        match self.slot_mut(prev) {
            Some(p) => p.next = next,
            None => self.head = next,
        }
        match self.slot_mut(next) {
            Some(n) => n.prev = prev,
            None => self.tail = prev,
        }

        if let Some(e) = self.slot_mut(idx) {
            e.prev = NONE;
            e.next = NONE;
        }
    }

    fn evict_tail(&mut self) -> Option<(K, V)> {
        if self.tail == NONE {
            return None;
        }
        let tail_idx = self.tail;
        self.detach(tail_idx);
        let entry = self.release(tail_idx)?;
        self.map.remove(&entry.key);
        Some((entry.key, entry.value))
    }
}
