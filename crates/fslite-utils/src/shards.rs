use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use parking_lot::{Mutex, MutexGuard};

/// A fixed array of mutex-protected values selected by key hash.
///
/// `Shards<()>` doubles as a striped lock: holding `lock(&key)` serializes
/// every caller whose key lands in the same shard.
pub struct Shards<T> {
    shards: Vec<Mutex<T>>,
}

impl<T> Shards<T> {
    pub fn new(num_shards: usize, init: impl Fn() -> T) -> Self {
        let shards = (0..num_shards.max(1)).map(|_| Mutex::new(init())).collect();
        Self { shards }
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    pub fn lock<K: Hash + ?Sized>(&self, key: &K) -> MutexGuard<'_, T> {
        self.shards[self.index_of(key)].lock()
    }

    pub fn index_of<K: Hash + ?Sized>(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    pub fn for_each(&self, mut f: impl FnMut(&mut T)) {
        for shard in &self.shards {
            f(&mut shard.lock());
        }
    }
}

impl<T: Default> Shards<T> {
    pub fn with_default(num_shards: usize) -> Self {
        Self::new(num_shards, T::default)
    }
}
