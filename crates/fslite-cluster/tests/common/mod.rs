#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use fslite_cluster::{Cluster, ClusterConfig};
use fslite_config::ConfigManager;
use fslite_meta_store::MemManifestStore;
use fslite_mgmtd::NodeRegistry;
use fslite_storage_service::{ChunkStore, MemChunkStore};
use fslite_types::{make_error_msg, ChunkId, NodeId, Result, StorageCode};

/// A memory store that starts failing writes once `fail_after` writes have
/// succeeded.
#[derive(Debug)]
pub struct FaultyStore {
    inner: MemChunkStore,
    writes: AtomicUsize,
    fail_after: usize,
}

impl FaultyStore {
    pub fn new(fail_after: usize) -> Self {
        Self {
            inner: MemChunkStore::new(),
            writes: AtomicUsize::new(0),
            fail_after,
        }
    }
}

impl ChunkStore for FaultyStore {
    fn read(&self, chunk_id: &ChunkId) -> Result<Bytes> {
        self.inner.read(chunk_id)
    }

    fn write(&self, chunk_id: &ChunkId, data: Bytes) -> Result<()> {
        if self.writes.fetch_add(1, Ordering::SeqCst) >= self.fail_after {
            return make_error_msg(
                StorageCode::CHUNK_WRITE_FAILED,
                format!("injected write failure for {}", chunk_id),
            );
        }
        self.inner.write(chunk_id, data)
    }

    fn remove(&self, chunk_id: &ChunkId) -> Result<bool> {
        self.inner.remove(chunk_id)
    }

    fn contains(&self, chunk_id: &ChunkId) -> bool {
        self.inner.contains(chunk_id)
    }

    fn list(&self) -> Result<Vec<(ChunkId, u64)>> {
        self.inner.list()
    }

    fn clear(&self) -> Result<usize> {
        self.inner.clear()
    }
}

pub fn config(output_dir: &Path, chunk_size: u64) -> ClusterConfig {
    ClusterConfig {
        chunk_size,
        output_dir: output_dir.to_path_buf(),
        ..ClusterConfig::in_memory()
    }
}

pub fn memory_cluster(output_dir: &Path, chunk_size: u64) -> Cluster {
    Cluster::in_memory(config(output_dir, chunk_size)).unwrap()
}

/// A cluster whose nodes are the given stores, in order `node_0..`.
pub fn cluster_with_stores(
    output_dir: &Path,
    chunk_size: u64,
    max_storage: u64,
    stores: Vec<Arc<dyn ChunkStore>>,
) -> Cluster {
    let stores = stores
        .into_iter()
        .enumerate()
        .map(|(n, s)| (NodeId(n as u32), s))
        .collect();
    let registry = NodeRegistry::with_stores(stores, max_storage).unwrap();
    let mut cfg = config(output_dir, chunk_size);
    cfg.max_storage_bytes = max_storage;
    Cluster::from_parts(
        Arc::new(ConfigManager::new(cfg)),
        Arc::new(registry),
        Arc::new(MemManifestStore::new()),
    )
}

/// Deterministic pseudo-random bytes.
pub fn payload(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state & 0xff) as u8
        })
        .collect()
}

/// Total chunk copies held across all nodes.
pub fn stored_copies(cluster: &Cluster) -> usize {
    cluster
        .list_nodes()
        .unwrap()
        .iter()
        .map(|n| n.chunk_count)
        .sum()
}
