//! In-memory chunk store for tests and the `memory` backend.

use bytes::Bytes;
use dashmap::DashMap;
use fslite_types::{ChunkId, NodeStatus, Result, Status, StorageCode};
use parking_lot::RwLock;

use crate::ChunkStore;

/// Chunk store backed by a concurrent hash map.
#[derive(Debug, Default)]
pub struct MemChunkStore {
    chunks: DashMap<ChunkId, Bytes>,
    status: RwLock<Option<NodeStatus>>,
}

impl MemChunkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChunkStore for MemChunkStore {
    fn read(&self, chunk_id: &ChunkId) -> Result<Bytes> {
        self.chunks
            .get(chunk_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                Status::with_message(
                    StorageCode::CHUNK_NOT_FOUND,
                    format!("chunk {} not found", chunk_id),
                )
            })
    }

    fn write(&self, chunk_id: &ChunkId, data: Bytes) -> Result<()> {
        self.chunks.insert(chunk_id.clone(), data);
        Ok(())
    }

    fn remove(&self, chunk_id: &ChunkId) -> Result<bool> {
        Ok(self.chunks.remove(chunk_id).is_some())
    }

    fn contains(&self, chunk_id: &ChunkId) -> bool {
        self.chunks.contains_key(chunk_id)
    }

    fn list(&self) -> Result<Vec<(ChunkId, u64)>> {
        let mut out: Vec<_> = self
            .chunks
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().len() as u64))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    fn used_bytes(&self) -> Result<u64> {
        Ok(self.chunks.iter().map(|e| e.value().len() as u64).sum())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.chunks.len())
    }

    fn clear(&self) -> Result<usize> {
        let n = self.chunks.len();
        self.chunks.clear();
        Ok(n)
    }

    fn load_status(&self) -> Result<Option<NodeStatus>> {
        Ok(*self.status.read())
    }

    fn store_status(&self, status: NodeStatus) -> Result<()> {
        *self.status.write() = Some(status);
        Ok(())
    }
}
