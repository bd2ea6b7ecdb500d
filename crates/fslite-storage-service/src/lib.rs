//! Storage service crate for fslite.
//!
//! A storage node keeps whole chunks keyed by chunk id, plus a persisted
//! status record. [`ChunkStore`] is the contract the rest of the system
//! programs against; [`MemChunkStore`] keeps chunks in memory and
//! [`DiskChunkStore`] keeps one file per chunk in a node directory.

pub mod disk_store;
pub mod mem_store;

use std::fmt::Debug;

use bytes::Bytes;
use fslite_types::{ChunkId, NodeStatus, Result};

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Chunk storage backing a single node.
///
/// Usage figures are always derived from the chunks actually held so that
/// they cannot drift from reality.
pub trait ChunkStore: Send + Sync + Debug {
    /// Read a whole chunk. Missing chunks fail with `Storage::ChunkNotFound`.
    fn read(&self, chunk_id: &ChunkId) -> Result<Bytes>;

    /// Store a chunk, replacing any previous content.
    fn write(&self, chunk_id: &ChunkId, data: Bytes) -> Result<()>;

    /// Delete a chunk. Returns whether it was present.
    fn remove(&self, chunk_id: &ChunkId) -> Result<bool>;

    fn contains(&self, chunk_id: &ChunkId) -> bool;

    /// Held chunks and their sizes, sorted by id.
    fn list(&self) -> Result<Vec<(ChunkId, u64)>>;

    /// Sum of held chunk sizes.
    fn used_bytes(&self) -> Result<u64> {
        Ok(self.list()?.iter().map(|(_, size)| size).sum())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    /// Remove every chunk. The status record is kept.
    fn clear(&self) -> Result<usize>;

    /// The persisted node status, if one was ever stored.
    fn load_status(&self) -> Result<Option<NodeStatus>> {
        Ok(None)
    }

    fn store_status(&self, _status: NodeStatus) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use disk_store::DiskChunkStore;
pub use mem_store::MemChunkStore;
