//! Chunk and manifest records.
//!
//! A [`Manifest`] is the durable description of one uploaded file. Chunks
//! carry their raw bytes only between splitting and distribution; the
//! serialized form never contains data, and placements are written as node
//! names (`"node_2"`, or `""` when unplaced).

use bytes::Bytes;
use fslite_types::{make_error_msg, ChunkId, FileId, MetaCode, NodeId, Result};
use serde::{Deserialize, Serialize};

/// One fixed-size slice of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    #[serde(rename = "id")]
    pub chunk_id: ChunkId,
    pub index: u32,
    pub size: u64,
    /// Hex SHA-256 of exactly this chunk's bytes.
    #[serde(rename = "hash")]
    pub content_hash: String,
    #[serde(default, with = "placement")]
    pub primary_node: Option<NodeId>,
    #[serde(default, with = "placement")]
    pub replica_node: Option<NodeId>,
    #[serde(skip)]
    pub data: Option<Bytes>,
}

impl Chunk {
    /// Both placement slots, primary first.
    pub fn placements(&self) -> [Option<NodeId>; 2] {
        [self.primary_node, self.replica_node]
    }

    pub fn is_placed(&self) -> bool {
        matches!(
            (self.primary_node, self.replica_node),
            (Some(p), Some(r)) if p != r
        )
    }

    pub fn clear_placement(&mut self) {
        self.primary_node = None;
        self.replica_node = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub file_id: FileId,
    pub file_name: String,
    pub file_size: u64,
    pub chunk_size: u64,
    pub total_chunks: u32,
    /// Hex SHA-256 over all chunk bytes in index order.
    #[serde(rename = "full_hash")]
    pub full_content_hash: String,
    pub chunks: Vec<Chunk>,
}

impl Manifest {
    /// A copy with every chunk's raw bytes dropped.
    pub fn without_data(&self) -> Manifest {
        let mut stripped = self.clone();
        stripped.strip_data();
        stripped
    }

    pub fn strip_data(&mut self) {
        for chunk in &mut self.chunks {
            chunk.data = None;
        }
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            file_id: self.file_id.clone(),
            file_name: self.file_name.clone(),
            file_size: self.file_size,
            total_chunks: self.total_chunks,
        }
    }

    /// Check the structural invariants: chunk count matches, indices are
    /// `0..total_chunks` in order, chunk ids belong to this file and sizes
    /// add up to `file_size`.
    pub fn validate(&self) -> Result<()> {
        if self.total_chunks as usize != self.chunks.len() {
            return make_error_msg(
                MetaCode::INCONSISTENT,
                format!(
                    "manifest {}: total_chunks {} but {} chunks listed",
                    self.file_id,
                    self.total_chunks,
                    self.chunks.len()
                ),
            );
        }
        let mut total = 0u64;
        for (pos, chunk) in self.chunks.iter().enumerate() {
            if chunk.index as usize != pos {
                return make_error_msg(
                    MetaCode::INCONSISTENT,
                    format!(
                        "manifest {}: chunk at position {} has index {}",
                        self.file_id, pos, chunk.index
                    ),
                );
            }
            if !chunk.chunk_id.belongs_to(&self.file_id) {
                return make_error_msg(
                    MetaCode::INCONSISTENT,
                    format!("manifest {}: foreign chunk id {}", self.file_id, chunk.chunk_id),
                );
            }
            total += chunk.size;
        }
        if total != self.file_size {
            return make_error_msg(
                MetaCode::INCONSISTENT,
                format!(
                    "manifest {}: chunk sizes sum to {} but file_size is {}",
                    self.file_id, total, self.file_size
                ),
            );
        }
        Ok(())
    }
}

/// Listing view of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub file_id: FileId,
    pub file_name: String,
    pub file_size: u64,
    pub total_chunks: u32,
}

/// Serde adapter writing `Option<NodeId>` as `"node_<n>"` or `""`.
mod placement {
    use fslite_types::NodeId;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(node: &Option<NodeId>, s: S) -> Result<S::Ok, S::Error> {
        match node {
            Some(id) => s.collect_str(id),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NodeId>, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<NodeId>().map(Some).map_err(de::Error::custom)
    }
}
