//! Per-copy probing shared by scan, repair, reconstruction and verification.
//!
//! Unreachable or unreadable copies are ordinary outcomes here, never
//! errors: callers fold them into their counts and move on.

use bytes::Bytes;
use fslite_chunk_engine::{hash, Chunk};
use fslite_mgmtd::NodeRegistry;
use fslite_types::{NodeId, Status, StorageCode};

/// Why a copy could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    /// The chunk has no node recorded in this slot.
    Unplaced,
    /// The node is unknown or not ONLINE.
    Offline,
    /// The node is ONLINE but the read failed.
    ReadFailed(String),
}

/// Result of reading and hash-checking one copy of a chunk.
#[derive(Debug, Clone)]
pub enum ReplicaProbe {
    Verified(Bytes),
    Corrupted(Bytes),
    Unavailable(Unavailable),
}

impl ReplicaProbe {
    pub fn is_verified(&self) -> bool {
        matches!(self, ReplicaProbe::Verified(_))
    }

    pub fn is_corrupted(&self) -> bool {
        matches!(self, ReplicaProbe::Corrupted(_))
    }
}

/// Read the copy of `chunk` on `node`, if that node is ONLINE, and check it
/// against the chunk's recorded hash.
pub fn probe_replica(registry: &NodeRegistry, node: Option<NodeId>, chunk: &Chunk) -> ReplicaProbe {
    let Some(node) = node else {
        return ReplicaProbe::Unavailable(Unavailable::Unplaced);
    };
    if !registry.is_online(node) {
        return ReplicaProbe::Unavailable(Unavailable::Offline);
    }
    match registry.read_chunk(node, &chunk.chunk_id) {
        Ok(data) if hash::verify(&data, &chunk.content_hash) => ReplicaProbe::Verified(data),
        Ok(data) => ReplicaProbe::Corrupted(data),
        Err(e) => ReplicaProbe::Unavailable(Unavailable::ReadFailed(e.to_string())),
    }
}

/// Replication state of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChunkState {
    Healthy,
    UnderReplicated,
    Missing,
    Corrupted,
}

impl ChunkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkState::Healthy => "HEALTHY",
            ChunkState::UnderReplicated => "UNDER_REPLICATED",
            ChunkState::Missing => "MISSING",
            ChunkState::Corrupted => "CORRUPTED",
        }
    }
}

impl std::fmt::Display for ChunkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probe both placement slots of a chunk.
#[derive(Debug, Clone)]
pub struct ChunkProbe {
    pub primary: ReplicaProbe,
    pub replica: ReplicaProbe,
}

impl ChunkProbe {
    pub fn run(registry: &NodeRegistry, chunk: &Chunk) -> Self {
        Self {
            primary: probe_replica(registry, chunk.primary_node, chunk),
            replica: probe_replica(registry, chunk.replica_node, chunk),
        }
    }

    pub fn copies_available(&self) -> usize {
        [&self.primary, &self.replica]
            .iter()
            .filter(|p| p.is_verified())
            .count()
    }

    pub fn corrupted(&self) -> bool {
        self.primary.is_corrupted() || self.replica.is_corrupted()
    }

    /// Corruption outranks copy counting.
    pub fn state(&self) -> ChunkState {
        if self.corrupted() {
            return ChunkState::Corrupted;
        }
        match self.copies_available() {
            0 => ChunkState::Missing,
            1 => ChunkState::UnderReplicated,
            _ => ChunkState::Healthy,
        }
    }

    /// Nodes holding a verified copy, primary first, without duplicates,
    /// paired with the verified bytes.
    pub fn healthy_sources(&self, chunk: &Chunk) -> Vec<(NodeId, Bytes)> {
        let mut out: Vec<(NodeId, Bytes)> = Vec::with_capacity(2);
        for (slot, probe) in [(chunk.primary_node, &self.primary), (chunk.replica_node, &self.replica)] {
            if let (Some(node), ReplicaProbe::Verified(data)) = (slot, probe) {
                if !out.iter().any(|(n, _)| *n == node) {
                    out.push((node, data.clone()));
                }
            }
        }
        out
    }
}

/// Where a chunk's bytes came from during reconstruction.
#[derive(Debug, Clone)]
pub enum ChunkFetch {
    /// A copy whose hash matches.
    Verified { source: NodeId, data: Bytes },
    /// Only copies with a wrong hash could be read; the first one is kept.
    Mismatched { source: NodeId, data: Bytes },
    /// No copy could be read.
    Unavailable,
}

/// Fetch a chunk for reassembly: the primary if it is ONLINE and readable,
/// otherwise the replica. A copy with a wrong hash is only used when no
/// matching copy can be read.
pub fn fetch_with_fallback(registry: &NodeRegistry, chunk: &Chunk) -> ChunkFetch {
    let mut mismatched = None;
    for slot in chunk.placements() {
        match probe_replica(registry, slot, chunk) {
            ReplicaProbe::Verified(data) => {
                if let Some(source) = slot {
                    return ChunkFetch::Verified { source, data };
                }
            }
            ReplicaProbe::Corrupted(data) => {
                let status = Status::with_message(
                    StorageCode::CHECKSUM_MISMATCH,
                    format!("chunk {} on {:?}", chunk.chunk_id, slot),
                );
                tracing::warn!(error = %status, "chunk copy failed hash check");
                if mismatched.is_none() {
                    mismatched = slot.map(|source| (source, data));
                }
            }
            ReplicaProbe::Unavailable(reason) => {
                tracing::debug!(chunk = %chunk.chunk_id, node = ?slot, ?reason, "chunk copy unavailable");
            }
        }
    }
    match mismatched {
        Some((source, data)) => ChunkFetch::Mismatched { source, data },
        None => ChunkFetch::Unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fslite_chunk_engine::hash_bytes;
    use fslite_types::{ChunkId, NodeStatus};

    fn placed_chunk(data: &[u8], primary: u32, replica: u32) -> Chunk {
        Chunk {
            chunk_id: ChunkId::new("f_0"),
            index: 0,
            size: data.len() as u64,
            content_hash: hash_bytes(data),
            primary_node: Some(NodeId(primary)),
            replica_node: Some(NodeId(replica)),
            data: None,
        }
    }

    fn registry_with(chunk: &Chunk, copies: &[(u32, &'static [u8])]) -> NodeRegistry {
        let reg = NodeRegistry::in_memory(4, 1 << 20);
        for (node, data) in copies {
            reg.write_chunk(NodeId(*node), &chunk.chunk_id, Bytes::from_static(data))
                .unwrap();
        }
        reg
    }

    #[test]
    fn test_healthy_chunk() {
        let chunk = placed_chunk(b"good", 0, 1);
        let reg = registry_with(&chunk, &[(0, b"good"), (1, b"good")]);
        let probe = ChunkProbe::run(&reg, &chunk);
        assert_eq!(probe.copies_available(), 2);
        assert_eq!(probe.state(), ChunkState::Healthy);
        assert_eq!(probe.healthy_sources(&chunk).len(), 2);
    }

    #[test]
    fn test_offline_copy_is_unavailable() {
        let chunk = placed_chunk(b"good", 0, 1);
        let reg = registry_with(&chunk, &[(0, b"good"), (1, b"good")]);
        reg.set_status(NodeId(1), NodeStatus::Offline).unwrap();
        let probe = ChunkProbe::run(&reg, &chunk);
        assert!(matches!(probe.replica, ReplicaProbe::Unavailable(Unavailable::Offline)));
        assert_eq!(probe.state(), ChunkState::UnderReplicated);
    }

    #[test]
    fn test_missing_copy_and_unplaced_slot() {
        let mut chunk = placed_chunk(b"good", 0, 1);
        chunk.replica_node = None;
        let reg = registry_with(&chunk, &[]);
        let probe = ChunkProbe::run(&reg, &chunk);
        assert!(matches!(probe.primary, ReplicaProbe::Unavailable(Unavailable::ReadFailed(_))));
        assert!(matches!(probe.replica, ReplicaProbe::Unavailable(Unavailable::Unplaced)));
        assert_eq!(probe.state(), ChunkState::Missing);
    }

    #[test]
    fn test_corruption_outranks_counts() {
        let chunk = placed_chunk(b"good", 0, 1);
        let reg = registry_with(&chunk, &[(0, b"evil"), (1, b"good")]);
        let probe = ChunkProbe::run(&reg, &chunk);
        assert_eq!(probe.copies_available(), 1);
        assert_eq!(probe.state(), ChunkState::Corrupted);
        let sources = probe.healthy_sources(&chunk);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].0, NodeId(1));
    }

    #[test]
    fn test_fetch_prefers_primary_then_replica() {
        let chunk = placed_chunk(b"good", 2, 3);
        let reg = registry_with(&chunk, &[(2, b"good"), (3, b"good")]);
        assert!(matches!(
            fetch_with_fallback(&reg, &chunk),
            ChunkFetch::Verified { source: NodeId(2), .. }
        ));

        reg.set_status(NodeId(2), NodeStatus::Offline).unwrap();
        assert!(matches!(
            fetch_with_fallback(&reg, &chunk),
            ChunkFetch::Verified { source: NodeId(3), .. }
        ));

        reg.set_status(NodeId(3), NodeStatus::Offline).unwrap();
        assert!(matches!(fetch_with_fallback(&reg, &chunk), ChunkFetch::Unavailable));
    }

    #[test]
    fn test_fetch_skips_corrupted_primary() {
        let chunk = placed_chunk(b"good", 0, 1);
        let reg = registry_with(&chunk, &[(0, b"evil"), (1, b"good")]);
        match fetch_with_fallback(&reg, &chunk) {
            ChunkFetch::Verified { source, data } => {
                assert_eq!(source, NodeId(1));
                assert_eq!(&data[..], b"good");
            }
            other => panic!("unexpected {:?}", other),
        }

        let reg = registry_with(&chunk, &[(0, b"evil")]);
        assert!(matches!(
            fetch_with_fallback(&reg, &chunk),
            ChunkFetch::Mismatched { source: NodeId(0), .. }
        ));
    }
}
