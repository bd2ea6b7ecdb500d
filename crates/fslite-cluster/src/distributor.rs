//! Chunk placement with all-or-nothing semantics.

use std::sync::Arc;

use fslite_chunk_engine::{Chunk, Manifest, REPLICATION_FACTOR};
use fslite_mgmtd::{NodeInfo, NodeRegistry};
use fslite_types::{make_error_msg, ChunkId, NodeId, Result, Status, StorageCode};
use rand::seq::SliceRandom;

/// Copies written during one distribution attempt.
#[derive(Debug, Default)]
pub struct UndoLog {
    written: Vec<(NodeId, ChunkId)>,
}

impl UndoLog {
    pub fn record(&mut self, node: NodeId, chunk_id: ChunkId) {
        self.written.push((node, chunk_id));
    }

    pub fn len(&self) -> usize {
        self.written.len()
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }

    /// Delete every recorded copy, newest first. Failures are logged; the
    /// caller is already returning an error.
    pub fn rollback(self, registry: &NodeRegistry) {
        for (node, chunk_id) in self.written.into_iter().rev() {
            if let Err(e) = registry.remove_chunk(node, &chunk_id) {
                tracing::warn!(node = %node, chunk = %chunk_id, error = %e, "rollback could not remove chunk");
            }
        }
    }
}

/// Places every chunk of a manifest on two distinct nodes.
pub struct Distributor {
    registry: Arc<NodeRegistry>,
}

impl Distributor {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self { registry }
    }

    /// Write each chunk to a primary and a replica and record the placement.
    ///
    /// On any failure every copy written by this call is removed and all
    /// placements are cleared before the error is returned.
    pub fn distribute(&self, manifest: &mut Manifest) -> Result<()> {
        let _guard = self.registry.placement_lock();
        let mut undo = UndoLog::default();
        let mut failure = None;
        for chunk in manifest.chunks.iter_mut() {
            if let Err(e) = self.place_chunk(chunk, &mut undo) {
                failure = Some((chunk.chunk_id.clone(), e));
                break;
            }
        }
        if let Some((chunk_id, e)) = failure {
            tracing::warn!(
                file_id = %manifest.file_id,
                chunk = %chunk_id,
                written = undo.len(),
                error = %e,
                "distribution failed, rolling back"
            );
            undo.rollback(&self.registry);
            for chunk in manifest.chunks.iter_mut() {
                chunk.clear_placement();
            }
            return Err(e);
        }
        tracing::info!(
            file_id = %manifest.file_id,
            chunks = manifest.total_chunks,
            "file distributed"
        );
        Ok(())
    }

    fn place_chunk(&self, chunk: &mut Chunk, undo: &mut UndoLog) -> Result<()> {
        let Some(data) = chunk.data.clone() else {
            return make_error_msg(
                StorageCode::CHUNK_DATA_MISSING,
                format!("chunk {} carries no data", chunk.chunk_id),
            );
        };
        let (primary, replica) = self.select_nodes(chunk)?;

        self.registry.write_chunk(primary, &chunk.chunk_id, data.clone())?;
        undo.record(primary, chunk.chunk_id.clone());
        self.registry.write_chunk(replica, &chunk.chunk_id, data)?;
        undo.record(replica, chunk.chunk_id.clone());

        chunk.primary_node = Some(primary);
        chunk.replica_node = Some(replica);
        tracing::debug!(chunk = %chunk.chunk_id, %primary, %replica, "chunk placed");
        Ok(())
    }

    /// Primary is the least-loaded eligible node (lowest id on ties); the
    /// replica is drawn uniformly from the rest.
    fn select_nodes(&self, chunk: &Chunk) -> Result<(NodeId, NodeId)> {
        let online = self.registry.online_nodes();
        if online.len() < REPLICATION_FACTOR {
            return make_error_msg(
                StorageCode::INSUFFICIENT_REPLICAS,
                format!(
                    "chunk {}: {} online nodes, need {}",
                    chunk.chunk_id,
                    online.len(),
                    REPLICATION_FACTOR
                ),
            );
        }
        let eligible: Vec<NodeInfo> = online.into_iter().filter(|n| n.fits(chunk.size)).collect();
        if eligible.len() < REPLICATION_FACTOR {
            return make_error_msg(
                StorageCode::INSUFFICIENT_CAPACITY,
                format!(
                    "chunk {} ({} bytes): {} nodes with room, need {}",
                    chunk.chunk_id,
                    chunk.size,
                    eligible.len(),
                    REPLICATION_FACTOR
                ),
            );
        }

        let primary = eligible
            .iter()
            .min_by_key(|n| (n.chunk_count, n.node_id))
            .map(|n| n.node_id)
            .ok_or_else(|| Status::new(StorageCode::INSUFFICIENT_CAPACITY))?;
        let rest: Vec<NodeId> = eligible
            .iter()
            .map(|n| n.node_id)
            .filter(|&id| id != primary)
            .collect();
        let replica = *rest
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| Status::new(StorageCode::INSUFFICIENT_CAPACITY))?;
        Ok((primary, replica))
    }
}
