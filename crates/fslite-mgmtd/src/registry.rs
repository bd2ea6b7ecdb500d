//! The fixed set of storage nodes and their operator-controlled status.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use fslite_storage_service::{ChunkStore, DiskChunkStore, MemChunkStore};
use fslite_types::{
    make_error_msg, ChunkId, MgmtdCode, NodeId, NodeStatus, Result, Status, StatusCode,
};
use serde::{Deserialize, Serialize};

/// Point-in-time view of one node. Usage is recomputed from the chunks the
/// node actually holds each time a `NodeInfo` is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub node_id: NodeId,
    pub status: NodeStatus,
    pub used_storage: u64,
    pub max_storage: u64,
    pub chunk_count: usize,
}

impl NodeInfo {
    pub fn free_storage(&self) -> u64 {
        self.max_storage.saturating_sub(self.used_storage)
    }

    pub fn fits(&self, size: u64) -> bool {
        self.used_storage.saturating_add(size) <= self.max_storage
    }
}

/// Registry of storage nodes, iterated in a fixed order (ascending node id).
///
/// Status is written through to each node's store so that it survives
/// restarts and is shared with other processes; the `DashMap` holds the last
/// value seen for nodes whose store keeps no record.
#[derive(Debug)]
pub struct NodeRegistry {
    order: Vec<NodeId>,
    stores: DashMap<NodeId, Arc<dyn ChunkStore>>,
    status: DashMap<NodeId, NodeStatus>,
    max_storage: u64,
    placement: Mutex<()>,
}

impl NodeRegistry {
    /// Build a registry over the given stores. Nodes without a persisted
    /// status start ONLINE.
    pub fn with_stores(
        stores: Vec<(NodeId, Arc<dyn ChunkStore>)>,
        max_storage: u64,
    ) -> Result<Self> {
        let mut registry = Self {
            order: Vec::with_capacity(stores.len()),
            stores: DashMap::new(),
            status: DashMap::new(),
            max_storage,
            placement: Mutex::new(()),
        };
        for (node_id, store) in stores {
            if registry.stores.contains_key(&node_id) {
                return make_error_msg(
                    StatusCode::INVALID_ARG,
                    format!("duplicate node {}", node_id),
                );
            }
            let status = store.load_status()?.unwrap_or_default();
            registry.order.push(node_id);
            registry.stores.insert(node_id, store);
            registry.status.insert(node_id, status);
        }
        registry.order.sort();
        tracing::debug!(nodes = registry.order.len(), max_storage, "node registry ready");
        Ok(registry)
    }

    /// `count` in-memory nodes `node_0..node_{count-1}`.
    pub fn in_memory(count: u32, max_storage: u64) -> Self {
        let order: Vec<NodeId> = (0..count).map(NodeId).collect();
        let stores = DashMap::new();
        let status = DashMap::new();
        for &node_id in &order {
            stores.insert(node_id, Arc::new(MemChunkStore::new()) as Arc<dyn ChunkStore>);
            status.insert(node_id, NodeStatus::Online);
        }
        Self {
            order,
            stores,
            status,
            max_storage,
            placement: Mutex::new(()),
        }
    }

    /// `count` directory-backed nodes at `root/node_<n>`.
    pub fn on_disk(root: &Path, count: u32, max_storage: u64) -> Result<Self> {
        let mut stores = Vec::with_capacity(count as usize);
        for n in 0..count {
            let node_id = NodeId(n);
            let store = DiskChunkStore::open(root.join(node_id.to_string()))?;
            stores.push((node_id, Arc::new(store) as Arc<dyn ChunkStore>));
        }
        Self::with_stores(stores, max_storage)
    }

    pub fn max_storage(&self) -> u64 {
        self.max_storage
    }

    /// Node ids in registry order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    fn store(&self, node_id: NodeId) -> Result<Arc<dyn ChunkStore>> {
        self.stores
            .get(&node_id)
            .map(|s| Arc::clone(s.value()))
            .ok_or_else(|| not_found(node_id))
    }

    /// Held by anyone who checks capacity and then writes new copies, so
    /// two writers cannot both claim the same free space in this process.
    pub fn placement_lock(&self) -> MutexGuard<'_, ()> {
        self.placement.lock()
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.stores.contains_key(&node_id)
    }

    /// Current status, read through the node's store so that changes made
    /// by another process sharing the data directory are picked up. Falls
    /// back to the last known value when the store has no record or cannot
    /// be read.
    pub fn status(&self, node_id: NodeId) -> Result<NodeStatus> {
        let store = self.store(node_id)?;
        match store.load_status() {
            Ok(Some(status)) => {
                self.status.insert(node_id, status);
                return Ok(status);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(node = %node_id, error = %e, "using cached node status"),
        }
        Ok(self
            .status
            .get(&node_id)
            .map(|s| *s.value())
            .unwrap_or_default())
    }

    /// Whether the node exists and is ONLINE.
    pub fn is_online(&self, node_id: NodeId) -> bool {
        matches!(self.status(node_id), Ok(NodeStatus::Online))
    }

    pub fn get_node(&self, node_id: NodeId) -> Result<NodeInfo> {
        let store = self.store(node_id)?;
        let chunks = store.list()?;
        Ok(NodeInfo {
            node_id,
            status: self.status(node_id)?,
            used_storage: chunks.iter().map(|(_, size)| size).sum(),
            max_storage: self.max_storage,
            chunk_count: chunks.len(),
        })
    }

    /// Every node in registry order. Fails if any node cannot be inspected.
    pub fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        self.order.iter().map(|&id| self.get_node(id)).collect()
    }

    /// ONLINE nodes in registry order. Nodes that cannot be inspected are
    /// skipped with a warning.
    pub fn online_nodes(&self) -> Vec<NodeInfo> {
        self.order
            .iter()
            .filter(|&&id| self.is_online(id))
            .filter_map(|&id| match self.get_node(id) {
                Ok(info) => Some(info),
                Err(e) => {
                    tracing::warn!(node = %id, error = %e, "skipping unreadable node");
                    None
                }
            })
            .collect()
    }

    /// Change a node's status and persist it. The in-memory status only
    /// changes once the store has accepted the new value.
    pub fn set_status(&self, node_id: NodeId, status: NodeStatus) -> Result<NodeStatus> {
        let store = self.store(node_id)?;
        store.store_status(status).map_err(|e| {
            Status::with_message(
                MgmtdCode::NODE_STATUS_PERSIST_FAILED,
                format!("node {}: {}", node_id, e),
            )
        })?;
        let previous = self
            .status
            .insert(node_id, status)
            .unwrap_or_default();
        tracing::info!(node = %node_id, from = %previous, to = %status, "node status changed");
        Ok(previous)
    }

    pub fn read_chunk(&self, node_id: NodeId, chunk_id: &ChunkId) -> Result<Bytes> {
        self.store(node_id)?.read(chunk_id)
    }

    pub fn write_chunk(&self, node_id: NodeId, chunk_id: &ChunkId, data: Bytes) -> Result<()> {
        self.store(node_id)?.write(chunk_id, data)
    }

    pub fn remove_chunk(&self, node_id: NodeId, chunk_id: &ChunkId) -> Result<bool> {
        self.store(node_id)?.remove(chunk_id)
    }

    pub fn holds_chunk(&self, node_id: NodeId, chunk_id: &ChunkId) -> bool {
        self.store(node_id)
            .map(|s| s.contains(chunk_id))
            .unwrap_or(false)
    }

    /// Whether `chunk_id` can be written to the node with `size` bytes. A
    /// copy the node already holds is replaced, so its bytes are not counted
    /// twice.
    pub fn has_capacity_for(&self, node_id: NodeId, chunk_id: &ChunkId, size: u64) -> bool {
        let Ok(store) = self.store(node_id) else {
            return false;
        };
        match store.list() {
            Ok(chunks) => {
                let used: u64 = chunks
                    .iter()
                    .filter(|(id, _)| id != chunk_id)
                    .map(|(_, s)| s)
                    .sum();
                used.saturating_add(size) <= self.max_storage
            }
            Err(_) => false,
        }
    }

    /// Drop every chunk on every node, keeping status records.
    pub fn clear_all(&self) -> Result<usize> {
        let mut removed = 0;
        for &id in &self.order {
            removed += self.store(id)?.clear()?;
        }
        Ok(removed)
    }
}

fn not_found(node_id: NodeId) -> Status {
    Status::with_message(MgmtdCode::NODE_NOT_FOUND, format!("node {} not found", node_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(s: &str) -> ChunkId {
        ChunkId::new(s)
    }

    #[test]
    fn test_in_memory_defaults() {
        let reg = NodeRegistry::in_memory(4, 1000);
        assert_eq!(reg.node_ids(), &[NodeId(0), NodeId(1), NodeId(2), NodeId(3)]);
        let nodes = reg.list_nodes().unwrap();
        assert_eq!(nodes.len(), 4);
        assert!(nodes.iter().all(|n| n.status == NodeStatus::Online));
        assert!(nodes.iter().all(|n| n.used_storage == 0 && n.chunk_count == 0));
        assert_eq!(nodes[0].max_storage, 1000);
    }

    #[test]
    fn test_get_unknown_node() {
        let reg = NodeRegistry::in_memory(2, 1000);
        let err = reg.get_node(NodeId(7)).unwrap_err();
        assert_eq!(err.code(), MgmtdCode::NODE_NOT_FOUND);
        assert!(reg.set_status(NodeId(7), NodeStatus::Offline).is_err());
        assert!(reg.read_chunk(NodeId(7), &chunk("a_0")).unwrap_err().is_not_found());
        assert!(!reg.is_online(NodeId(7)));
    }

    #[test]
    fn test_usage_is_recomputed() {
        let reg = NodeRegistry::in_memory(2, 1000);
        reg.write_chunk(NodeId(0), &chunk("a_0"), Bytes::from(vec![0u8; 300])).unwrap();
        reg.write_chunk(NodeId(0), &chunk("a_1"), Bytes::from(vec![0u8; 200])).unwrap();
        let info = reg.get_node(NodeId(0)).unwrap();
        assert_eq!(info.used_storage, 500);
        assert_eq!(info.chunk_count, 2);
        assert_eq!(info.free_storage(), 500);

        reg.remove_chunk(NodeId(0), &chunk("a_0")).unwrap();
        assert_eq!(reg.get_node(NodeId(0)).unwrap().used_storage, 200);
    }

    #[test]
    fn test_has_capacity_boundary() {
        let reg = NodeRegistry::in_memory(1, 100);
        reg.write_chunk(NodeId(0), &chunk("a_0"), Bytes::from(vec![0u8; 60])).unwrap();
        assert!(reg.has_capacity_for(NodeId(0), &chunk("a_1"), 40));
        assert!(!reg.has_capacity_for(NodeId(0), &chunk("a_1"), 41));
        assert!(!reg.has_capacity_for(NodeId(9), &chunk("a_1"), 1));
    }

    #[test]
    fn test_has_capacity_for_replaced_copy() {
        let reg = NodeRegistry::in_memory(1, 100);
        reg.write_chunk(NodeId(0), &chunk("a_0"), Bytes::from(vec![0u8; 60])).unwrap();
        // Rewriting a_0 in place needs no extra room.
        assert!(reg.has_capacity_for(NodeId(0), &chunk("a_0"), 60));
        assert!(reg.has_capacity_for(NodeId(0), &chunk("a_0"), 100));
        assert!(!reg.has_capacity_for(NodeId(0), &chunk("a_0"), 101));
        assert!(!reg.has_capacity_for(NodeId(0), &chunk("a_1"), 60));
    }

    #[test]
    fn test_status_read_through_shared_store() {
        let dir = tempfile::tempdir().unwrap();
        let server = NodeRegistry::on_disk(dir.path(), 2, 1000).unwrap();
        let admin = NodeRegistry::on_disk(dir.path(), 2, 1000).unwrap();
        admin.set_status(NodeId(1), NodeStatus::Offline).unwrap();
        assert_eq!(server.status(NodeId(1)).unwrap(), NodeStatus::Offline);
        assert!(!server.is_online(NodeId(1)));

        admin.set_status(NodeId(1), NodeStatus::Online).unwrap();
        assert!(server.is_online(NodeId(1)));
    }

    #[test]
    fn test_status_changes_filter_online() {
        let reg = NodeRegistry::in_memory(3, 100);
        let prev = reg.set_status(NodeId(1), NodeStatus::Offline).unwrap();
        assert_eq!(prev, NodeStatus::Online);
        let online: Vec<_> = reg.online_nodes().iter().map(|n| n.node_id).collect();
        assert_eq!(online, vec![NodeId(0), NodeId(2)]);
        assert_eq!(reg.status(NodeId(1)).unwrap(), NodeStatus::Offline);
    }

    #[test]
    fn test_clear_all_keeps_status() {
        let reg = NodeRegistry::in_memory(2, 100);
        reg.write_chunk(NodeId(0), &chunk("a_0"), Bytes::from_static(b"x")).unwrap();
        reg.write_chunk(NodeId(1), &chunk("a_0"), Bytes::from_static(b"x")).unwrap();
        reg.set_status(NodeId(1), NodeStatus::Offline).unwrap();
        assert_eq!(reg.clear_all().unwrap(), 2);
        assert!(!reg.holds_chunk(NodeId(0), &chunk("a_0")));
        assert_eq!(reg.status(NodeId(1)).unwrap(), NodeStatus::Offline);
    }

    #[test]
    fn test_on_disk_status_persists() {
        let dir = tempfile::tempdir().unwrap();
        {
            let reg = NodeRegistry::on_disk(dir.path(), 4, 1000).unwrap();
            reg.set_status(NodeId(2), NodeStatus::Offline).unwrap();
            reg.write_chunk(NodeId(3), &chunk("a_0"), Bytes::from_static(b"abc")).unwrap();
        }
        assert!(dir.path().join("node_2").join(".status").is_file());
        assert!(dir.path().join("node_3").join("a_0").is_file());

        let reg = NodeRegistry::on_disk(dir.path(), 4, 1000).unwrap();
        assert_eq!(reg.status(NodeId(2)).unwrap(), NodeStatus::Offline);
        assert_eq!(reg.status(NodeId(0)).unwrap(), NodeStatus::Online);
        let info = reg.get_node(NodeId(3)).unwrap();
        assert_eq!((info.used_storage, info.chunk_count), (3, 1));
    }

    #[test]
    fn test_duplicate_nodes_rejected() {
        let stores: Vec<(NodeId, Arc<dyn ChunkStore>)> = vec![
            (NodeId(0), Arc::new(MemChunkStore::new())),
            (NodeId(0), Arc::new(MemChunkStore::new())),
        ];
        assert!(NodeRegistry::with_stores(stores, 10).is_err());
    }
}
