//! Directory-backed chunk store: one file per chunk, named by chunk id.
//!
//! Hidden entries are never treated as chunks. The node status lives in a
//! `.status` file holding `ONLINE` or `OFFLINE`.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use fslite_types::{make_error_msg, ChunkId, NodeStatus, Result, Status, StatusCode, StorageCode};
use fslite_utils::file_utils;

use crate::ChunkStore;

const STATUS_FILE: &str = ".status";

#[derive(Debug)]
pub struct DiskChunkStore {
    dir: PathBuf,
}

impl DiskChunkStore {
    /// Open (creating if needed) the node directory `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        file_utils::ensure_dir(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn chunk_path(&self, chunk_id: &ChunkId) -> Result<PathBuf> {
        let name = chunk_id.as_str();
        if name.is_empty()
            || file_utils::is_hidden(name)
            || name.contains(['/', '\\'])
        {
            return make_error_msg(
                StatusCode::INVALID_ARG,
                format!("invalid chunk id {:?}", name),
            );
        }
        Ok(self.dir.join(name))
    }
}

impl ChunkStore for DiskChunkStore {
    fn read(&self, chunk_id: &ChunkId) -> Result<Bytes> {
        let path = self.chunk_path(chunk_id)?;
        match file_utils::read_file_opt(&path) {
            Ok(Some(data)) => Ok(Bytes::from(data)),
            Ok(None) => make_error_msg(
                StorageCode::CHUNK_NOT_FOUND,
                format!("chunk {} not found in {}", chunk_id, self.dir.display()),
            ),
            Err(e) => Err(Status::with_message(
                StorageCode::CHUNK_READ_FAILED,
                e.message().unwrap_or_default().to_string(),
            )),
        }
    }

    fn write(&self, chunk_id: &ChunkId, data: Bytes) -> Result<()> {
        let path = self.chunk_path(chunk_id)?;
        file_utils::atomic_write(&path, &data).map_err(|e| {
            Status::with_message(
                StorageCode::CHUNK_WRITE_FAILED,
                e.message().unwrap_or_default().to_string(),
            )
        })
    }

    fn remove(&self, chunk_id: &ChunkId) -> Result<bool> {
        let path = self.chunk_path(chunk_id)?;
        file_utils::remove_file_if_exists(&path).map_err(|e| {
            Status::with_message(
                StorageCode::CHUNK_REMOVE_FAILED,
                e.message().unwrap_or_default().to_string(),
            )
        })
    }

    fn contains(&self, chunk_id: &ChunkId) -> bool {
        self.chunk_path(chunk_id)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    fn list(&self) -> Result<Vec<(ChunkId, u64)>> {
        Ok(file_utils::list_visible_files(&self.dir)?
            .into_iter()
            .map(|(name, _, size)| (ChunkId::new(name), size))
            .collect())
    }

    fn clear(&self) -> Result<usize> {
        let files = file_utils::list_visible_files(&self.dir)?;
        let mut removed = 0;
        for (_, path, _) in files {
            if file_utils::remove_file_if_exists(&path)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn load_status(&self) -> Result<Option<NodeStatus>> {
        match file_utils::read_file_opt(&self.dir.join(STATUS_FILE))? {
            None => Ok(None),
            Some(raw) => {
                let text = String::from_utf8_lossy(&raw);
                text.parse::<NodeStatus>().map(Some)
            }
        }
    }

    fn store_status(&self, status: NodeStatus) -> Result<()> {
        file_utils::atomic_write(&self.dir.join(STATUS_FILE), status.as_str().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fslite_types::MgmtdCode;

    fn id(s: &str) -> ChunkId {
        ChunkId::new(s)
    }

    #[test]
    fn test_write_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskChunkStore::open(dir.path().join("node_0")).unwrap();
        store.write(&id("abc_0"), Bytes::from_static(b"payload")).unwrap();
        assert!(store.dir().join("abc_0").is_file());
        assert_eq!(&store.read(&id("abc_0")).unwrap()[..], b"payload");
        assert!(store.contains(&id("abc_0")));

        assert!(store.remove(&id("abc_0")).unwrap());
        assert!(!store.remove(&id("abc_0")).unwrap());
        let err = store.read(&id("abc_0")).unwrap_err();
        assert_eq!(err.code(), StorageCode::CHUNK_NOT_FOUND);
    }

    #[test]
    fn test_status_file_is_not_a_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskChunkStore::open(dir.path()).unwrap();
        store.store_status(NodeStatus::Offline).unwrap();
        store.write(&id("abc_0"), Bytes::from(vec![1u8; 100])).unwrap();

        assert_eq!(store.list().unwrap(), vec![(id("abc_0"), 100)]);
        assert_eq!(store.used_bytes().unwrap(), 100);
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join(".status")).unwrap(),
            "OFFLINE"
        );
    }

    #[test]
    fn test_status_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = DiskChunkStore::open(dir.path()).unwrap();
            assert_eq!(store.load_status().unwrap(), None);
            store.store_status(NodeStatus::Offline).unwrap();
        }
        let store = DiskChunkStore::open(dir.path()).unwrap();
        assert_eq!(store.load_status().unwrap(), Some(NodeStatus::Offline));
    }

    #[test]
    fn test_garbage_status_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".status"), "MAYBE").unwrap();
        let store = DiskChunkStore::open(dir.path()).unwrap();
        let err = store.load_status().unwrap_err();
        assert_eq!(err.code(), MgmtdCode::INVALID_NODE_STATUS);
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskChunkStore::open(dir.path()).unwrap();
        for bad in ["../escape", ".status", "", "a\\b"] {
            let err = store.write(&id(bad), Bytes::from_static(b"x")).unwrap_err();
            assert_eq!(err.code(), StatusCode::INVALID_ARG, "{:?}", bad);
            assert!(!store.contains(&id(bad)));
        }
    }

    #[test]
    fn test_clear_keeps_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskChunkStore::open(dir.path()).unwrap();
        store.store_status(NodeStatus::Online).unwrap();
        store.write(&id("a_0"), Bytes::from_static(b"1")).unwrap();
        store.write(&id("a_1"), Bytes::from_static(b"2")).unwrap();
        assert_eq!(store.clear().unwrap(), 2);
        assert_eq!(store.len().unwrap(), 0);
        assert_eq!(store.load_status().unwrap(), Some(NodeStatus::Online));
    }
}
