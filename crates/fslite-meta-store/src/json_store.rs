//! Manifest store persisted as a single pretty-printed JSON object
//! (`file_id -> manifest`).
//!
//! Several processes may share one metadata directory (the server daemon and
//! the admin tool do), so nothing is cached: every operation re-reads the
//! document while holding an advisory lock on `.metadata.lock`. Readers take
//! the lock shared, mutations take it exclusive and rewrite the file
//! atomically before releasing it.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use fslite_chunk_engine::{FileSummary, Manifest};
use fslite_types::{FileId, MetaCode, Result, Status, StatusCode};
use fslite_utils::file_utils;
use parking_lot::RwLock;

use crate::{not_found, prepare, ManifestStore};

pub const METADATA_FILE: &str = "metadata.json";
pub const LOCK_FILE: &str = ".metadata.lock";

type Document = BTreeMap<FileId, Manifest>;

#[derive(Debug)]
pub struct JsonManifestStore {
    path: PathBuf,
    lock_path: PathBuf,
    // Orders threads of this process; the file lock orders processes.
    local: RwLock<()>,
}

impl JsonManifestStore {
    /// Open `dir/metadata.json`, creating `dir` if needed. A missing file is
    /// an empty store. An unparseable document fails here rather than on
    /// first use.
    pub fn open(dir: &Path) -> Result<Self> {
        file_utils::ensure_dir(dir)?;
        let store = Self {
            path: dir.join(METADATA_FILE),
            lock_path: dir.join(LOCK_FILE),
            local: RwLock::new(()),
        };
        let files = store.read_locked(|doc| doc.len())?;
        tracing::debug!(path = %store.path.display(), files, "manifest store opened");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_file(&self, exclusive: bool) -> Result<File> {
        let io_failed = |e: std::io::Error| {
            Status::with_message(
                MetaCode::STORE_IO_FAILED,
                format!("{}: {}", self.lock_path.display(), e),
            )
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.lock_path)
            .map_err(io_failed)?;
        if exclusive {
            file.lock_exclusive().map_err(io_failed)?;
        } else {
            file.lock_shared().map_err(io_failed)?;
        }
        Ok(file)
    }

    fn load(&self) -> Result<Document> {
        match file_utils::read_file_opt(&self.path)? {
            None => Ok(BTreeMap::new()),
            Some(raw) => serde_json::from_slice(&raw).map_err(|e| {
                Status::with_message(
                    StatusCode::SERDE_INVALID_JSON,
                    format!("{}: {}", self.path.display(), e),
                )
            }),
        }
    }

    fn persist(&self, doc: &Document) -> Result<()> {
        let raw = serde_json::to_vec_pretty(doc).map_err(|e| {
            Status::with_message(StatusCode::SERDE_INVALID_JSON, e.to_string())
        })?;
        file_utils::atomic_write(&self.path, &raw).map_err(|e| {
            Status::with_message(
                MetaCode::STORE_IO_FAILED,
                e.message().unwrap_or_default().to_string(),
            )
        })
    }

    /// Run `f` over a fresh copy of the document.
    fn read_locked<R>(&self, f: impl FnOnce(&Document) -> R) -> Result<R> {
        let _local = self.local.read();
        let _lock = self.lock_file(false)?;
        Ok(f(&self.load()?))
    }

    /// Re-read the document, apply `f` and write it back, all under the
    /// exclusive lock. `f` returning `(_, false)` skips the write.
    fn mutate<R>(&self, f: impl FnOnce(&mut Document) -> (R, bool)) -> Result<R> {
        let _local = self.local.write();
        let _lock = self.lock_file(true)?;
        let mut doc = self.load()?;
        let (out, changed) = f(&mut doc);
        if changed {
            self.persist(&doc)?;
        }
        Ok(out)
    }
}

impl ManifestStore for JsonManifestStore {
    fn save(&self, manifest: &Manifest) -> Result<()> {
        let stored = prepare(manifest)?;
        self.mutate(|doc| {
            doc.insert(stored.file_id.clone(), stored);
            ((), true)
        })?;
        tracing::debug!(file_id = %manifest.file_id, "manifest saved");
        Ok(())
    }

    fn get(&self, file_id: &FileId) -> Result<Manifest> {
        self.read_locked(|doc| doc.get(file_id).cloned())?
            .ok_or_else(|| not_found(file_id))
    }

    fn list(&self) -> Result<Vec<FileSummary>> {
        self.read_locked(|doc| doc.values().map(Manifest::summary).collect())
    }

    fn delete(&self, file_id: &FileId) -> Result<bool> {
        self.mutate(|doc| {
            let removed = doc.remove(file_id).is_some();
            (removed, removed)
        })
    }

    fn clear(&self) -> Result<usize> {
        self.mutate(|doc| {
            let n = doc.len();
            doc.clear();
            (n, n > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fslite_chunk_engine::split_reader;

    #[test]
    fn test_roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let m = split_reader("notes.txt", &b"some content here"[..], 5).unwrap();
        {
            let store = JsonManifestStore::open(dir.path()).unwrap();
            store.save(&m).unwrap();
        }
        let store = JsonManifestStore::open(dir.path()).unwrap();
        let loaded = store.get(&m.file_id).unwrap();
        assert_eq!(loaded, m.without_data());
        assert_eq!(store.list().unwrap(), vec![m.summary()]);
    }

    #[test]
    fn test_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonManifestStore::open(dir.path()).unwrap();
        let m = split_reader("notes.txt", &b"abc"[..], 2).unwrap();
        store.save(&m).unwrap();

        let raw = std::fs::read_to_string(dir.path().join(METADATA_FILE)).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entry = &doc[m.file_id.as_str()];
        assert_eq!(entry["file_name"], "notes.txt");
        assert_eq!(entry["total_chunks"], 2);
        assert_eq!(entry["chunks"][1]["id"], format!("{}_1", m.file_id));
        assert_eq!(entry["chunks"][0]["primary_node"], "");
        assert!(entry["chunks"][0].get("data").is_none());
    }

    #[test]
    fn test_delete_and_clear_persist() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonManifestStore::open(dir.path()).unwrap();
        let a = split_reader("a", &b"1"[..], 2).unwrap();
        let b = split_reader("b", &b"2"[..], 2).unwrap();
        store.save(&a).unwrap();
        store.save(&b).unwrap();
        assert!(store.delete(&a.file_id).unwrap());
        assert!(!store.delete(&a.file_id).unwrap());

        let reopened = JsonManifestStore::open(dir.path()).unwrap();
        assert!(reopened.get(&a.file_id).unwrap_err().is_not_found());
        assert!(reopened.get(&b.file_id).is_ok());

        assert_eq!(reopened.clear().unwrap(), 1);
        let reopened = JsonManifestStore::open(dir.path()).unwrap();
        assert!(reopened.list().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(METADATA_FILE), b"{not json").unwrap();
        let err = JsonManifestStore::open(dir.path()).unwrap_err();
        assert_eq!(err.code(), StatusCode::SERDE_INVALID_JSON);
    }

    #[test]
    fn test_two_handles_see_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let first = JsonManifestStore::open(dir.path()).unwrap();
        let second = JsonManifestStore::open(dir.path()).unwrap();
        let a = split_reader("a", &b"1"[..], 2).unwrap();
        let b = split_reader("b", &b"2"[..], 2).unwrap();

        first.save(&a).unwrap();
        assert!(second.get(&a.file_id).is_ok());

        // A save through one handle must not drop what the other wrote.
        second.save(&b).unwrap();
        first.save(&a).unwrap();
        let ids: Vec<_> = second.list().unwrap().into_iter().map(|s| s.file_id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a.file_id) && ids.contains(&b.file_id));

        assert!(second.delete(&a.file_id).unwrap());
        assert!(first.get(&a.file_id).unwrap_err().is_not_found());
        assert_eq!(first.list().unwrap(), vec![b.summary()]);
    }

    #[test]
    fn test_concurrent_saves_from_two_handles() {
        let dir = tempfile::tempdir().unwrap();
        let handles = [
            JsonManifestStore::open(dir.path()).unwrap(),
            JsonManifestStore::open(dir.path()).unwrap(),
        ];
        std::thread::scope(|s| {
            for (h, store) in handles.iter().enumerate() {
                s.spawn(move || {
                    for i in 0..20 {
                        let name = format!("f{}_{}", h, i);
                        let m = split_reader(&name, name.as_bytes(), 4).unwrap();
                        store.save(&m).unwrap();
                    }
                });
            }
        });
        let reopened = JsonManifestStore::open(dir.path()).unwrap();
        assert_eq!(reopened.list().unwrap().len(), 40);
    }
}
