//! In-memory manifest store backed by a `BTreeMap`.

use std::collections::BTreeMap;

use fslite_chunk_engine::{FileSummary, Manifest};
use fslite_types::{FileId, Result};
use parking_lot::RwLock;

use crate::{not_found, prepare, ManifestStore};

#[derive(Debug, Default)]
pub struct MemManifestStore {
    manifests: RwLock<BTreeMap<FileId, Manifest>>,
}

impl MemManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.manifests.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.read().is_empty()
    }
}

impl ManifestStore for MemManifestStore {
    fn save(&self, manifest: &Manifest) -> Result<()> {
        let stored = prepare(manifest)?;
        self.manifests.write().insert(stored.file_id.clone(), stored);
        Ok(())
    }

    fn get(&self, file_id: &FileId) -> Result<Manifest> {
        self.manifests
            .read()
            .get(file_id)
            .cloned()
            .ok_or_else(|| not_found(file_id))
    }

    fn list(&self) -> Result<Vec<FileSummary>> {
        Ok(self.manifests.read().values().map(Manifest::summary).collect())
    }

    fn delete(&self, file_id: &FileId) -> Result<bool> {
        Ok(self.manifests.write().remove(file_id).is_some())
    }

    fn clear(&self) -> Result<usize> {
        let mut guard = self.manifests.write();
        let n = guard.len();
        guard.clear();
        Ok(n)
    }
}
