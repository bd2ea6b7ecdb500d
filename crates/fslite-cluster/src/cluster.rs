//! The `Cluster` facade: one place that owns the node registry, manifest
//! store, placement, health, reconstruction and the recency cache, and
//! exposes the operations the server and the admin tool call.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fslite_chunk_engine::{split_file, split_reader, FileSummary, Manifest};
use fslite_config::ConfigManager;
use fslite_meta_store::{JsonManifestStore, ManifestStore, MemManifestStore};
use fslite_mgmtd::{NodeInfo, NodeRegistry};
use fslite_types::{FileId, NodeId, NodeStatus, Result};
use serde::{Deserialize, Serialize};

use crate::cache::{CachedOutput, RecencyCache};
use crate::config::{Backend, ClusterConfig};
use crate::distributor::Distributor;
use crate::health::{CleanupReport, HealthMonitor, HealthReport, RepairReport};
use crate::reconstruct::{ReconstructReport, Reconstructor, VerifyReport};

/// Result of a download request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Download {
    pub file_id: FileId,
    pub path: PathBuf,
    pub from_cache: bool,
    /// Present when the file was reconstructed for this request.
    pub report: Option<ReconstructReport>,
}

impl Download {
    pub fn success(&self) -> bool {
        self.report.as_ref().map(|r| r.success).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    pub file_id: FileId,
    pub copies_removed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetReport {
    pub chunks_removed: usize,
    pub files_removed: usize,
}

pub struct Cluster {
    config: Arc<ConfigManager<ClusterConfig>>,
    registry: Arc<NodeRegistry>,
    manifests: Arc<dyn ManifestStore>,
    distributor: Distributor,
    health: HealthMonitor,
    reconstructor: Reconstructor,
    cache: RecencyCache,
}

impl Cluster {
    /// Open the nodes and manifest store selected by the config's backend.
    pub fn open(config: Arc<ConfigManager<ClusterConfig>>) -> Result<Self> {
        let cfg = config.snapshot();
        let (registry, manifests): (NodeRegistry, Arc<dyn ManifestStore>) = match cfg.backend {
            Backend::Disk => (
                NodeRegistry::on_disk(&cfg.nodes_dir(), cfg.node_count, cfg.max_storage_bytes)?,
                Arc::new(JsonManifestStore::open(&cfg.metadata_dir())?),
            ),
            Backend::Memory => (
                NodeRegistry::in_memory(cfg.node_count, cfg.max_storage_bytes),
                Arc::new(MemManifestStore::new()),
            ),
        };
        tracing::info!(
            backend = ?cfg.backend,
            nodes = cfg.node_count,
            data_dir = %cfg.data_dir.display(),
            "cluster opened"
        );
        Ok(Self::from_parts(config, Arc::new(registry), manifests))
    }

    /// Assemble a cluster over existing stores.
    pub fn from_parts(
        config: Arc<ConfigManager<ClusterConfig>>,
        registry: Arc<NodeRegistry>,
        manifests: Arc<dyn ManifestStore>,
    ) -> Self {
        let cfg = config.snapshot();
        Self {
            distributor: Distributor::new(registry.clone()),
            health: HealthMonitor::new(
                registry.clone(),
                manifests.clone(),
                cfg.cleanup_include_offline,
            ),
            reconstructor: Reconstructor::new(
                registry.clone(),
                manifests.clone(),
                cfg.output_dir.clone(),
            ),
            cache: RecencyCache::new(cfg.cache_max_size),
            config,
            registry,
            manifests,
        }
    }

    pub fn in_memory(config: ClusterConfig) -> Result<Self> {
        let config = ClusterConfig {
            backend: Backend::Memory,
            ..config
        };
        Self::open(Arc::new(ConfigManager::new(config)))
    }

    pub fn config(&self) -> Arc<ClusterConfig> {
        Arc::clone(&*self.config.get())
    }

    pub fn config_manager(&self) -> &Arc<ConfigManager<ClusterConfig>> {
        &self.config
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &RecencyCache {
        &self.cache
    }

    // ---- files ----

    /// Split `path` with the configured chunk size, without storing it.
    pub fn split_file(&self, path: &Path) -> Result<Manifest> {
        split_file(path, self.config().chunk_size)
    }

    /// Split, distribute and record the file at `path`.
    pub fn upload_file(&self, path: &Path) -> Result<Manifest> {
        let manifest = self.split_file(path)?;
        self.store(manifest)
    }

    pub fn upload_reader<R: Read>(&self, file_name: &str, reader: R) -> Result<Manifest> {
        let manifest = split_reader(file_name, reader, self.config().chunk_size)?;
        self.store(manifest)
    }

    /// Distribute `manifest` and save it. If the save fails the copies
    /// written by the distribution are removed again.
    fn store(&self, mut manifest: Manifest) -> Result<Manifest> {
        self.distributor.distribute(&mut manifest)?;
        if let Err(e) = self.manifests.save(&manifest) {
            tracing::error!(file_id = %manifest.file_id, error = %e, "manifest save failed, removing chunks");
            for chunk in &manifest.chunks {
                for node in chunk.placements().into_iter().flatten() {
                    if let Err(e) = self.registry.remove_chunk(node, &chunk.chunk_id) {
                        tracing::warn!(chunk = %chunk.chunk_id, %node, error = %e, "could not remove chunk");
                    }
                }
            }
            return Err(e);
        }
        manifest.strip_data();
        tracing::info!(
            file_id = %manifest.file_id,
            file_name = %manifest.file_name,
            size = manifest.file_size,
            chunks = manifest.total_chunks,
            "file uploaded"
        );
        Ok(manifest)
    }

    pub fn get_manifest(&self, file_id: &FileId) -> Result<Manifest> {
        self.manifests.get(file_id)
    }

    pub fn list_files(&self) -> Result<Vec<FileSummary>> {
        self.manifests.list()
    }

    /// Reconstruct `file_id`, or hand back the cached output of an earlier
    /// successful reconstruction.
    pub fn download(&self, file_id: &FileId) -> Result<Download> {
        // Another process may have deleted the file since it was cached.
        if let Err(e) = self.manifests.get(file_id) {
            self.cache.remove(file_id);
            return Err(e);
        }
        if let Some(cached) = self.cache.get(file_id) {
            if cached.verified && cached.path.exists() {
                tracing::debug!(%file_id, "cache hit");
                return Ok(Download {
                    file_id: file_id.clone(),
                    path: cached.path,
                    from_cache: true,
                    report: None,
                });
            }
        }
        let report = self.reconstructor.reconstruct(file_id)?;
        self.cache.put(
            file_id.clone(),
            CachedOutput {
                path: report.output_path.clone(),
                verified: report.success,
            },
        );
        Ok(Download {
            file_id: file_id.clone(),
            path: report.output_path.clone(),
            from_cache: false,
            report: Some(report),
        })
    }

    pub fn reconstruct(&self, file_id: &FileId) -> Result<ReconstructReport> {
        self.reconstructor.reconstruct(file_id)
    }

    pub fn verify(&self, file_id: &FileId) -> Result<VerifyReport> {
        self.reconstructor.verify(file_id)
    }

    /// Remove the file's chunks from every node, then its manifest and
    /// cache entry. Chunk removal is best effort; reconstructed output files
    /// are left alone.
    pub fn delete_file(&self, file_id: &FileId) -> Result<DeleteReport> {
        let _lock = self.health.lock_file(file_id);
        let manifest = self.manifests.get(file_id)?;
        let mut copies_removed = 0;
        for chunk in &manifest.chunks {
            for &node in self.registry.node_ids() {
                match self.registry.remove_chunk(node, &chunk.chunk_id) {
                    Ok(true) => copies_removed += 1,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(chunk = %chunk.chunk_id, %node, error = %e, "could not remove chunk")
                    }
                }
            }
        }
        self.manifests.delete(file_id)?;
        self.cache.remove(file_id);
        tracing::info!(%file_id, copies_removed, "file deleted");
        Ok(DeleteReport {
            file_id: file_id.clone(),
            copies_removed,
        })
    }

    // ---- nodes ----

    pub fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        self.registry.list_nodes()
    }

    pub fn get_node(&self, node_id: NodeId) -> Result<NodeInfo> {
        self.registry.get_node(node_id)
    }

    /// Returns the previous status.
    pub fn set_node_status(&self, node_id: NodeId, status: NodeStatus) -> Result<NodeStatus> {
        self.registry.set_status(node_id, status)
    }

    pub fn fail_node(&self, node_id: NodeId) -> Result<NodeStatus> {
        self.set_node_status(node_id, NodeStatus::Offline)
    }

    /// Bring a node back ONLINE and run a repair pass straight away.
    pub fn recover_node(&self, node_id: NodeId) -> Result<RepairReport> {
        self.set_node_status(node_id, NodeStatus::Online)?;
        self.repair()
    }

    // ---- maintenance ----

    pub fn scan_health(&self) -> Result<HealthReport> {
        self.health.scan()
    }

    pub fn repair(&self) -> Result<RepairReport> {
        self.health.repair()
    }

    pub fn cleanup(&self) -> Result<CleanupReport> {
        self.health.cleanup()
    }

    /// Drop every chunk, manifest and cache entry. Node status is kept.
    pub fn reset(&self) -> Result<ResetReport> {
        let chunks_removed = self.registry.clear_all()?;
        let files_removed = self.manifests.clear()?;
        self.cache.clear();
        tracing::warn!(chunks_removed, files_removed, "cluster reset");
        Ok(ResetReport {
            chunks_removed,
            files_removed,
        })
    }
}
