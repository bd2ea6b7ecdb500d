//! Cluster-wide health scan, re-replication and surplus-copy cleanup.

use std::fmt;
use std::sync::Arc;

use fslite_chunk_engine::{hash, Chunk, Manifest, REPLICATION_FACTOR};
use fslite_meta_store::ManifestStore;
use fslite_mgmtd::NodeRegistry;
use fslite_types::{ChunkId, FileId, NodeId, Result};
use fslite_utils::Shards;
use parking_lot::MutexGuard;
use serde::{Deserialize, Serialize};

use crate::probe::{ChunkProbe, ChunkState};

const FILE_LOCK_SHARDS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SystemStatus {
    Healthy,
    Degraded,
    Critical,
}

impl SystemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemStatus::Healthy => "HEALTHY",
            SystemStatus::Degraded => "DEGRADED",
            SystemStatus::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkHealth {
    pub file_id: FileId,
    pub chunk_id: ChunkId,
    pub index: u32,
    pub state: ChunkState,
    pub copies_available: usize,
    pub primary_node: Option<NodeId>,
    pub replica_node: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: SystemStatus,
    pub total_files: usize,
    pub total_chunks: usize,
    pub healthy_chunks: usize,
    pub under_replicated_chunks: usize,
    pub missing_chunks: usize,
    pub corrupted_chunks: usize,
    pub chunks: Vec<ChunkHealth>,
}

impl HealthReport {
    fn from_chunks(total_files: usize, chunks: Vec<ChunkHealth>) -> Self {
        let count = |state| chunks.iter().filter(|c| c.state == state).count();
        let healthy_chunks = count(ChunkState::Healthy);
        let under_replicated_chunks = count(ChunkState::UnderReplicated);
        let missing_chunks = count(ChunkState::Missing);
        let corrupted_chunks = count(ChunkState::Corrupted);
        let status = if missing_chunks > 0 || corrupted_chunks > 0 {
            SystemStatus::Critical
        } else if under_replicated_chunks > 0 {
            SystemStatus::Degraded
        } else {
            SystemStatus::Healthy
        };
        Self {
            status,
            total_files,
            total_chunks: chunks.len(),
            healthy_chunks,
            under_replicated_chunks,
            missing_chunks,
            corrupted_chunks,
            chunks,
        }
    }

    /// Chunks that are not fully healthy.
    pub fn problems(&self) -> impl Iterator<Item = &ChunkHealth> {
        self.chunks.iter().filter(|c| c.state != ChunkState::Healthy)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    pub files_scanned: usize,
    pub chunks_repaired: usize,
    /// Chunks with no verified copy left.
    pub chunks_unrepairable: usize,
    /// Chunks with one good copy but no ONLINE node able to take another.
    pub chunks_without_target: usize,
    pub manifests_updated: usize,
    /// Files skipped because their manifest could not be loaded or saved.
    pub files_failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub files_scanned: usize,
    pub chunks_pruned: usize,
    pub copies_removed: usize,
    pub manifests_updated: usize,
    pub files_failed: usize,
}

pub struct HealthMonitor {
    registry: Arc<NodeRegistry>,
    manifests: Arc<dyn ManifestStore>,
    file_locks: Shards<()>,
    cleanup_include_offline: bool,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<NodeRegistry>,
        manifests: Arc<dyn ManifestStore>,
        cleanup_include_offline: bool,
    ) -> Self {
        Self {
            registry,
            manifests,
            file_locks: Shards::new(FILE_LOCK_SHARDS, || ()),
            cleanup_include_offline,
        }
    }

    /// Serialize load-mutate-save sequences on one file's manifest.
    pub fn lock_file(&self, file_id: &FileId) -> MutexGuard<'_, ()> {
        self.file_locks.lock(file_id)
    }

    /// Fetch a manifest that was listed a moment ago. A concurrent delete
    /// makes it vanish, which is not an error here.
    fn load(&self, file_id: &FileId) -> Result<Option<Manifest>> {
        match self.manifests.get(file_id) {
            Ok(m) => Ok(Some(m)),
            Err(e) if e.is_not_found() => {
                tracing::debug!(%file_id, "manifest vanished during pass");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn scan(&self) -> Result<HealthReport> {
        let summaries = self.manifests.list()?;
        let mut chunks = Vec::new();
        let mut total_files = 0;
        for summary in &summaries {
            let Some(manifest) = self.load(&summary.file_id)? else {
                continue;
            };
            total_files += 1;
            for chunk in &manifest.chunks {
                let probe = ChunkProbe::run(&self.registry, chunk);
                chunks.push(ChunkHealth {
                    file_id: manifest.file_id.clone(),
                    chunk_id: chunk.chunk_id.clone(),
                    index: chunk.index,
                    state: probe.state(),
                    copies_available: probe.copies_available(),
                    primary_node: chunk.primary_node,
                    replica_node: chunk.replica_node,
                });
            }
        }
        let report = HealthReport::from_chunks(total_files, chunks);
        tracing::info!(
            status = %report.status,
            files = report.total_files,
            chunks = report.total_chunks,
            under_replicated = report.under_replicated_chunks,
            missing = report.missing_chunks,
            corrupted = report.corrupted_chunks,
            "health scan finished"
        );
        Ok(report)
    }

    /// Restore a second copy of every chunk that has exactly one verified
    /// copy. Old copies are left in place; `cleanup` prunes them.
    ///
    /// A file whose manifest cannot be loaded or saved is logged, counted in
    /// `files_failed` and skipped. Only failing to list the files is an error.
    pub fn repair(&self) -> Result<RepairReport> {
        let mut report = RepairReport::default();
        for summary in self.manifests.list()? {
            if let Err(e) = self.repair_file(&summary.file_id, &mut report) {
                tracing::error!(file_id = %summary.file_id, error = %e, "repair skipped file");
                report.files_failed += 1;
            }
        }
        tracing::info!(
            repaired = report.chunks_repaired,
            unrepairable = report.chunks_unrepairable,
            without_target = report.chunks_without_target,
            failed_files = report.files_failed,
            "repair pass finished"
        );
        Ok(report)
    }

    /// Counts only reach `report` once the manifest has been saved.
    fn repair_file(&self, file_id: &FileId, report: &mut RepairReport) -> Result<()> {
        let _lock = self.lock_file(file_id);
        let Some(mut manifest) = self.load(file_id)? else {
            return Ok(());
        };
        report.files_scanned += 1;
        let mut file = RepairReport::default();
        for chunk in manifest.chunks.iter_mut() {
            match self.repair_chunk(chunk) {
                ChunkRepair::NotNeeded => {}
                ChunkRepair::Repaired => file.chunks_repaired += 1,
                ChunkRepair::NoSource => file.chunks_unrepairable += 1,
                ChunkRepair::NoTarget => file.chunks_without_target += 1,
            }
        }
        if file.chunks_repaired > 0 {
            self.manifests.save(&manifest)?;
            report.manifests_updated += 1;
        }
        report.chunks_repaired += file.chunks_repaired;
        report.chunks_unrepairable += file.chunks_unrepairable;
        report.chunks_without_target += file.chunks_without_target;
        Ok(())
    }

    fn repair_chunk(&self, chunk: &mut Chunk) -> ChunkRepair {
        let probe = ChunkProbe::run(&self.registry, chunk);
        let sources = probe.healthy_sources(chunk);
        let (source, data) = match sources.as_slice() {
            [] => {
                tracing::warn!(chunk = %chunk.chunk_id, "no verified copy left, cannot repair");
                return ChunkRepair::NoSource;
            }
            [(node, data)] => (*node, data.clone()),
            _ => return ChunkRepair::NotNeeded,
        };

        let _placement = self.registry.placement_lock();
        for &target in self.registry.node_ids() {
            if target == source
                || !self.registry.is_online(target)
                || !self.registry.has_capacity_for(target, &chunk.chunk_id, chunk.size)
            {
                continue;
            }
            match self.registry.write_chunk(target, &chunk.chunk_id, data.clone()) {
                Ok(()) => {
                    if chunk.primary_node == Some(source) {
                        chunk.replica_node = Some(target);
                    } else {
                        chunk.primary_node = Some(target);
                    }
                    tracing::info!(chunk = %chunk.chunk_id, %source, %target, "chunk re-replicated");
                    return ChunkRepair::Repaired;
                }
                Err(e) => {
                    tracing::warn!(chunk = %chunk.chunk_id, %target, error = %e, "repair write failed, trying next node");
                }
            }
        }
        tracing::warn!(chunk = %chunk.chunk_id, %source, "no node can take another copy");
        ChunkRepair::NoTarget
    }

    /// Remove copies beyond the replication factor. Copies that match the
    /// chunk's hash are kept before corrupt ones, each group in registry
    /// order; the kept holders become the chunk's placement. Per-file
    /// failures are counted like in `repair`.
    pub fn cleanup(&self) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();
        for summary in self.manifests.list()? {
            if let Err(e) = self.cleanup_file(&summary.file_id, &mut report) {
                tracing::error!(file_id = %summary.file_id, error = %e, "cleanup skipped file");
                report.files_failed += 1;
            }
        }
        tracing::info!(
            pruned = report.chunks_pruned,
            removed = report.copies_removed,
            failed_files = report.files_failed,
            "cleanup pass finished"
        );
        Ok(report)
    }

    fn cleanup_file(&self, file_id: &FileId, report: &mut CleanupReport) -> Result<()> {
        let _lock = self.lock_file(file_id);
        let Some(mut manifest) = self.load(file_id)? else {
            return Ok(());
        };
        report.files_scanned += 1;
        let mut pruned = 0;
        for chunk in manifest.chunks.iter_mut() {
            let holders = self.holders(chunk);
            if holders.len() <= REPLICATION_FACTOR {
                continue;
            }
            let (keep, surplus) = holders.split_at(REPLICATION_FACTOR);
            for &node in surplus {
                match self.registry.remove_chunk(node, &chunk.chunk_id) {
                    Ok(_) => report.copies_removed += 1,
                    Err(e) => {
                        tracing::warn!(chunk = %chunk.chunk_id, %node, error = %e, "could not remove surplus copy")
                    }
                }
            }
            chunk.primary_node = Some(keep[0]);
            chunk.replica_node = Some(keep[1]);
            pruned += 1;
        }
        if pruned > 0 {
            self.manifests.save(&manifest)?;
            report.manifests_updated += 1;
            report.chunks_pruned += pruned;
        }
        Ok(())
    }

    /// Nodes from which the chunk can actually be read, verified copies
    /// first, each group in registry order.
    fn holders(&self, chunk: &Chunk) -> Vec<NodeId> {
        let (verified, corrupt): (Vec<_>, Vec<_>) = self
            .registry
            .node_ids()
            .iter()
            .copied()
            .filter(|&node| self.cleanup_include_offline || self.registry.is_online(node))
            .filter_map(|node| {
                let data = self.registry.read_chunk(node, &chunk.chunk_id).ok()?;
                Some((node, hash::verify(&data, &chunk.content_hash)))
            })
            .partition(|&(_, ok)| ok);
        verified
            .into_iter()
            .chain(corrupt)
            .map(|(node, _)| node)
            .collect()
    }
}

enum ChunkRepair {
    NotNeeded,
    Repaired,
    NoSource,
    NoTarget,
}
