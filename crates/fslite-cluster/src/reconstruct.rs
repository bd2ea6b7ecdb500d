//! Reassembly of stored files and non-writing integrity checks.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fslite_chunk_engine::{hash, Manifest};
use fslite_meta_store::ManifestStore;
use fslite_mgmtd::NodeRegistry;
use fslite_types::{ChunkId, FileId, NodeId, Result, Status, StatusCode, StorageCode};
use fslite_utils::file_utils;
use serde::{Deserialize, Serialize};

use crate::probe::{fetch_with_fallback, ChunkFetch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
    Unavailable,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::Unavailable => "UNAVAILABLE",
        })
    }
}

/// Outcome for one chunk of a reconstruction or verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkCheck {
    pub index: u32,
    pub chunk_id: ChunkId,
    pub verdict: Verdict,
    /// Node the bytes were read from.
    pub source: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructReport {
    pub file_id: FileId,
    pub file_name: String,
    pub output_path: PathBuf,
    pub chunks: Vec<ChunkCheck>,
    pub full_hash_ok: bool,
    /// Every chunk fetched and matching, and the whole file matching.
    pub success: bool,
}

impl ReconstructReport {
    /// The first problem with the rebuilt file, as a status. A bad whole-file
    /// hash is only reported when every chunk passed.
    pub fn failure(&self) -> Option<Status> {
        first_failure(&self.file_id, &self.chunks).or_else(|| {
            (!self.full_hash_ok).then(|| {
                Status::with_message(
                    StorageCode::CHECKSUM_MISMATCH,
                    format!("file {}: whole-file hash does not match", self.file_id),
                )
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub file_id: FileId,
    pub file_name: String,
    pub verdict: Verdict,
    pub chunks: Vec<ChunkCheck>,
}

impl VerifyReport {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    pub fn failure(&self) -> Option<Status> {
        first_failure(&self.file_id, &self.chunks)
    }
}

/// Integrity mismatches map to `Storage::ChecksumMismatch`, unreadable
/// chunks to `Storage::ChunkNotFound`.
fn first_failure(file_id: &FileId, chunks: &[ChunkCheck]) -> Option<Status> {
    chunks.iter().find_map(|c| match c.verdict {
        Verdict::Pass => None,
        Verdict::Fail => Some(Status::with_message(
            StorageCode::CHECKSUM_MISMATCH,
            format!("file {}: chunk {} does not match its hash", file_id, c.chunk_id),
        )),
        Verdict::Unavailable => Some(Status::with_message(
            StorageCode::CHUNK_NOT_FOUND,
            format!("file {}: chunk {} unavailable on every node", file_id, c.chunk_id),
        )),
    })
}

pub struct Reconstructor {
    registry: Arc<NodeRegistry>,
    manifests: Arc<dyn ManifestStore>,
    output_dir: PathBuf,
}

impl Reconstructor {
    pub fn new(
        registry: Arc<NodeRegistry>,
        manifests: Arc<dyn ManifestStore>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            manifests,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where the reconstruction of `manifest` is written.
    pub fn output_path(&self, manifest: &Manifest) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}", manifest.file_id, sanitize(&manifest.file_name)))
    }

    /// Fetch every chunk in index order and write their concatenation.
    ///
    /// Chunks that cannot be fetched are skipped and chunks with a bad hash
    /// are still written, so an output file is always produced. Only a
    /// missing manifest or a failed write is an error.
    pub fn reconstruct(&self, file_id: &FileId) -> Result<ReconstructReport> {
        let manifest = self.manifests.get(file_id)?;
        let (chunks, parts) = self.fetch_all(&manifest);

        let output_path = self.output_path(&manifest);
        file_utils::ensure_dir(&self.output_dir)?;
        file_utils::atomic_write(&output_path, &parts.concat())?;

        let written = File::open(&output_path).map_err(|e| {
            Status::with_message(
                StatusCode::IO_ERROR,
                format!("open {}: {}", output_path.display(), e),
            )
        })?;
        let actual = hash::hash_reader(BufReader::new(written))?;
        let full_hash_ok = actual.eq_ignore_ascii_case(&manifest.full_content_hash);
        let success = full_hash_ok && chunks.iter().all(|c| c.verdict == Verdict::Pass);

        if success {
            tracing::info!(%file_id, path = %output_path.display(), "file reconstructed");
        } else {
            tracing::warn!(
                %file_id,
                path = %output_path.display(),
                full_hash_ok,
                failed_chunks = chunks.iter().filter(|c| c.verdict != Verdict::Pass).count(),
                "file reconstructed with errors"
            );
        }
        Ok(ReconstructReport {
            file_id: manifest.file_id,
            file_name: manifest.file_name,
            output_path,
            chunks,
            full_hash_ok,
            success,
        })
    }

    /// The per-chunk half of `reconstruct`, without writing anything.
    pub fn verify(&self, file_id: &FileId) -> Result<VerifyReport> {
        let manifest = self.manifests.get(file_id)?;
        let (chunks, _) = self.fetch_all(&manifest);
        let verdict = if chunks.iter().all(|c| c.verdict == Verdict::Pass) {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
        tracing::info!(%file_id, %verdict, "file verified");
        Ok(VerifyReport {
            file_id: manifest.file_id,
            file_name: manifest.file_name,
            verdict,
            chunks,
        })
    }

    fn fetch_all(&self, manifest: &Manifest) -> (Vec<ChunkCheck>, Vec<bytes::Bytes>) {
        let mut ordered: Vec<_> = manifest.chunks.iter().collect();
        ordered.sort_by_key(|c| c.index);

        let mut checks = Vec::with_capacity(ordered.len());
        let mut parts = Vec::with_capacity(ordered.len());
        for chunk in ordered {
            let (verdict, source) = match fetch_with_fallback(&self.registry, chunk) {
                ChunkFetch::Verified { source, data } => {
                    parts.push(data);
                    (Verdict::Pass, Some(source))
                }
                ChunkFetch::Mismatched { source, data } => {
                    parts.push(data);
                    (Verdict::Fail, Some(source))
                }
                ChunkFetch::Unavailable => {
                    tracing::warn!(chunk = %chunk.chunk_id, "chunk unavailable on every node");
                    (Verdict::Unavailable, None)
                }
            };
            checks.push(ChunkCheck {
                index: chunk.index,
                chunk_id: chunk.chunk_id.clone(),
                verdict,
                source,
            });
        }
        (checks, parts)
    }
}

/// Keep only the final path component so a stored name cannot escape the
/// output directory.
fn sanitize(file_name: &str) -> String {
    let base = file_name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    match base {
        "" | "." | ".." => "file".to_string(),
        other => other.to_string(),
    }
}
