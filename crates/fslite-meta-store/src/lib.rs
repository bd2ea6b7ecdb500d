//! Manifest persistence for fslite.
//!
//! A [`ManifestStore`] is a record store keyed by file id. Stores only ever
//! hold stripped manifests: chunk bytes are dropped before a manifest is
//! kept, whichever backend is used.

pub mod json_store;
pub mod mem_store;

use fslite_chunk_engine::{FileSummary, Manifest};
use fslite_types::{FileId, Result, Status, MetaCode};

pub trait ManifestStore: Send + Sync {
    /// Insert or replace the manifest for `manifest.file_id`.
    fn save(&self, manifest: &Manifest) -> Result<()>;

    /// Fetch a manifest. Unknown ids fail with `Meta::NotFound`.
    fn get(&self, file_id: &FileId) -> Result<Manifest>;

    fn list(&self) -> Result<Vec<FileSummary>>;

    /// Remove a manifest. Returns whether it existed.
    fn delete(&self, file_id: &FileId) -> Result<bool>;

    /// Remove every manifest, returning how many were dropped.
    fn clear(&self) -> Result<usize>;
}

pub(crate) fn not_found(file_id: &FileId) -> Status {
    Status::with_message(MetaCode::NOT_FOUND, format!("no file found with id {}", file_id))
}

/// Validate and strip a manifest before it is stored.
pub(crate) fn prepare(manifest: &Manifest) -> Result<Manifest> {
    manifest.validate()?;
    Ok(manifest.without_data())
}

pub use json_store::JsonManifestStore;
pub use mem_store::MemManifestStore;
