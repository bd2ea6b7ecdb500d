use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use bytes::Bytes;
use fslite_types::{make_error_msg, ChunkId, FileId, MetaCode, Result, Status, StatusCode};
use sha2::{Digest, Sha256};

use crate::hash::hash_bytes;
use crate::manifest::{Chunk, Manifest};

/// Split the file at `path` into `chunk_size` windows.
///
/// The manifest is named after the file's base name and carries a freshly
/// generated file id. Fails with `Meta::NotFound` if the path does not exist.
pub fn split_file(path: &Path, chunk_size: u64) -> Result<Manifest> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Status::with_message(
            MetaCode::NOT_FOUND,
            format!("file not found: {}", path.display()),
        ),
        _ => Status::with_message(
            StatusCode::IO_ERROR,
            format!("open {}: {}", path.display(), e),
        ),
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    split_reader(&file_name, BufReader::new(file), chunk_size)
}

/// Split everything `reader` yields into chunks of `chunk_size` bytes (the
/// last one may be shorter). Identical input always produces identical
/// chunk hashes and full hash; only the file id is random.
pub fn split_reader<R: Read>(file_name: &str, mut reader: R, chunk_size: u64) -> Result<Manifest> {
    if chunk_size == 0 {
        return make_error_msg(StatusCode::INVALID_ARG, "chunk_size must be positive");
    }
    let window = usize::try_from(chunk_size).map_err(|_| {
        Status::with_message(
            StatusCode::INVALID_ARG,
            format!("chunk_size {} too large", chunk_size),
        )
    })?;

    let file_id = FileId::generate();
    let mut full = Sha256::new();
    let mut chunks = Vec::new();
    let mut file_size = 0u64;

    loop {
        let data = read_window(&mut reader, window)?;
        if data.is_empty() {
            break;
        }
        full.update(&data);
        file_size += data.len() as u64;

        let index = chunks.len() as u32;
        chunks.push(Chunk {
            chunk_id: ChunkId::for_chunk(&file_id, index),
            index,
            size: data.len() as u64,
            content_hash: hash_bytes(&data),
            primary_node: None,
            replica_node: None,
            data: Some(Bytes::from(data)),
        });
        if chunks.last().map(|c| c.size < chunk_size).unwrap_or(false) {
            break;
        }
    }

    let manifest = Manifest {
        file_id,
        file_name: file_name.to_string(),
        file_size,
        chunk_size,
        total_chunks: chunks.len() as u32,
        full_content_hash: hex::encode(full.finalize()),
        chunks,
    };
    tracing::debug!(
        file_id = %manifest.file_id,
        file_name = %manifest.file_name,
        file_size,
        total_chunks = manifest.total_chunks,
        "split file"
    );
    Ok(manifest)
}

/// Fill up to `window` bytes, retrying short reads until EOF.
fn read_window<R: Read>(reader: &mut R, window: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(window.min(1 << 20));
    reader
        .by_ref()
        .take(window as u64)
        .read_to_end(&mut buf)
        .map_err(|e| Status::with_message(StatusCode::IO_ERROR, format!("read: {}", e)))?;
    Ok(buf)
}
