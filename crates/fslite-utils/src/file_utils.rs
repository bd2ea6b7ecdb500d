use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use fslite_types::{Result, Status, StatusCode};

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

fn io_error(op: &str, path: &Path, e: std::io::Error) -> Status {
    Status::with_message(
        StatusCode::IO_ERROR,
        format!("{} {}: {}", op, path.display(), e),
    )
}

/// Read a file, mapping "does not exist" to `Ok(None)`.
pub fn read_file_opt(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error("read", path, e)),
    }
}

/// Create `dir` and any missing parents.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| io_error("create dir", dir, e))
}

/// Atomic write: write to a uniquely named temp file beside `path`, then rename.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let tmp_path = dir.join(format!(
        ".tmp.{}.{}",
        std::process::id(),
        TMP_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::write(&tmp_path, data).map_err(|e| io_error("write", &tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        io_error("rename", path, e)
    })
}

/// Remove a file. Returns whether it existed.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_error("remove", path, e)),
    }
}

/// Whether a file name is hidden (starts with a dot).
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Regular, non-hidden files directly inside `dir`, with their sizes,
/// sorted by name. A missing directory yields an empty list.
pub fn list_visible_files(dir: &Path) -> Result<Vec<(String, PathBuf, u64)>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error("list", dir, e)),
    };

    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_error("list", dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_hidden(&name) {
            continue;
        }
        let meta = entry.metadata().map_err(|e| io_error("stat", &entry.path(), e))?;
        if meta.is_file() {
            out.push((name, entry.path(), meta.len()));
        }
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}
