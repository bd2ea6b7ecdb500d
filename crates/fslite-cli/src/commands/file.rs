//! File commands: upload, download, inspect, verify and delete.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use fslite_cluster::Verdict;
use fslite_types::FileId;

use crate::connection::AdminEnv;
use crate::output::{format_bytes, format_node, kv_row, table_with_header, CommandOutput};

#[derive(Debug, Subcommand)]
pub enum FileCommands {
    /// Split a local file into chunks and store two copies of each.
    Upload(UploadArgs),

    /// Rebuild a stored file into the output directory.
    Download(FileArg),

    /// List stored files.
    List,

    /// Show a file's manifest and chunk placements.
    Show(FileArg),

    /// Check every chunk of a file against its recorded hash.
    Verify(FileArg),

    /// Remove a file and all of its chunk copies.
    Delete(FileArg),
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    pub path: PathBuf,
}

#[derive(Debug, Args)]
pub struct FileArg {
    pub file_id: String,
}

impl FileArg {
    fn id(&self) -> FileId {
        FileId::new(self.file_id.trim())
    }
}

impl FileCommands {
    pub fn execute(&self, env: &mut AdminEnv) -> anyhow::Result<CommandOutput> {
        match self {
            Self::Upload(args) => execute_upload(env, args),
            Self::Download(args) => execute_download(env, args),
            Self::List => execute_list(env),
            Self::Show(args) => execute_show(env, args),
            Self::Verify(args) => execute_verify(env, args),
            Self::Delete(args) => execute_delete(env, args),
        }
    }
}

fn execute_upload(env: &mut AdminEnv, args: &UploadArgs) -> anyhow::Result<CommandOutput> {
    let manifest = env
        .cluster()?
        .upload_file(&args.path)
        .with_context(|| format!("uploading {}", args.path.display()))?;
    let table = vec![
        kv_row("File ID", &manifest.file_id),
        kv_row("Name", &manifest.file_name),
        kv_row("Size", format_bytes(manifest.file_size)),
        kv_row("Chunks", manifest.total_chunks),
    ];
    CommandOutput::table(table).with_value(&manifest.summary())
}

fn execute_download(env: &mut AdminEnv, args: &FileArg) -> anyhow::Result<CommandOutput> {
    let download = env.cluster()?.download(&args.id())?;
    if let Some(report) = download.report.as_ref().filter(|r| !r.success) {
        let failed = report
            .chunks
            .iter()
            .filter(|c| c.verdict != Verdict::Pass)
            .count();
        let cause = report
            .failure()
            .map(|s| s.describe())
            .unwrap_or_default();
        anyhow::bail!(
            "file {} rebuilt with {} bad chunk(s) at {}: {}",
            download.file_id,
            failed,
            download.path.display(),
            cause
        );
    }
    let table = vec![
        kv_row("File ID", &download.file_id),
        kv_row("Path", download.path.display()),
        kv_row("Cached", download.from_cache),
    ];
    CommandOutput::table(table).with_value(&serde_json::json!({
        "file_id": download.file_id,
        "path": download.path,
        "from_cache": download.from_cache,
    }))
}

fn execute_list(env: &mut AdminEnv) -> anyhow::Result<CommandOutput> {
    let files = env.cluster()?.list_files()?;
    let mut table = table_with_header(&["File ID", "Name", "Size", "Chunks"]);
    for f in &files {
        table.push(vec![
            f.file_id.to_string(),
            f.file_name.clone(),
            format_bytes(f.file_size),
            f.total_chunks.to_string(),
        ]);
    }
    CommandOutput::table(table).with_value(&files)
}

fn execute_show(env: &mut AdminEnv, args: &FileArg) -> anyhow::Result<CommandOutput> {
    let manifest = env.cluster()?.get_manifest(&args.id())?;
    let mut table = vec![
        kv_row("File ID", &manifest.file_id),
        kv_row("Name", &manifest.file_name),
        kv_row("Size", format_bytes(manifest.file_size)),
        kv_row("Chunk size", format_bytes(manifest.chunk_size)),
        kv_row("SHA-256", &manifest.full_content_hash),
        vec![],
    ];
    table.push(vec![
        "Index".to_string(),
        "Chunk".to_string(),
        "Size".to_string(),
        "Primary".to_string(),
        "Replica".to_string(),
    ]);
    for c in &manifest.chunks {
        table.push(vec![
            c.index.to_string(),
            c.chunk_id.to_string(),
            c.size.to_string(),
            format_node(c.primary_node),
            format_node(c.replica_node),
        ]);
    }
    CommandOutput::table(table).with_value(&manifest)
}

fn execute_verify(env: &mut AdminEnv, args: &FileArg) -> anyhow::Result<CommandOutput> {
    let report = env.cluster()?.verify(&args.id())?;
    let mut table = table_with_header(&["Index", "Chunk", "Verdict", "Source"]);
    for c in &report.chunks {
        table.push(vec![
            c.index.to_string(),
            c.chunk_id.to_string(),
            c.verdict.to_string(),
            format_node(c.source),
        ]);
    }
    table.push(vec![]);
    table.push(kv_row("Result", report.verdict));
    if let Some(status) = report.failure() {
        table.push(kv_row("Error", status.describe()));
    }
    CommandOutput::table(table).with_value(&report)
}

fn execute_delete(env: &mut AdminEnv, args: &FileArg) -> anyhow::Result<CommandOutput> {
    let report = env.cluster()?.delete_file(&args.id())?;
    let table = vec![
        kv_row("Deleted", &report.file_id),
        kv_row("Copies removed", report.copies_removed),
    ];
    CommandOutput::table(table).with_value(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::memory_env;

    fn upload(env: &mut AdminEnv, dir: &std::path::Path, len: usize) -> String {
        let path = dir.join("notes.txt");
        std::fs::write(&path, vec![b'x'; len]).unwrap();
        let out = FileCommands::Upload(UploadArgs { path })
            .execute(env)
            .unwrap();
        out.value.unwrap()["file_id"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_upload_list_show() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = memory_env(dir.path());
        let id = upload(&mut env, dir.path(), 200);

        let list = FileCommands::List.execute(&mut env).unwrap();
        assert_eq!(list.table.len(), 2);
        assert_eq!(list.table[1][0], id);
        assert_eq!(list.table[1][3], "4");

        let show = FileCommands::Show(FileArg { file_id: id.clone() })
            .execute(&mut env)
            .unwrap();
        let value = show.value.unwrap();
        assert_eq!(value["chunks"].as_array().unwrap().len(), 4);
        assert!(show.table.iter().any(|r| r.first().map(String::as_str) == Some("3")));
    }

    #[test]
    fn test_download_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = memory_env(dir.path());
        let id = upload(&mut env, dir.path(), 130);

        let out = FileCommands::Download(FileArg { file_id: id.clone() })
            .execute(&mut env)
            .unwrap();
        let path = out.value.unwrap()["path"].as_str().unwrap().to_string();
        assert!(path.ends_with(&format!("{}_notes.txt", id)));
        assert_eq!(std::fs::read(path).unwrap(), vec![b'x'; 130]);
    }

    #[test]
    fn test_verify_reports_pass() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = memory_env(dir.path());
        let id = upload(&mut env, dir.path(), 100);

        let out = FileCommands::Verify(FileArg { file_id: id })
            .execute(&mut env)
            .unwrap();
        assert_eq!(out.table.last().unwrap(), &vec!["Result", "PASS"]);
        assert_eq!(out.table[1][2], "PASS");
    }

    #[test]
    fn test_corrupted_copies_report_checksum_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = memory_env(dir.path());
        let id = upload(&mut env, dir.path(), 100);
        let cluster = env.cluster().unwrap();
        let manifest = cluster.get_manifest(&FileId::new(id.clone())).unwrap();
        let chunk = &manifest.chunks[0];
        for node in chunk.placements().into_iter().flatten() {
            cluster
                .registry()
                .write_chunk(node, &chunk.chunk_id, bytes::Bytes::from_static(b"junk"))
                .unwrap();
        }

        let out = FileCommands::Verify(FileArg { file_id: id.clone() })
            .execute(&mut env)
            .unwrap();
        let error = out.table.last().unwrap();
        assert_eq!(error[0], "Error");
        assert!(error[1].starts_with("Storage::ChecksumMismatch(4080)"));

        let err = FileCommands::Download(FileArg { file_id: id })
            .execute(&mut env)
            .unwrap_err();
        assert!(err.to_string().contains("ChecksumMismatch"));
    }

    #[test]
    fn test_delete_then_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = memory_env(dir.path());
        let id = upload(&mut env, dir.path(), 100);

        let out = FileCommands::Delete(FileArg { file_id: id.clone() })
            .execute(&mut env)
            .unwrap();
        assert_eq!(out.table[1], vec!["Copies removed", "4"]);

        let err = FileCommands::Show(FileArg { file_id: id.clone() })
            .execute(&mut env)
            .unwrap_err();
        assert!(err.to_string().contains(&id));
    }

    #[test]
    fn test_upload_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = memory_env(dir.path());
        let err = FileCommands::Upload(UploadArgs {
            path: dir.path().join("nope.bin"),
        })
        .execute(&mut env)
        .unwrap_err();
        assert!(format!("{:#}", err).contains("nope.bin"));
    }
}
