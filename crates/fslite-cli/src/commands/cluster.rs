//! Cluster-wide maintenance: health, repair, cleanup and reset.

use clap::{Args, Subcommand};
use fslite_types::{CliCode, Status};

use crate::connection::AdminEnv;
use crate::output::{format_node, kv_row, table_with_header, CommandOutput};

#[derive(Debug, Subcommand)]
pub enum ClusterCommands {
    /// Scan every chunk and report the cluster status.
    Health(HealthArgs),

    /// Re-copy under-replicated chunks onto healthy nodes.
    Repair,

    /// Drop surplus copies so every chunk has exactly two.
    Cleanup,

    /// Delete every chunk and manifest. Node status is kept.
    Reset(ResetArgs),
}

#[derive(Debug, Args)]
pub struct HealthArgs {
    /// List every chunk that is not healthy.
    #[arg(long)]
    pub details: bool,
}

#[derive(Debug, Args)]
pub struct ResetArgs {
    /// Confirm the reset.
    #[arg(long)]
    pub yes: bool,
}

impl ClusterCommands {
    pub fn execute(&self, env: &mut AdminEnv) -> anyhow::Result<CommandOutput> {
        match self {
            Self::Health(args) => execute_health(env, args),
            Self::Repair => execute_repair(env),
            Self::Cleanup => execute_cleanup(env),
            Self::Reset(args) => execute_reset(env, args),
        }
    }
}

fn execute_health(env: &mut AdminEnv, args: &HealthArgs) -> anyhow::Result<CommandOutput> {
    let report = env.cluster()?.scan_health()?;
    let mut table = vec![
        kv_row("Status", report.status),
        kv_row("Files", report.total_files),
        kv_row("Chunks", report.total_chunks),
        kv_row("Healthy", report.healthy_chunks),
        kv_row("Under-replicated", report.under_replicated_chunks),
        kv_row("Missing", report.missing_chunks),
        kv_row("Corrupted", report.corrupted_chunks),
    ];
    if args.details {
        let problems: Vec<_> = report.problems().collect();
        if !problems.is_empty() {
            table.push(vec![]);
            table.extend(table_with_header(&[
                "Chunk", "State", "Copies", "Primary", "Replica",
            ]));
            for c in problems {
                table.push(vec![
                    c.chunk_id.to_string(),
                    c.state.to_string(),
                    c.copies_available.to_string(),
                    format_node(c.primary_node),
                    format_node(c.replica_node),
                ]);
            }
        }
    }
    CommandOutput::table(table).with_value(&report)
}

fn execute_repair(env: &mut AdminEnv) -> anyhow::Result<CommandOutput> {
    let report = env.cluster()?.repair()?;
    let table = vec![
        kv_row("Files scanned", report.files_scanned),
        kv_row("Chunks repaired", report.chunks_repaired),
        kv_row("Unrepairable", report.chunks_unrepairable),
        kv_row("No target node", report.chunks_without_target),
        kv_row("Manifests updated", report.manifests_updated),
        kv_row("Failed files", report.files_failed),
    ];
    CommandOutput::table(table).with_value(&report)
}

fn execute_cleanup(env: &mut AdminEnv) -> anyhow::Result<CommandOutput> {
    let report = env.cluster()?.cleanup()?;
    let table = vec![
        kv_row("Files scanned", report.files_scanned),
        kv_row("Chunks pruned", report.chunks_pruned),
        kv_row("Copies removed", report.copies_removed),
        kv_row("Manifests updated", report.manifests_updated),
        kv_row("Failed files", report.files_failed),
    ];
    CommandOutput::table(table).with_value(&report)
}

fn execute_reset(env: &mut AdminEnv, args: &ResetArgs) -> anyhow::Result<CommandOutput> {
    if !args.yes {
        return Err(Status::with_message(
            CliCode::WRONG_USAGE,
            "reset deletes every stored file; pass --yes to confirm",
        )
        .into());
    }
    let report = env.cluster()?.reset()?;
    let table = vec![
        kv_row("Chunks removed", report.chunks_removed),
        kv_row("Files removed", report.files_removed),
    ];
    CommandOutput::table(table).with_value(&report)
}
