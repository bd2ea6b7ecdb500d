//! Top-level admin command enum.

use clap::Subcommand;

use super::cluster::ClusterCommands;
use super::file::FileCommands;
use super::node::NodeCommands;
use crate::connection::AdminEnv;
use crate::output::{CommandOutput, OutputFormat, Printer};

/// Admin operations, grouped by what they act on.
#[derive(Debug, Subcommand)]
pub enum AdminCommands {
    /// Storage node commands (list, fail, recover, set-status).
    #[command(subcommand)]
    Node(NodeCommands),

    /// File commands (upload, download, list, show, verify, delete).
    #[command(subcommand)]
    File(FileCommands),

    /// Cluster maintenance (health, repair, cleanup, reset).
    #[command(subcommand)]
    Cluster(ClusterCommands),
}

impl AdminCommands {
    pub fn execute(&self, env: &mut AdminEnv) -> anyhow::Result<CommandOutput> {
        match self {
            Self::Node(cmd) => cmd.execute(env),
            Self::File(cmd) => cmd.execute(env),
            Self::Cluster(cmd) => cmd.execute(env),
        }
    }

    /// Execute and print the result using the given output format.
    pub fn run(&self, env: &mut AdminEnv, output_format: OutputFormat) -> anyhow::Result<()> {
        let mut printer = Printer::stdout(output_format);
        match self.execute(env) {
            Ok(output) => {
                printer.print_output(&output)?;
                Ok(())
            }
            Err(e) => {
                printer.print_error(&format!("{:#}", e))?;
                Err(e)
            }
        }
    }
}
