use clap::Parser;
use tracing_subscriber::EnvFilter;

use fslite_cli::commands::AdminCommands;
use fslite_cli::connection::{AdminEnv, ClusterOptions};
use fslite_cli::output::OutputFormat;

/// fslite administration tool
///
/// Uploads, downloads and verifies files, changes node status, and runs
/// health scans, repairs and cleanups against the cluster described by
/// the config file.
#[derive(Parser, Debug)]
#[command(name = "fslite-admin", version, about)]
struct Cli {
    #[command(flatten)]
    cluster: ClusterOptions,

    /// Output format (table or json).
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: AdminCommands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .init();

    let mut env = AdminEnv::new(cli.cluster);
    cli.command.run(&mut env, cli.format)
}
