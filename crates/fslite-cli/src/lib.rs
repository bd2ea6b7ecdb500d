//! Operator commands for an fslite cluster.
//!
//! - [`commands::AdminCommands`] groups the `node`, `file` and `cluster`
//!   subcommands.
//! - [`output`] renders results as aligned tables or JSON.
//! - [`connection`] opens the cluster described by a config file.
//!
//! ```ignore
//! use clap::Parser;
//! use fslite_cli::{AdminCommands, AdminEnv, ClusterOptions, OutputFormat};
//!
//! #[derive(Parser)]
//! struct Cli {
//!     #[command(flatten)]
//!     cluster: ClusterOptions,
//!
//!     #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
//!     format: OutputFormat,
//!
//!     #[command(subcommand)]
//!     command: AdminCommands,
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let cli = Cli::parse();
//!     let mut env = AdminEnv::new(cli.cluster);
//!     cli.command.run(&mut env, cli.format)
//! }
//! ```

pub mod commands;
pub mod connection;
pub mod output;

pub use commands::AdminCommands;
pub use connection::{AdminEnv, ClusterOptions};
pub use output::{OutputFormat, OutputTable, Printer};
