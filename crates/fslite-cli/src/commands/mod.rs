//! CLI command definitions and handlers, one module per subcommand group.

pub mod admin;
pub mod cluster;
pub mod file;
pub mod node;

pub use admin::AdminCommands;
