//! Node commands: list nodes and change their status.

use clap::{Args, Subcommand};
use fslite_types::{NodeId, NodeStatus};

use crate::connection::AdminEnv;
use crate::output::{format_bytes, kv_row, table_with_header, CommandOutput};

#[derive(Debug, Subcommand)]
pub enum NodeCommands {
    /// List every node with its status and usage.
    List,

    /// Mark a node OFFLINE.
    Fail(NodeArg),

    /// Mark a node ONLINE and run a repair pass.
    Recover(NodeArg),

    /// Set a node's status explicitly.
    SetStatus(SetStatus),
}

#[derive(Debug, Args)]
pub struct NodeArg {
    /// Node id, as `node_2` or `2`.
    pub node: NodeId,
}

#[derive(Debug, Args)]
pub struct SetStatus {
    pub node: NodeId,

    /// ONLINE or OFFLINE.
    pub status: NodeStatus,
}

impl NodeCommands {
    pub fn execute(&self, env: &mut AdminEnv) -> anyhow::Result<CommandOutput> {
        match self {
            Self::List => execute_list(env),
            Self::Fail(args) => execute_set_status(env, args.node, NodeStatus::Offline),
            Self::Recover(args) => execute_recover(env, args),
            Self::SetStatus(args) => execute_set_status(env, args.node, args.status),
        }
    }
}

fn execute_list(env: &mut AdminEnv) -> anyhow::Result<CommandOutput> {
    let nodes = env.cluster()?.list_nodes()?;
    let mut table = table_with_header(&["Node", "Status", "Chunks", "Used", "Max", "Free"]);
    for node in &nodes {
        table.push(vec![
            node.node_id.to_string(),
            node.status.to_string(),
            node.chunk_count.to_string(),
            format_bytes(node.used_storage),
            format_bytes(node.max_storage),
            format_bytes(node.free_storage()),
        ]);
    }
    CommandOutput::table(table).with_value(&nodes)
}

fn execute_set_status(
    env: &mut AdminEnv,
    node: NodeId,
    status: NodeStatus,
) -> anyhow::Result<CommandOutput> {
    let previous = env.cluster()?.set_node_status(node, status)?;
    let table = vec![
        kv_row("Node", node),
        kv_row("Previous", previous),
        kv_row("Status", status),
    ];
    CommandOutput::table(table).with_value(&serde_json::json!({
        "node": node.to_string(),
        "previous": previous,
        "status": status,
    }))
}

fn execute_recover(env: &mut AdminEnv, args: &NodeArg) -> anyhow::Result<CommandOutput> {
    let report = env.cluster()?.recover_node(args.node)?;
    let table = vec![
        kv_row("Node", args.node),
        kv_row("Status", NodeStatus::Online),
        kv_row("Chunks repaired", report.chunks_repaired),
        kv_row("Unrepairable", report.chunks_unrepairable),
    ];
    CommandOutput::table(table).with_value(&report)
}
