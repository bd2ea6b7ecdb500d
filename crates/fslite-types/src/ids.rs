use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::status::Status;
use crate::status_code::MgmtdCode;

strong_type!(NodeId, u32, "node_");
string_type!(FileId);
string_type!(ChunkId);

impl FileId {
    /// Length of generated file ids.
    pub const GENERATED_LEN: usize = 8;

    /// Build a file id from the first eight hex characters of a random UUID.
    pub fn generate() -> Self {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        Self(raw[..Self::GENERATED_LEN].to_string())
    }
}

impl ChunkId {
    /// The id of chunk `index` of `file_id`, formatted `"{file_id}_{index}"`.
    pub fn for_chunk(file_id: &FileId, index: u32) -> Self {
        Self(format!("{}_{}", file_id, index))
    }

    /// Whether this chunk id belongs to `file_id`.
    pub fn belongs_to(&self, file_id: &FileId) -> bool {
        self.0
            .strip_prefix(file_id.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .map(|idx| !idx.is_empty() && idx.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false)
    }
}

/// Operator-controlled availability of a storage node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeStatus {
    #[default]
    Online,
    Offline,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Online => "ONLINE",
            NodeStatus::Offline => "OFFLINE",
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, NodeStatus::Online)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeStatus {
    type Err = Status;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ONLINE" => Ok(NodeStatus::Online),
            "OFFLINE" => Ok(NodeStatus::Offline),
            other => Err(Status::with_message(
                MgmtdCode::INVALID_NODE_STATUS,
                format!("invalid node status {:?}, expected ONLINE or OFFLINE", other),
            )),
        }
    }
}
