//! The fslite cluster: placement, health, repair and reconstruction over a
//! fixed set of storage nodes.

pub mod cache;
pub mod cluster;
pub mod config;
pub mod daemon;
pub mod distributor;
pub mod health;
pub mod probe;
pub mod reconstruct;

pub use cache::{CachedOutput, RecencyCache};
pub use cluster::{Cluster, DeleteReport, Download, ResetReport};
pub use config::{Backend, ClusterConfig};
pub use daemon::RepairDaemon;
pub use distributor::{Distributor, UndoLog};
pub use health::{
    ChunkHealth, CleanupReport, HealthMonitor, HealthReport, RepairReport, SystemStatus,
};
pub use probe::{ChunkFetch, ChunkProbe, ChunkState, ReplicaProbe, Unavailable};
pub use reconstruct::{ChunkCheck, ReconstructReport, Reconstructor, Verdict, VerifyReport};
