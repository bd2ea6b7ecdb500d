//! Node management for fslite.
//!
//! The registry owns the fixed node set, tracks each node's ONLINE/OFFLINE
//! status and routes chunk reads and writes to the node's store.

pub mod registry;

pub use registry::{NodeInfo, NodeRegistry};
