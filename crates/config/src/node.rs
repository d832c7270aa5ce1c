//! Node identity and fleet membership

use serde::Deserialize;

/// Identity of this node within the fleet
///
/// `node_id` is written into every accepted message and drives the
/// consumer partition assignment. `node_list` must agree across the fleet;
/// it is sorted on load so every node computes the same assignment. An
/// empty list disables partitioning (every node consumes every room).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Identity used by the partitioner and stamped into queue messages
    pub node_id: String,

    /// All peer node ids; empty disables partitioning
    pub node_list: Vec<String>,

    /// Number of rooms in the fabric
    /// Default: 20
    pub rooms: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: "node-1".into(),
            node_list: Vec::new(),
            rooms: 20,
        }
    }
}

impl NodeConfig {
    /// Whether consumer partitioning is in effect
    pub fn partitioning_enabled(&self) -> bool {
        !self.node_list.is_empty()
    }
}
