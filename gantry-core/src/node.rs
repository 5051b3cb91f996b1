use serde::{Deserialize, Serialize};

use crate::{NodeId, ResourceSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    #[default]
    Alive,
    Dead,
}

/// Node registration as delivered by the membership source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeInfo {
    pub node_id: NodeId,
    pub node_manager_address: String,
    pub resources_total: ResourceSet,
    pub state: NodeState,
}

impl NodeInfo {
    pub fn new(node_id: NodeId, resources_total: ResourceSet) -> Self {
        NodeInfo {
            node_id,
            resources_total,
            ..Default::default()
        }
    }
}

/// Capacity change applied through UpdateResources or DeleteResources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeResourceChange {
    pub node_id: NodeId,
    pub updated_resources: ResourceSet,
    pub deleted_resources: Vec<String>,
    // Node total after the change was applied
    pub resources_total: ResourceSet,
}
