//! Request/reply pairs of the node resource info service.
//!
//! These describe the parameters of each operation, not a wire format: the
//! transport that carries them is provided by the embedding control plane.

use serde::{Deserialize, Serialize};

use crate::{NodeId, PlacementGroupLoad, ResourceDemand, ResourceSet, ResourcesData};

/// Outcome attached to every reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", content = "message", rename_all = "snake_case")]
pub enum Status {
    #[default]
    Ok,
    NotFound(String),
    InvalidArgument(String),
}

impl Status {
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResourcesRequest {
    pub node_id: NodeId,
}

/// Both sets are empty when the node is unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetResourcesReply {
    pub status: Status,
    pub resources_total: ResourceSet,
    pub resources_available: ResourceSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResourcesRequest {
    pub node_id: NodeId,
    pub resources: ResourceSet,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateResourcesReply {
    pub status: Status,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResourcesRequest {
    pub node_id: NodeId,
    pub resource_name_list: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteResourcesReply {
    pub status: Status,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetAllAvailableResourcesRequest {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableResources {
    pub node_id: NodeId,
    pub resources_available: ResourceSet,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetAllAvailableResourcesReply {
    pub status: Status,
    // Ordered by node id
    pub resources_list: Vec<AvailableResources>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResourceUsageRequest {
    pub resources: ResourcesData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportResourceUsageReply {
    pub status: Status,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetAllResourceUsageRequest {}

/// Cluster-wide usage view used by the autoscaler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsageSnapshot {
    // Latest report of every node, ordered by node id
    pub batch: Vec<ResourcesData>,
    // Demand summed across nodes per request shape
    pub resource_load_by_shape: Vec<ResourceDemand>,
    pub placement_group_load: Option<PlacementGroupLoad>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetAllResourceUsageReply {
    pub status: Status,
    pub resource_usage_data: ResourceUsageSnapshot,
}
