use serde::{Deserialize, Serialize};

use crate::{NodeId, ResourceSet};

// ResourcesData is the usage report a node sends on every heartbeat.
//
// It is a full snapshot: the resource manager keeps only the latest one per node.
// The `*_changed` flags tell which parts differ from the previous report, so that
// only those parts are forwarded in the lightweight broadcast delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesData {
    pub node_id: NodeId,
    // Resources currently free on the node
    pub resources_available: ResourceSet,
    pub resources_available_changed: bool,
    // Total capacity of the node, may be empty when unchanged
    pub resources_total: ResourceSet,
    // Aggregate demand queued on the node
    pub resource_load: ResourceSet,
    pub resource_load_changed: bool,
    // Queued demand broken down by request shape
    pub resource_load_by_shape: Vec<ResourceDemand>,
    // Resources attributable to normal tasks, ordered by timestamp
    pub resources_normal_task: ResourceSet,
    pub resources_normal_task_changed: bool,
    pub resources_normal_task_timestamp: i64,
    pub node_manager_address: String,
    pub should_global_gc: bool,
    pub cluster_full_of_actors_detected: bool,
}

impl ResourcesData {
    pub fn new(node_id: NodeId) -> Self {
        ResourcesData {
            node_id,
            ..Default::default()
        }
    }

    /// The timestamped normal-task record carried by this report, if any.
    pub fn normal_task_record(&self) -> Option<NormalTaskResources> {
        self.resources_normal_task_changed
            .then(|| NormalTaskResources {
                resources: self.resources_normal_task.clone(),
                timestamp: self.resources_normal_task_timestamp,
            })
    }
}

/// Resources consumed by normal tasks on a node, stamped by its producer.
///
/// Two producers emit these for the same node: the periodic reporter and the
/// correction carried by a rejected lease. The higher timestamp wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalTaskResources {
    pub resources: ResourceSet,
    pub timestamp: i64,
}

/// Demand for one resource shape queued on a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceDemand {
    pub shape: ResourceSet,
    pub num_ready_requests_queued: u64,
    pub num_infeasible_requests_queued: u64,
    pub backlog_size: i64,
}

impl ResourceDemand {
    pub fn merge(&mut self, other: &ResourceDemand) {
        self.num_ready_requests_queued += other.num_ready_requests_queued;
        self.num_infeasible_requests_queued += other.num_infeasible_requests_queued;
        self.backlog_size += other.backlog_size;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStrategy {
    Pack,
    Spread,
    StrictPack,
    StrictSpread,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPlacementGroup {
    pub placement_group_id: String,
    pub strategy: PlacementStrategy,
    pub bundles: Vec<ResourceSet>,
}

/// Cluster-wide pending placement group demand, consumed by the autoscaler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementGroupLoad {
    pub placement_groups: Vec<PendingPlacementGroup>,
}

/// The part of a usage report that changed, queued for broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDelta {
    pub node_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources_available: Option<ResourceSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources_total: Option<ResourceSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_load: Option<ResourceSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources_normal_task: Option<ResourceSet>,
}

impl ResourceDelta {
    pub fn from_report(node_id: NodeId, report: &ResourcesData) -> Self {
        ResourceDelta {
            node_id,
            resources_available: report
                .resources_available_changed
                .then(|| report.resources_available.clone()),
            resources_total: (!report.resources_total.is_empty())
                .then(|| report.resources_total.clone()),
            resource_load: report
                .resource_load_changed
                .then(|| report.resource_load.clone()),
            resources_normal_task: report
                .resources_normal_task_changed
                .then(|| report.resources_normal_task.clone()),
        }
    }
}

/// A flushed set of deltas, the payload of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsageBatch {
    pub batch: Vec<ResourceDelta>,
}

impl ResourceUsageBatch {
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}
