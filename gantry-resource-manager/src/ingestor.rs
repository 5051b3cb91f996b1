use gantry_core::{NodeId, PlacementGroupLoad, ResourceDelta, ResourceDemand, ResourceSet, ResourcesData};
use metrics::counter;
use std::collections::HashMap;
use tracing::debug;

use crate::{
    broadcast_buffer::BroadcastBuffer, ledger::ResourceLedger,
    resource_metrics::NORMAL_TASK_REPORTS_DROPPED_TOTAL,
};

/// ReportIngestor reconciles node usage reports against the ledger.
///
/// It keeps the latest report of every node, the timestamp of the last applied
/// normal task record per node and the cluster-wide placement group load.
/// Normal task records arrive from two producers (the node's periodic reporter
/// and the correction of a rejected lease) and are ordered by timestamp: only a
/// strictly newer record is applied.
#[derive(Debug)]
pub struct ReportIngestor {
    node_resource_usages: HashMap<NodeId, ResourcesData>,
    latest_normal_task_timestamp: HashMap<NodeId, i64>,
    placement_group_load: Option<PlacementGroupLoad>,
    buffer: BroadcastBuffer,
}

impl ReportIngestor {
    pub fn new(buffer: BroadcastBuffer) -> Self {
        ReportIngestor {
            node_resource_usages: HashMap::new(),
            latest_normal_task_timestamp: HashMap::new(),
            placement_group_load: None,
            buffer,
        }
    }

    /// Full reconciliation of a heartbeat report.
    ///
    /// A report carrying a normal task record updates availability through the
    /// timestamp-ordered path only. Otherwise the reported available resources
    /// are applied on the node's first report, or whenever they changed.
    pub fn ingest(&mut self, ledger: &mut ResourceLedger, node_id: NodeId, report: ResourcesData) {
        if let Some(record) = report.normal_task_record() {
            self.apply_normal_task_resources(ledger, node_id, &record.resources, record.timestamp);
        } else if report.resources_available_changed
            || !self.node_resource_usages.contains_key(&node_id)
        {
            ledger.set_available(&node_id, report.resources_available.clone());
        }

        self.apply_report(node_id, report);
    }

    /// Stores `report` as the latest snapshot of the node and queues its delta for broadcast.
    pub fn apply_report(&mut self, node_id: NodeId, report: ResourcesData) {
        self.buffer
            .add_delta(node_id, ResourceDelta::from_report(node_id, &report));
        self.node_resource_usages.insert(node_id, report);
    }

    /// Applies the record if `timestamp` is newer than the last applied one.
    ///
    /// Returns whether the ledger was updated. Stale records are dropped silently.
    pub fn apply_normal_task_resources(
        &mut self,
        ledger: &mut ResourceLedger,
        node_id: NodeId,
        resources: &ResourceSet,
        timestamp: i64,
    ) -> bool {
        if let Some(latest) = self.latest_normal_task_timestamp.get(&node_id) {
            if timestamp <= *latest {
                debug!(
                    node_id = %node_id,
                    timestamp,
                    latest,
                    "dropping stale normal task resources"
                );
                counter!(NORMAL_TASK_REPORTS_DROPPED_TOTAL.name).increment(1);
                return false;
            }
        }

        if !ledger.set_normal_task_resources(&node_id, resources) {
            return false;
        }
        self.latest_normal_task_timestamp.insert(node_id, timestamp);
        true
    }

    /// Replaces the cluster-wide placement group load.
    pub fn apply_placement_group_load(&mut self, load: PlacementGroupLoad) {
        self.placement_group_load = Some(load);
    }

    /// Forgets everything known about a dead node, including its unflushed delta.
    pub fn forget_node(&mut self, node_id: &NodeId) {
        self.node_resource_usages.remove(node_id);
        self.latest_normal_task_timestamp.remove(node_id);
        self.buffer.remove(node_id);
    }

    pub fn latest_report(&self, node_id: &NodeId) -> Option<&ResourcesData> {
        self.node_resource_usages.get(node_id)
    }

    pub fn latest_normal_task_timestamp(&self, node_id: &NodeId) -> Option<i64> {
        self.latest_normal_task_timestamp.get(node_id).copied()
    }

    pub fn placement_group_load(&self) -> Option<&PlacementGroupLoad> {
        self.placement_group_load.as_ref()
    }

    /// Latest report of every node, ordered by node id.
    pub fn resource_usages(&self) -> Vec<ResourcesData> {
        let mut usages: Vec<ResourcesData> = self.node_resource_usages.values().cloned().collect();
        usages.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        usages
    }

    /// Queued demand of all nodes, summed per request shape.
    pub fn aggregate_load_by_shape(&self) -> Vec<ResourceDemand> {
        let mut aggregated: Vec<ResourceDemand> = Vec::new();
        for report in self.resource_usages() {
            for demand in &report.resource_load_by_shape {
                match aggregated.iter_mut().find(|d| d.shape == demand.shape) {
                    Some(existing) => existing.merge(demand),
                    None => aggregated.push(demand.clone()),
                }
            }
        }
        aggregated
    }
}
