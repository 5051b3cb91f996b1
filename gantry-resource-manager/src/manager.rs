use gantry_core::{
    NodeId, NodeInfo, NodeResourceChange, NodeState, PlacementGroupLoad, ResourceSet, ResourcesData,
};
use metrics::{counter, gauge};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    broadcast_buffer::BroadcastBuffer,
    handlers::RequestCounters,
    ingestor::ReportIngestor,
    ledger::{ResourceLedger, SchedulingResources},
    listeners::{ListenerRegistry, ResourcesChangedListener},
    resource_metrics::{LEDGER_NODES, RESOURCE_ACQUIRE_TOTAL, RESOURCE_RELEASE_TOTAL},
};

/// Changes of the persisted node resource table, emitted by the resource manager
/// and applied by the change feed.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeResourceEvent {
    /// A node joined; its total capacity should be persisted.
    Registered {
        node_id: NodeId,
        resources_total: ResourceSet,
    },
    /// Capacity changed through UpdateResources or DeleteResources.
    Changed(NodeResourceChange),
    /// The node died; its persisted record should be dropped.
    Removed(NodeId),
}

/// ResourceManager - owner of the cluster resource ledger
///
/// Groups the ledger with the components that keep it current:
/// - the report ingestor, reconciling heartbeats and normal task records
/// - the broadcast buffer, fed with a delta on every report
/// - the listener registry, notified once per state-changing call
/// - the per-operation request counters
///
/// The manager is not thread safe. It lives inside the control loop of
/// `ResourceManagerService`, and every caller goes through the service handle.
#[derive(Debug)]
pub struct ResourceManager {
    pub(crate) ledger: ResourceLedger,
    pub(crate) ingestor: ReportIngestor,
    pub(crate) listeners: ListenerRegistry,
    pub(crate) counters: RequestCounters,
    buffer: BroadcastBuffer,
    change_tx: Option<mpsc::UnboundedSender<NodeResourceEvent>>,
    pub(crate) initialized: bool,
}

impl ResourceManager {
    pub fn new(buffer: BroadcastBuffer) -> Self {
        ResourceManager {
            ledger: ResourceLedger::new(),
            ingestor: ReportIngestor::new(buffer.clone()),
            listeners: ListenerRegistry::new(),
            counters: RequestCounters::default(),
            buffer,
            change_tx: None,
            initialized: false,
        }
    }

    /// Sends persisted-table changes to `change_tx`, usually the change feed.
    pub fn with_change_sender(mut self, change_tx: mpsc::UnboundedSender<NodeResourceEvent>) -> Self {
        self.change_tx = Some(change_tx);
        self
    }

    pub fn broadcast_buffer(&self) -> &BroadcastBuffer {
        &self.buffer
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub fn ingestor(&self) -> &ReportIngestor {
        &self.ingestor
    }

    pub fn add_resources_changed_listener(&mut self, listener: ResourcesChangedListener) {
        self.listeners.register(listener);
    }

    pub(crate) fn notify_resources_changed(&mut self) {
        self.listeners.notify_all();
    }

    pub(crate) fn emit(&self, event: NodeResourceEvent) {
        if let Some(tx) = &self.change_tx {
            if tx.send(event).is_err() {
                warn!("node resource change feed is closed, dropping event");
            }
        }
    }

    fn record_node_count(&self) {
        gauge!(LEDGER_NODES.name).set(self.ledger.len() as f64);
    }

    // Membership ----------------------------------------------------

    /// Registers a node with all of its resources available.
    ///
    /// An already known node is replaced wholesale.
    pub fn on_node_add(&mut self, node: &NodeInfo) {
        if node.state == NodeState::Dead {
            debug!(node_id = %node.node_id, "ignoring registration of a dead node");
            return;
        }

        self.ledger
            .add_node(node.node_id, node.resources_total.clone());
        info!(
            node_id = %node.node_id,
            resources_total = %node.resources_total,
            "node added to resource ledger"
        );
        self.record_node_count();
        self.emit(NodeResourceEvent::Registered {
            node_id: node.node_id,
            resources_total: node.resources_total.clone(),
        });
        self.notify_resources_changed();
    }

    /// Removes the node and everything reported by it. Returns whether it was known.
    pub fn on_node_dead(&mut self, node_id: &NodeId) -> bool {
        self.ingestor.forget_node(node_id);
        let existed = self.ledger.remove_node(node_id);
        if existed {
            info!(node_id = %node_id, "node removed from resource ledger");
            self.record_node_count();
            self.emit(NodeResourceEvent::Removed(*node_id));
            self.notify_resources_changed();
        } else {
            debug!(node_id = %node_id, "node dead event for unknown node");
        }
        existed
    }

    // Ledger operations ---------------------------------------------

    pub fn set_available_resources(&mut self, node_id: &NodeId, resources: ResourceSet) -> bool {
        if !self.ledger.set_available(node_id, resources) {
            return false;
        }
        self.notify_resources_changed();
        true
    }

    /// Deducts `resources` from the node, all or nothing.
    pub fn acquire_resources(&mut self, node_id: &NodeId, resources: &ResourceSet) -> bool {
        let acquired = self.ledger.acquire(node_id, resources);
        counter!(RESOURCE_ACQUIRE_TOTAL.name, "result" => if acquired { "ok" } else { "rejected" })
            .increment(1);
        if acquired {
            self.notify_resources_changed();
        }
        acquired
    }

    /// Returns `resources` to the node, capped at its total.
    pub fn release_resources(&mut self, node_id: &NodeId, resources: &ResourceSet) -> bool {
        let released = self.ledger.release(node_id, resources);
        counter!(RESOURCE_RELEASE_TOTAL.name, "result" => if released { "ok" } else { "rejected" })
            .increment(1);
        if released {
            self.notify_resources_changed();
        }
        released
    }

    pub fn update_resource_capacity(&mut self, node_id: &NodeId, changed: &ResourceSet) -> bool {
        if !self.ledger.update_capacity(node_id, changed) {
            return false;
        }
        self.notify_resources_changed();
        true
    }

    pub fn delete_resources(&mut self, node_id: &NodeId, names: &[String]) -> bool {
        if !self.ledger.delete_resources(node_id, names) {
            return false;
        }
        self.notify_resources_changed();
        true
    }

    // Ingestion -----------------------------------------------------

    /// Reconciles a heartbeat report of the node that sent it.
    pub fn update_from_resource_report(&mut self, report: ResourcesData) {
        let node_id = report.node_id;
        self.ingestor.ingest(&mut self.ledger, node_id, report);
        self.notify_resources_changed();
    }

    /// Applies a normal task record, typically the correction from a rejected lease.
    pub fn update_node_normal_task_resources(
        &mut self,
        node_id: NodeId,
        resources: &ResourceSet,
        timestamp: i64,
    ) -> bool {
        let applied =
            self.ingestor
                .apply_normal_task_resources(&mut self.ledger, node_id, resources, timestamp);
        if applied {
            self.notify_resources_changed();
        }
        applied
    }

    pub fn update_placement_group_load(&mut self, load: PlacementGroupLoad) {
        self.ingestor.apply_placement_group_load(load);
        self.notify_resources_changed();
    }

    // Views ---------------------------------------------------------

    pub fn get_cluster_resources(&self) -> &HashMap<NodeId, SchedulingResources> {
        self.ledger.get_all()
    }

    pub fn get_node_resources(&self, node_id: &NodeId) -> Option<&SchedulingResources> {
        self.ledger.get(node_id)
    }

    /// Every node's total and available resources, one node per line.
    pub fn cluster_resources_string(&self) -> String {
        self.ledger.to_string()
    }
}
