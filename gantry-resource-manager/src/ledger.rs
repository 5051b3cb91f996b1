use gantry_core::{NodeId, ResourceSet};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use tracing::{debug, warn};

/// Total and available resources of one node.
///
/// Invariant: every resource in `available` is present in `total`, with a
/// quantity no greater than its total.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchedulingResources {
    total: ResourceSet,
    available: ResourceSet,
    // Last applied normal task record
    normal_task: ResourceSet,
}

impl SchedulingResources {
    pub fn new(total: ResourceSet) -> Self {
        SchedulingResources {
            available: total.clone(),
            total,
            normal_task: ResourceSet::new(),
        }
    }

    pub fn total(&self) -> &ResourceSet {
        &self.total
    }

    pub fn available(&self) -> &ResourceSet {
        &self.available
    }

    pub fn normal_task(&self) -> &ResourceSet {
        &self.normal_task
    }
}

impl Display for SchedulingResources {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "total={} available={}", self.total, self.available)
    }
}

/// ResourceLedger - authoritative record of every node's total and available resources.
///
/// The ledger is not synchronized: it is owned by the resource manager control
/// loop and every mutation is serialized through it.
/// Operations against an unknown node never fail loudly, they report `false`
/// and leave the ledger untouched, since node removal races with in-flight
/// requests in normal operation.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    nodes: HashMap<NodeId, SchedulingResources>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        ResourceLedger {
            nodes: HashMap::new(),
        }
    }

    /// Inserts the node with all of its resources available, replacing any existing entry.
    pub fn add_node(&mut self, node_id: NodeId, total: ResourceSet) {
        if self
            .nodes
            .insert(node_id, SchedulingResources::new(total))
            .is_some()
        {
            debug!(node_id = %node_id, "replaced existing ledger entry");
        }
    }

    /// Returns whether the node was present.
    pub fn remove_node(&mut self, node_id: &NodeId) -> bool {
        self.nodes.remove(node_id).is_some()
    }

    /// Replaces the available set of the node.
    ///
    /// Resources unknown to the node's total are dropped and quantities are capped at the total.
    /// A set holding a negative or non-finite quantity is rejected.
    pub fn set_available(&mut self, node_id: &NodeId, available: ResourceSet) -> bool {
        let Some(node) = self.nodes.get_mut(node_id) else {
            warn!(node_id = %node_id, "ignoring available resources of unknown node");
            return false;
        };
        if available.has_invalid_quantity() {
            warn!(node_id = %node_id, available = %available, "rejecting invalid available resources");
            return false;
        }

        let mut available = available;
        available.clamp_to(&node.total);
        node.available = available;
        true
    }

    /// All-or-nothing deduction of `requested` from the node's available resources.
    pub fn acquire(&mut self, node_id: &NodeId, requested: &ResourceSet) -> bool {
        let Some(node) = self.nodes.get_mut(node_id) else {
            debug!(node_id = %node_id, "acquire against unknown node");
            return false;
        };

        if requested.has_invalid_quantity() || !requested.is_subset_of(&node.available) {
            return false;
        }

        for (name, quantity) in requested {
            let remaining = node.available.quantity(name) - quantity;
            node.available.set(name.clone(), remaining);
        }
        true
    }

    /// Adds `amounts` back to the node's available resources, capped at the total.
    ///
    /// Amounts of resources the node does not have, or in excess of its total, are dropped.
    pub fn release(&mut self, node_id: &NodeId, amounts: &ResourceSet) -> bool {
        let Some(node) = self.nodes.get_mut(node_id) else {
            debug!(node_id = %node_id, "release against unknown node");
            return false;
        };

        if amounts.has_invalid_quantity() {
            return false;
        }

        for (name, quantity) in amounts {
            let Some(total) = node.total.get(name) else {
                continue;
            };
            let released = (node.available.quantity(name) + quantity).min(total);
            node.available.set(name.clone(), released);
        }
        true
    }

    /// Sets each changed resource in both total and available, adding it when absent.
    pub fn update_capacity(&mut self, node_id: &NodeId, changed: &ResourceSet) -> bool {
        let Some(node) = self.nodes.get_mut(node_id) else {
            warn!(node_id = %node_id, "ignoring capacity update of unknown node");
            return false;
        };
        if changed.has_invalid_quantity() {
            warn!(node_id = %node_id, changed = %changed, "rejecting invalid capacity update");
            return false;
        }

        for (name, capacity) in changed {
            node.total.set(name.clone(), *capacity);
            node.available.set(name.clone(), *capacity);
        }
        true
    }

    /// Removes the named resources from both total and available.
    pub fn delete_resources(&mut self, node_id: &NodeId, names: &[String]) -> bool {
        let Some(node) = self.nodes.get_mut(node_id) else {
            warn!(node_id = %node_id, "ignoring resource deletion of unknown node");
            return false;
        };

        for name in names {
            node.total.remove(name);
            node.available.remove(name);
            node.normal_task.remove(name);
        }
        true
    }

    /// Applies the normal task resources to the node's available resources.
    ///
    /// Only resources present in the node's total are applied, each capped at its total.
    pub fn set_normal_task_resources(&mut self, node_id: &NodeId, resources: &ResourceSet) -> bool {
        let Some(node) = self.nodes.get_mut(node_id) else {
            debug!(node_id = %node_id, "normal task resources of unknown node");
            return false;
        };
        if resources.has_invalid_quantity() {
            warn!(node_id = %node_id, resources = %resources, "rejecting invalid normal task resources");
            return false;
        }

        for (name, quantity) in resources {
            let Some(total) = node.total.get(name) else {
                continue;
            };
            node.available.set(name.clone(), quantity.min(total));
        }
        node.normal_task = resources.clone();
        true
    }

    pub fn get(&self, node_id: &NodeId) -> Option<&SchedulingResources> {
        self.nodes.get(node_id)
    }

    pub fn get_all(&self) -> &HashMap<NodeId, SchedulingResources> {
        &self.nodes
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Display for ResourceLedger {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut node_ids: Vec<&NodeId> = self.nodes.keys().collect();
        node_ids.sort();

        write!(f, "cluster resources: {{")?;
        for node_id in node_ids {
            write!(f, "\n  node id: {}, {}", node_id, self.nodes[node_id])?;
        }
        write!(f, "\n}}")
    }
}
