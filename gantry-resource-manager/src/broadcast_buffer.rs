use gantry_core::{NodeId, ResourceDelta};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct PendingDeltas {
    deltas: HashMap<NodeId, ResourceDelta>,
    // Flush order, oldest pending node first
    order: VecDeque<NodeId>,
}

/// BroadcastBuffer holds the usage deltas received since the last broadcast.
///
/// It is shared between the control loop, which adds deltas, and the broadcaster
/// task, which flushes them. The lock is held only while a delta is inserted or
/// a batch is copied out, never while the batch is published.
#[derive(Debug, Clone, Default)]
pub struct BroadcastBuffer {
    inner: Arc<Mutex<PendingDeltas>>,
}

impl BroadcastBuffer {
    pub fn new() -> Self {
        BroadcastBuffer::default()
    }

    fn lock(&self) -> MutexGuard<'_, PendingDeltas> {
        // A panic while holding the lock cannot leave the map half-updated
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues `delta`, replacing the unflushed delta of the same node if any.
    ///
    /// A replaced delta keeps its node's position in the flush order.
    pub fn add_delta(&self, node_id: NodeId, delta: ResourceDelta) {
        let mut pending = self.lock();
        if pending.deltas.insert(node_id, delta).is_none() {
            pending.order.push_back(node_id);
        }
    }

    /// Removes and returns up to `max_size` deltas, oldest first.
    ///
    /// Deltas beyond `max_size` stay buffered for the next flush.
    pub fn flush(&self, max_size: usize) -> Vec<ResourceDelta> {
        let mut pending = self.lock();
        let mut batch = Vec::with_capacity(max_size.min(pending.deltas.len()));

        while batch.len() < max_size {
            let Some(node_id) = pending.order.pop_front() else {
                break;
            };
            if let Some(delta) = pending.deltas.remove(&node_id) {
                batch.push(delta);
            }
        }
        batch
    }

    /// Drops the unflushed delta of a node.
    pub fn remove(&self, node_id: &NodeId) -> bool {
        let mut pending = self.lock();
        if pending.deltas.remove(node_id).is_some() {
            pending.order.retain(|id| id != node_id);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.lock().deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().deltas.is_empty()
    }
}
