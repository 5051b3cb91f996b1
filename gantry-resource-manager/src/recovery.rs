use gantry_core::{NodeId, ResourceSet};
use gantry_metadata_store::{join_path, MetadataStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    errors::{ResourceManagerError, Result},
    manager::ResourceManager,
};

/// Table of persisted node totals, one key per node: `/cluster/node_resources/{node_id}`.
pub const BASE_NODE_RESOURCES_PATH: &str = "/cluster/node_resources";

pub fn node_resources_path(node_id: &NodeId) -> String {
    join_path(&[BASE_NODE_RESOURCES_PATH, &node_id.to_hex()])
}

/// Persisted total capacity of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResourceRecord {
    pub node_id: NodeId,
    pub resources_total: ResourceSet,
}

/// Node resource records read from the metadata store before the manager starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitData {
    pub node_resources: Vec<NodeResourceRecord>,
}

impl InitData {
    /// Reads every record under `BASE_NODE_RESOURCES_PATH`.
    ///
    /// Fails as a whole on the first unreadable record, so a partially loaded
    /// table is never handed to the manager.
    pub async fn load(store: &dyn MetadataStore) -> Result<Self> {
        let entries = store
            .get_bulk(BASE_NODE_RESOURCES_PATH)
            .await
            .map_err(|err| ResourceManagerError::RecoveryFailed {
                path: BASE_NODE_RESOURCES_PATH.to_string(),
                reason: err.to_string(),
            })?;

        let mut node_resources = Vec::with_capacity(entries.len());
        for entry in entries {
            let record: NodeResourceRecord =
                serde_json::from_slice(&entry.value).map_err(|err| {
                    ResourceManagerError::RecoveryFailed {
                        path: entry.key.clone(),
                        reason: err.to_string(),
                    }
                })?;
            debug!(key = %entry.key, version = entry.version, "read node resource record");
            node_resources.push(record);
        }
        node_resources.sort_by(|a, b| a.node_id.cmp(&b.node_id));

        Ok(InitData { node_resources })
    }
}

impl ResourceManager {
    /// Replays the persisted node totals into the ledger.
    ///
    /// Runs once, before the control loop accepts any request. Recovered nodes
    /// are not written back to the store, and listeners are notified once at the end.
    pub fn initialize(&mut self, init_data: &InitData) -> Result<()> {
        if self.initialized {
            return Err(ResourceManagerError::AlreadyInitialized);
        }

        for record in &init_data.node_resources {
            self.ledger
                .add_node(record.node_id, record.resources_total.clone());
        }
        self.initialized = true;

        info!(
            nodes = init_data.node_resources.len(),
            "resource ledger recovered from metadata store"
        );
        if !init_data.node_resources.is_empty() {
            self.notify_resources_changed();
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}
