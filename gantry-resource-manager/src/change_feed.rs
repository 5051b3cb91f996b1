use gantry_metadata_store::MetadataStore;
use metrics::counter;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    errors::{ResourceManagerError, Result},
    manager::NodeResourceEvent,
    publisher::Publisher,
    recovery::{node_resources_path, NodeResourceRecord},
    resource_metrics::BROADCAST_PUBLISH_FAILURES_TOTAL,
};

pub const NODE_RESOURCE_CHANGE_TOPIC: &str = "node_resource_change";

/// Keeps the persisted node resource table in step with the ledger.
///
/// Registrations and capacity changes persist the node's total under
/// `/cluster/node_resources/{node_id}`, removals delete it. Capacity changes are
/// also published on `NODE_RESOURCE_CHANGE_TOPIC`.
pub struct ChangeFeed {
    store: Arc<dyn MetadataStore>,
    publisher: Arc<dyn Publisher>,
}

impl ChangeFeed {
    pub fn new(store: Arc<dyn MetadataStore>, publisher: Arc<dyn Publisher>) -> Self {
        ChangeFeed { store, publisher }
    }

    /// Applies events until the channel closes or `cancel` fires, then drains what is queued.
    pub fn start(
        self,
        mut events: mpsc::UnboundedReceiver<NodeResourceEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("node resource change feed started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        while let Ok(event) = events.try_recv() {
                            self.apply_logged(event).await;
                        }
                        info!("node resource change feed stopped after drain (cancel)");
                        break;
                    }
                    event = events.recv() => {
                        match event {
                            Some(event) => self.apply_logged(event).await,
                            None => {
                                info!("node resource change feed closed");
                                break;
                            }
                        }
                    }
                }
            }
        })
    }

    async fn apply_logged(&self, event: NodeResourceEvent) {
        if let Err(e) = self.apply(event).await {
            error!(error = %e, "failed to apply node resource change");
        }
    }

    pub async fn apply(&self, event: NodeResourceEvent) -> Result<()> {
        match event {
            NodeResourceEvent::Registered {
                node_id,
                resources_total,
            } => {
                self.persist(NodeResourceRecord {
                    node_id,
                    resources_total,
                })
                .await
            }
            NodeResourceEvent::Changed(change) => {
                self.persist(NodeResourceRecord {
                    node_id: change.node_id,
                    resources_total: change.resources_total.clone(),
                })
                .await?;

                let payload = serde_json::to_vec(&change)?;
                if let Err(e) = self
                    .publisher
                    .publish(NODE_RESOURCE_CHANGE_TOPIC, payload)
                    .await
                {
                    counter!(BROADCAST_PUBLISH_FAILURES_TOTAL.name, "topic" => NODE_RESOURCE_CHANGE_TOPIC)
                        .increment(1);
                    return Err(ResourceManagerError::Publish {
                        topic: NODE_RESOURCE_CHANGE_TOPIC.to_string(),
                        reason: e.to_string(),
                    });
                }
                Ok(())
            }
            NodeResourceEvent::Removed(node_id) => {
                let path = node_resources_path(&node_id);
                self.store.delete(&path).await?;
                debug!(path = %path, "deleted node resource record");
                Ok(())
            }
        }
    }

    async fn persist(&self, record: NodeResourceRecord) -> Result<()> {
        let path = node_resources_path(&record.node_id);
        self.store
            .put(&path, serde_json::to_value(&record)?)
            .await?;
        debug!(path = %path, "persisted node resource record");
        Ok(())
    }
}
