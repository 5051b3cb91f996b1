use anyhow::{Context, Result};
use gantry_metadata_store::{MemoryStore, MetadataStore};
use gantry_resource_manager::{
    node_resources_path, BroadcastBuffer, Broadcaster, ChangeFeed, InitData, MemoryPublisher,
    ResourceManager, ResourceManagerHandle, ResourceManagerService,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use crate::service_configuration::{MetaStoreBackend, ServiceConfiguration};

/// GantryService wires the resource manager to its collaborators:
/// the metadata store it recovers from and persists to, the publisher of usage
/// batches, and the static membership source.
pub(crate) struct GantryService {
    config: ServiceConfiguration,
    pub(crate) store: MemoryStore,
    publisher: MemoryPublisher,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl GantryService {
    pub(crate) fn new(config: ServiceConfiguration) -> Self {
        let store = match config.meta_store_backend {
            MetaStoreBackend::InMemory => MemoryStore::new(),
        };
        GantryService {
            config,
            store,
            publisher: MemoryPublisher::new(),
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Recovers the ledger and starts the control loop with its background tasks.
    ///
    /// Returns once every static node is registered.
    pub(crate) async fn start(&mut self) -> Result<ResourceManagerHandle> {
        info!(cluster = %self.config.cluster_name, "starting gantry resource manager");

        self.seed_store().await?;

        // Recovery must complete before any request is accepted
        let init_data = InitData::load(&self.store)
            .await
            .context("failed to recover node resources")?;
        info!(
            nodes = init_data.node_resources.len(),
            "loaded persisted node resources"
        );

        let buffer = BroadcastBuffer::new();
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let mut manager = ResourceManager::new(buffer.clone()).with_change_sender(change_tx);
        manager.initialize(&init_data)?;
        manager.add_resources_changed_listener(Box::new(|| {
            trace!("cluster resources changed");
        }));

        let rm_config = &self.config.resource_manager;
        let (handle, control_loop) =
            ResourceManagerService::start(manager, rm_config.command_queue_capacity);
        self.tasks.push(control_loop);

        let broadcaster =
            Broadcaster::new(buffer, Arc::new(self.publisher.clone()), rm_config);
        self.tasks.push(broadcaster.start(self.cancel.clone()));

        let change_feed =
            ChangeFeed::new(Arc::new(self.store.clone()), Arc::new(self.publisher.clone()));
        self.tasks
            .push(change_feed.start(change_rx, self.cancel.clone()));

        for node in &self.config.static_nodes {
            handle.on_node_add(node.clone()).await?;
        }

        info!(
            "gantry resource manager started\n{}",
            handle.cluster_resources_string().await?
        );
        Ok(handle)
    }

    // Writes the configured records as if left by a previous run.
    async fn seed_store(&self) -> Result<()> {
        for record in &self.config.seeded_node_resources {
            let path = node_resources_path(&record.node_id);
            self.store
                .put(&path, serde_json::to_value(record)?)
                .await
                .with_context(|| format!("failed to seed {}", path))?;
        }
        Ok(())
    }

    /// Stops the control loop first, then lets the background tasks drain.
    pub(crate) async fn stop(self, handle: ResourceManagerHandle) -> Result<()> {
        match handle.debug_string().await {
            Ok(debug_str) => info!("{}", debug_str),
            Err(e) => warn!(error = %e, "resource manager stopped before shutdown"),
        }
        if handle.shutdown().await.is_err() {
            warn!("resource manager control loop already stopped");
        }

        self.cancel.cancel();
        for task in self.tasks {
            task.await.context("background task panicked")?;
        }
        info!("gantry resource manager stopped");
        Ok(())
    }
}
