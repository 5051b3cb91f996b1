//! Shared helpers for the `gantry-resource-manager` integration tests.
//!
//! [`start_stack`] wires the control loop, the broadcaster and the change feed
//! over an in-memory metadata store and publisher, the same way the server does.

#![allow(dead_code)]

use std::sync::Arc;

use gantry_core::{NodeId, NodeInfo, ResourceSet, ResourcesData};
use gantry_metadata_store::MemoryStore;
use gantry_resource_manager::{
    BroadcastBuffer, Broadcaster, ChangeFeed, InitData, MemoryPublisher, ResourceManager,
    ResourceManagerConfig, ResourceManagerHandle, ResourceManagerService,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct TestStack {
    pub handle: ResourceManagerHandle,
    pub buffer: BroadcastBuffer,
    pub store: MemoryStore,
    pub publisher: MemoryPublisher,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl TestStack {
    /// Stops the control loop and the background tasks, draining what they hold.
    pub async fn stop(self) -> anyhow::Result<()> {
        self.handle.shutdown().await?;
        self.cancel.cancel();
        for task in self.tasks {
            task.await?;
        }
        Ok(())
    }
}

/// Recovers from `store` and starts the full stack. The broadcast period is
/// long enough that tests flush explicitly unless they wait for it.
pub async fn start_stack(store: MemoryStore, broadcast_period_ms: u64) -> anyhow::Result<TestStack> {
    let config = ResourceManagerConfig {
        broadcast_period_ms,
        max_broadcasting_batch_size: 64,
        command_queue_capacity: 64,
    };
    let publisher = MemoryPublisher::new();
    let buffer = BroadcastBuffer::new();
    let cancel = CancellationToken::new();

    let (change_tx, change_rx) = mpsc::unbounded_channel();
    let mut manager = ResourceManager::new(buffer.clone()).with_change_sender(change_tx);
    manager.initialize(&InitData::load(&store).await?)?;

    let (handle, control_loop) =
        ResourceManagerService::start(manager, config.command_queue_capacity);
    let broadcaster = Broadcaster::new(buffer.clone(), Arc::new(publisher.clone()), &config)
        .start(cancel.clone());
    let change_feed = ChangeFeed::new(Arc::new(store.clone()), Arc::new(publisher.clone()))
        .start(change_rx, cancel.clone());

    Ok(TestStack {
        handle,
        buffer,
        store,
        publisher,
        cancel,
        tasks: vec![control_loop, broadcaster, change_feed],
    })
}

pub fn cpu(quantity: f64) -> ResourceSet {
    ResourceSet::from([("CPU", quantity)])
}

pub async fn add_node(handle: &ResourceManagerHandle, total: ResourceSet) -> anyhow::Result<NodeId> {
    let node_id = NodeId::random();
    handle.on_node_add(NodeInfo::new(node_id, total)).await?;
    Ok(node_id)
}

/// Report carrying a timestamped normal task record.
pub fn normal_task_report(node_id: NodeId, resources: ResourceSet, timestamp: i64) -> ResourcesData {
    let mut report = ResourcesData::new(node_id);
    report.resources_normal_task = resources;
    report.resources_normal_task_changed = true;
    report.resources_normal_task_timestamp = timestamp;
    report
}
