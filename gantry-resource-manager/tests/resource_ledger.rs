//! # Resource Ledger End-to-End Tests
//!
//! Drives the resource manager through its handle with the broadcaster and
//! the change feed running, as the server does.
//!
//! ## Tests:
//! - acquire/release symmetry and atomicity of failed acquires
//! - timestamp ordering of normal task records, directly and through reports
//! - flush semantics of the broadcast buffer and the published batches
//! - node removal, capacity updates and recovery from the persisted table

mod common;

use anyhow::Result;
use common::{add_node, cpu, normal_task_report, start_stack};
use futures::StreamExt;
use gantry_core::rpc::{
    DeleteResourcesRequest, GetAllResourceUsageRequest, ReportResourceUsageRequest, Status,
    UpdateResourcesRequest,
};
use gantry_core::{NodeId, ResourceDelta, ResourceSet, ResourceUsageBatch, ResourcesData};
use gantry_metadata_store::MemoryStore;
use gantry_resource_manager::{BroadcastBuffer, RESOURCE_USAGE_BATCH_TOPIC};
use std::time::Duration;

const NO_TICK: u64 = 60_000;

#[tokio::test]
async fn acquire_then_release_restores_available() -> Result<()> {
    let stack = start_stack(MemoryStore::new(), NO_TICK).await?;
    let total = ResourceSet::from([("CPU", 8.0), ("GPU", 2.0), ("memory", 1024.0)]);
    let node_id = add_node(&stack.handle, total.clone()).await?;

    for request in [
        ResourceSet::from([("CPU", 0.5)]),
        ResourceSet::from([("CPU", 3.0), ("GPU", 1.0)]),
        ResourceSet::from([("memory", 512.25), ("GPU", 2.0)]),
    ] {
        let before = stack.handle.get_node_resources(node_id).await?.unwrap();
        assert!(stack.handle.acquire_resources(node_id, request.clone()).await?);
        assert!(stack.handle.release_resources(node_id, request).await?);
        let after = stack.handle.get_node_resources(node_id).await?.unwrap();
        assert_eq!(before.available(), after.available());
    }

    stack.stop().await
}

#[tokio::test]
async fn failed_acquire_leaves_ledger_unchanged() -> Result<()> {
    let stack = start_stack(MemoryStore::new(), NO_TICK).await?;
    let node_id = add_node(&stack.handle, ResourceSet::from([("CPU", 4.0), ("GPU", 1.0)])).await?;

    let before = stack.handle.get_cluster_resources().await?;
    let request = ResourceSet::from([("CPU", 1.0), ("GPU", 2.0)]);
    assert!(!stack.handle.acquire_resources(node_id, request).await?);
    let after = stack.handle.get_cluster_resources().await?;

    assert_eq!(before, after);
    stack.stop().await
}

#[tokio::test]
async fn older_normal_task_record_is_dropped() -> Result<()> {
    let stack = start_stack(MemoryStore::new(), NO_TICK).await?;
    let node_id = add_node(&stack.handle, cpu(8.0)).await?;

    assert!(stack
        .handle
        .update_node_normal_task_resources(node_id, cpu(5.0), 5)
        .await?);
    assert!(!stack
        .handle
        .update_node_normal_task_resources(node_id, cpu(1.0), 3)
        .await?);

    let node = stack.handle.get_node_resources(node_id).await?.unwrap();
    assert_eq!(node.available(), &cpu(5.0));
    assert_eq!(node.normal_task(), &cpu(5.0));
    stack.stop().await
}

#[tokio::test]
async fn second_flush_is_empty() -> Result<()> {
    let buffer = BroadcastBuffer::new();
    let node_id = NodeId::random();
    buffer.add_delta(
        node_id,
        ResourceDelta {
            node_id,
            resources_available: Some(cpu(1.0)),
            resources_total: None,
            resource_load: None,
            resources_normal_task: None,
        },
    );

    assert_eq!(buffer.flush(8).len(), 1);
    assert!(buffer.flush(8).is_empty());
    Ok(())
}

#[tokio::test]
async fn removed_node_rejects_acquire() -> Result<()> {
    let stack = start_stack(MemoryStore::new(), NO_TICK).await?;
    let node_id = add_node(&stack.handle, cpu(4.0)).await?;

    assert!(stack.handle.on_node_dead(node_id).await?);
    assert!(!stack.handle.acquire_resources(node_id, cpu(1.0)).await?);
    assert!(!stack.handle.on_node_dead(node_id).await?);
    stack.stop().await
}

#[tokio::test]
async fn capacity_update_adds_new_resource() -> Result<()> {
    let stack = start_stack(MemoryStore::new(), NO_TICK).await?;
    let node_id = add_node(&stack.handle, cpu(4.0)).await?;

    assert!(stack
        .handle
        .update_resource_capacity(node_id, ResourceSet::from([("GPU", 2.0)]))
        .await?);

    let node = stack.handle.get_node_resources(node_id).await?.unwrap();
    assert_eq!(node.total().get("GPU"), Some(2.0));
    assert_eq!(node.available().get("GPU"), Some(2.0));
    stack.stop().await
}

/// Acquire, then two racing normal task reports: only the newer one sticks.
#[tokio::test]
async fn report_reconciliation_end_to_end() -> Result<()> {
    let stack = start_stack(MemoryStore::new(), NO_TICK).await?;
    let node_id = add_node(&stack.handle, cpu(8.0)).await?;

    assert!(stack.handle.acquire_resources(node_id, cpu(5.0)).await?);
    let node = stack.handle.get_node_resources(node_id).await?.unwrap();
    assert_eq!(node.available(), &cpu(3.0));

    let reply = stack
        .handle
        .report_resource_usage(ReportResourceUsageRequest {
            resources: normal_task_report(node_id, cpu(2.0), 1),
        })
        .await?;
    assert_eq!(reply.status, Status::Ok);
    let node = stack.handle.get_node_resources(node_id).await?.unwrap();
    assert_eq!(node.available(), &cpu(2.0));

    stack
        .handle
        .report_resource_usage(ReportResourceUsageRequest {
            resources: normal_task_report(node_id, cpu(6.0), 0),
        })
        .await?;
    let node = stack.handle.get_node_resources(node_id).await?.unwrap();
    assert_eq!(node.available(), &cpu(2.0));

    stack.stop().await
}

#[tokio::test]
async fn reports_are_broadcast_periodically() -> Result<()> {
    let stack = start_stack(MemoryStore::new(), 20).await?;
    let mut batches = stack.publisher.subscribe(RESOURCE_USAGE_BATCH_TOPIC);
    let node_id = add_node(&stack.handle, cpu(4.0)).await?;

    let mut report = ResourcesData::new(node_id);
    report.resources_available = cpu(3.0);
    report.resources_available_changed = true;
    stack
        .handle
        .report_resource_usage(ReportResourceUsageRequest { resources: report })
        .await?;

    let payload = tokio::time::timeout(Duration::from_secs(2), batches.next())
        .await?
        .unwrap()?;
    let batch = ResourceUsageBatch::from_bytes(&payload)?;
    assert_eq!(batch.batch.len(), 1);
    assert_eq!(batch.batch[0].node_id, node_id);
    assert_eq!(batch.batch[0].resources_available, Some(cpu(3.0)));
    assert!(stack.buffer.is_empty());

    let usage = stack
        .handle
        .get_all_resource_usage(GetAllResourceUsageRequest {})
        .await?;
    assert_eq!(usage.resource_usage_data.batch.len(), 1);

    stack.stop().await
}

/// Capacity changes survive a restart through the persisted node resource table.
#[tokio::test]
async fn ledger_is_recovered_after_restart() -> Result<()> {
    let store = MemoryStore::new();
    let stack = start_stack(store.clone(), NO_TICK).await?;
    let kept = add_node(&stack.handle, ResourceSet::from([("CPU", 4.0), ("GPU", 1.0)])).await?;
    let dropped = add_node(&stack.handle, cpu(2.0)).await?;

    let reply = stack
        .handle
        .update_resources(UpdateResourcesRequest {
            node_id: kept,
            resources: cpu(16.0),
        })
        .await?;
    assert_eq!(reply.status, Status::Ok);
    let reply = stack
        .handle
        .delete_resources(DeleteResourcesRequest {
            node_id: kept,
            resource_name_list: vec!["GPU".to_string()],
        })
        .await?;
    assert_eq!(reply.status, Status::Ok);
    assert!(stack.handle.on_node_dead(dropped).await?);
    stack.stop().await?;

    let restarted = start_stack(store, NO_TICK).await?;
    let cluster = restarted.handle.get_cluster_resources().await?;
    assert_eq!(cluster.len(), 1);
    let node = &cluster[&kept];
    assert_eq!(node.total(), &cpu(16.0));
    assert_eq!(node.available(), &cpu(16.0));

    restarted.stop().await
}
