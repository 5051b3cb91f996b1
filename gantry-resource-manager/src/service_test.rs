use crate::{
    broadcast_buffer::BroadcastBuffer,
    errors::ResourceManagerError,
    manager::ResourceManager,
    recovery::InitData,
    service::{ResourceManagerHandle, ResourceManagerService},
};
use gantry_core::rpc::{GetResourcesRequest, ReportResourceUsageRequest, Status};
use gantry_core::{NodeId, NodeInfo, ResourceSet, ResourcesData};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

fn start_service() -> (ResourceManagerHandle, JoinHandle<()>) {
    let mut manager = ResourceManager::new(BroadcastBuffer::new());
    manager.initialize(&InitData::default()).unwrap();
    ResourceManagerService::start(manager, 16)
}

#[tokio::test]
async fn test_handle_round_trip() {
    let (handle, join) = start_service();
    let node_id = NodeId::random();

    handle
        .on_node_add(NodeInfo::new(node_id, ResourceSet::from([("CPU", 4.0)])))
        .await
        .unwrap();
    assert!(handle
        .acquire_resources(node_id, ResourceSet::from([("CPU", 3.0)]))
        .await
        .unwrap());
    assert!(!handle
        .acquire_resources(node_id, ResourceSet::from([("CPU", 3.0)]))
        .await
        .unwrap());

    let reply = handle
        .get_resources(GetResourcesRequest { node_id })
        .await
        .unwrap();
    assert_eq!(reply.resources_available, ResourceSet::from([("CPU", 1.0)]));

    let node = handle.get_node_resources(node_id).await.unwrap().unwrap();
    assert_eq!(node.total(), &ResourceSet::from([("CPU", 4.0)]));
    assert_eq!(handle.get_cluster_resources().await.unwrap().len(), 1);

    handle.shutdown().await.unwrap();
    join.await.unwrap();
}

/// Concurrent callers are serialized; no acquire is lost or double counted.
#[tokio::test]
async fn test_concurrent_acquires_are_serialized() {
    let (handle, join) = start_service();
    let node_id = NodeId::random();
    handle
        .on_node_add(NodeInfo::new(node_id, ResourceSet::from([("CPU", 10.0)])))
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..25 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            handle
                .acquire_resources(node_id, ResourceSet::from([("CPU", 1.0)]))
                .await
                .unwrap()
        }));
    }

    let mut granted = 0;
    for task in tasks {
        if task.await.unwrap() {
            granted += 1;
        }
    }
    assert_eq!(granted, 10);

    let node = handle.get_node_resources(node_id).await.unwrap().unwrap();
    assert_eq!(node.available().quantity("CPU"), 0.0);

    handle.shutdown().await.unwrap();
    join.await.unwrap();
}

#[tokio::test]
async fn test_listener_runs_on_control_loop() {
    let (handle, join) = start_service();
    let notified = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&notified);
    handle
        .add_resources_changed_listener(Box::new(move || {
            sink.fetch_add(1, Ordering::SeqCst);
        }))
        .await
        .unwrap();

    let node_id = NodeId::random();
    handle
        .on_node_add(NodeInfo::new(node_id, ResourceSet::from([("CPU", 2.0)])))
        .await
        .unwrap();
    let mut report = ResourcesData::new(node_id);
    report.resources_available = ResourceSet::from([("CPU", 1.0)]);
    report.resources_available_changed = true;
    let reply = handle
        .report_resource_usage(ReportResourceUsageRequest { resources: report })
        .await
        .unwrap();
    assert_eq!(reply.status, Status::Ok);

    // The reply is sent after the listeners ran
    assert_eq!(notified.load(Ordering::SeqCst), 2);

    handle.shutdown().await.unwrap();
    join.await.unwrap();
}

#[tokio::test]
async fn test_calls_fail_after_shutdown() {
    let (handle, join) = start_service();
    handle.shutdown().await.unwrap();
    join.await.unwrap();

    assert!(matches!(
        handle.debug_string().await,
        Err(ResourceManagerError::ServiceStopped)
    ));
    assert!(matches!(
        handle.on_node_dead(NodeId::random()).await,
        Err(ResourceManagerError::ServiceStopped)
    ));
}

#[tokio::test]
async fn test_normal_task_updates_through_handle() {
    let (handle, join) = start_service();
    let node_id = NodeId::random();
    handle
        .on_node_add(NodeInfo::new(node_id, ResourceSet::from([("CPU", 4.0)])))
        .await
        .unwrap();

    let resources = ResourceSet::from([("CPU", 2.0)]);
    assert!(handle
        .update_node_normal_task_resources(node_id, resources.clone(), 5)
        .await
        .unwrap());
    assert!(!handle
        .update_node_normal_task_resources(node_id, resources, 5)
        .await
        .unwrap());

    let text = handle.cluster_resources_string().await.unwrap();
    assert!(text.contains("available={CPU: 2}"));

    handle.shutdown().await.unwrap();
    join.await.unwrap();
}

#[tokio::test]
async fn test_set_available_and_capacity_through_handle() {
    let (handle, join) = start_service();
    let node_id = NodeId::random();
    handle
        .on_node_add(NodeInfo::new(node_id, ResourceSet::from([("CPU", 4.0)])))
        .await
        .unwrap();

    assert!(handle
        .set_available_resources(node_id, ResourceSet::from([("CPU", 1.5)]))
        .await
        .unwrap());
    assert!(!handle
        .set_available_resources(node_id, ResourceSet::from([("CPU", -3.0)]))
        .await
        .unwrap());
    assert!(!handle
        .set_available_resources(NodeId::random(), ResourceSet::from([("CPU", 1.0)]))
        .await
        .unwrap());
    assert!(!handle
        .update_resource_capacity(node_id, ResourceSet::from([("CPU", -2.0)]))
        .await
        .unwrap());

    let node = handle.get_node_resources(node_id).await.unwrap().unwrap();
    assert_eq!(node.total(), &ResourceSet::from([("CPU", 4.0)]));
    assert_eq!(node.available(), &ResourceSet::from([("CPU", 1.5)]));

    handle.shutdown().await.unwrap();
    join.await.unwrap();
}
